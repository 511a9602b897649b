//! Envelope encoding and decoding.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::payload::{WinSizePayload, WritePayload};
use crate::error::TtyShareError;
use crate::Result;

/// The `Type` tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Write,
    WinSize,
    Terminate,
    /// Any tag this build does not know about.
    #[serde(other)]
    Unknown,
}

/// One JSON envelope exchanged over the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "Type")]
    pub kind: MessageType,
    /// Base64 of the JSON-encoded inner payload.
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A fully decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Raw terminal bytes.
    Write(Vec<u8>),
    /// New terminal dimensions.
    WinSize { cols: u16, rows: u16 },
    /// The peer is ending the session for good.
    Terminate,
    /// Unrecognized tag.
    Unknown,
}

impl Frame {
    fn wrap<T: Serialize>(kind: MessageType, payload: &T) -> Self {
        // Serializing these plain structs to a Vec cannot fail
        let inner = serde_json::to_vec(payload).unwrap_or_default();
        Self {
            kind,
            data: Some(B64.encode(inner)),
        }
    }

    /// A `Write` frame for a unit of user input.
    pub fn write(input: &str) -> Self {
        Self::wrap(MessageType::Write, &WritePayload::from_input(input))
    }

    /// A `Write` frame for raw terminal output.
    pub fn write_bytes(bytes: &[u8]) -> Self {
        Self::wrap(MessageType::Write, &WritePayload::from_bytes(bytes))
    }

    /// A `WinSize` frame.
    pub fn win_size(cols: u16, rows: u16) -> Self {
        Self::wrap(MessageType::WinSize, &WinSizePayload { cols, rows })
    }

    /// A `Terminate` frame. It carries no payload.
    pub fn terminate() -> Self {
        Self {
            kind: MessageType::Terminate,
            data: None,
        }
    }

    /// Serialize the envelope to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the outer base64 and parse the inner JSON object.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| TtyShareError::Protocol(format!("{:?} frame without Data", self.kind)))?;
        let inner = B64.decode(data)?;
        Ok(serde_json::from_slice(&inner)?)
    }

    /// Decode the frame down to its final value.
    pub fn decode(&self) -> Result<Message> {
        match self.kind {
            MessageType::Write => {
                let payload: WritePayload = self.payload()?;
                Ok(Message::Write(payload.bytes()?))
            }
            MessageType::WinSize => {
                let payload: WinSizePayload = self.payload()?;
                Ok(Message::WinSize {
                    cols: payload.cols,
                    rows: payload.rows,
                })
            }
            MessageType::Terminate => Ok(Message::Terminate),
            MessageType::Unknown => Ok(Message::Unknown),
        }
    }
}
