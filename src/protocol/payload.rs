//! Inner payloads carried in the envelope's `Data` field.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Payload of a `Write` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePayload {
    /// Length of the data as the sender measured it.
    ///
    /// Receivers send the character count of the input string, the server
    /// sends a byte count. Frames from the server may omit it.
    #[serde(rename = "Size", default)]
    pub size: usize,
    /// Base64 of the raw terminal bytes.
    #[serde(rename = "Data")]
    pub data: String,
}

impl WritePayload {
    /// Payload for a unit of user input.
    ///
    /// `size` is the character length of `input` before encoding.
    pub fn from_input(input: &str) -> Self {
        Self {
            size: input.chars().count(),
            data: B64.encode(input.as_bytes()),
        }
    }

    /// Payload for raw terminal output.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len(),
            data: B64.encode(bytes),
        }
    }

    /// Decode the raw bytes.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(B64.decode(&self.data)?)
    }
}

/// Payload of a `WinSize` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinSizePayload {
    #[serde(rename = "Cols")]
    pub cols: u16,
    #[serde(rename = "Rows")]
    pub rows: u16,
}
