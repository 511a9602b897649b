//! Wire protocol shared by the receiver and the server.
//!
//! Every WebSocket text frame is a JSON envelope:
//!
//! ```text
//! {"Type": "Write" | "WinSize" | "Terminate", "Data": "<base64>"}
//! ```
//!
//! The outer `Data` is the base64 encoding of a JSON object whose shape
//! depends on `Type`. For `Write` that object carries its own base64 `Data`
//! field, so terminal bytes are encoded twice. The server on the other end
//! expects exactly this layout.
//!
//! # Example
//!
//! ```
//! use tty_share::protocol::{Frame, Message};
//!
//! let text = Frame::write("ls\r").to_json().unwrap();
//! let frame = Frame::from_json(&text).unwrap();
//! assert_eq!(frame.decode().unwrap(), Message::Write(b"ls\r".to_vec()));
//! ```

mod frame;
mod payload;

pub use frame::{Frame, Message, MessageType};
pub use payload::{WinSizePayload, WritePayload};
