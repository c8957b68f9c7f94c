//! Sender error types

use pyrograph_protocol::{Command, Reply};
use thiserror::Error;

/// Anything that can abort a streaming job
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("serial port error: {0}")]
    Serial(#[from] serial::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("image is {width} px wide, device limit is {limit}")]
    ImageTooWide { width: u32, limit: u32 },

    #[error("image is {width}x{height}, device limit is 65535 on each side")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("no handshake reply after {attempts} attempts")]
    HandshakeFailed { attempts: u32 },

    #[error("device rejected {command:?}")]
    Rejected { command: Command },

    #[error("expected {expected:?}, got {got:?} (raw bytes {raw:02x?})")]
    UnexpectedReply {
        expected: Reply,
        got: Option<Reply>,
        raw: Vec<u8>,
    },

    #[error("device went silent before line {line}")]
    LineTimeout { line: u32 },
}
