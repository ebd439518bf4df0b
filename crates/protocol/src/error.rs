//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Buffer shorter than the header or the values it declares
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    /// Frame magic does not match the expected tag
    #[error("Bad frame magic: {found:02x?} (expected {expected:02x?})")]
    BadMagic { found: [u8; 2], expected: [u8; 2] },

    /// I/O error during frame operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
