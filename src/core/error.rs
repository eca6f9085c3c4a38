// Error types for the transaction codec

use std::io;

/// Errors raised while packing, unpacking or validating protocol values
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Input ended (or failed) before a field was fully read
    #[error("short read: {0}")]
    ShortRead(#[source] io::Error),

    /// Output sink rejected a write
    #[error("short write: {0}")]
    ShortWrite(#[source] io::Error),

    /// Key material or fixed-length blob has the wrong size or prefix
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// Hex text could not be parsed
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Flag bits left over after witness processing
    #[error("unknown transaction option data (flags 0x{0:02x})")]
    UnknownTransactionOption(u8),

    /// Script bytes could not be split into instructions
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Structurally impossible transaction encoding
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Address could not be rendered for the given program
    #[error("address error: {0}")]
    Address(String),
}

impl CodecError {
    /// True when the error came from reading past the end of the input
    pub fn is_short_read(&self) -> bool {
        matches!(self, CodecError::ShortRead(_))
    }
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self {
        CodecError::InvalidHex(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
