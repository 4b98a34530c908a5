//! Core results and error types

use thiserror::Error;

/// Core error type encompassing all analysis errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to decode hex string.
    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Block structure is malformed or inconsistent.
    #[error("invalid block structure: {0}")]
    InvalidBlockStructure(String),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
