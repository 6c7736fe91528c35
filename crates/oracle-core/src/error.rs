//! Error types for oracle-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load preimages: {0}")]
    Load(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unknown preimage key: {0}")]
    UnknownKey(String),

    #[error("End of data: requested {requested} bytes at offset {offset}, {remaining} remaining")]
    EndOfData {
        requested: usize,
        offset: usize,
        remaining: usize,
    },

    #[error("Length mismatch for key {key}: requested {requested} bytes, preimage has {actual}")]
    LengthMismatch {
        key: String,
        requested: u64,
        actual: u64,
    },

    #[error("Keccak mismatch for key {key}: value hashes to {actual}")]
    KeccakMismatch { key: String, actual: String },
}

impl Error {
    /// Unknown-key error for a raw key
    pub fn unknown_key(key: &crate::PreimageKey) -> Self {
        Error::UnknownKey(hex::encode(key))
    }
}
