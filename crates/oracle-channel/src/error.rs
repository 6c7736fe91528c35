//! Channel error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel closed mid-frame: expected {expected} bytes, received {received}")]
    ChannelClosed { expected: usize, received: usize },

    #[error("Data requested for key {0} without a preceding length request")]
    NoPendingLength(String),

    #[error("Data request for key {requested_key} does not match pending length request for {pending_key}")]
    KeyMismatch {
        pending_key: String,
        requested_key: String,
    },

    #[error("Data request of {requested} bytes does not match announced length {announced}")]
    LengthMismatch { announced: u64, requested: u64 },

    #[error("Preimage length {0} does not fit in memory")]
    LengthOverflow(u64),

    #[error(transparent)]
    Core(#[from] oracle_core::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
