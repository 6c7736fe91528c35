//! Host error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to compile guest module: {0}")]
    Compile(String),

    #[error("Failed to link host functions: {0}")]
    Link(String),

    #[error("Failed to instantiate guest: {0}")]
    Instantiate(String),

    #[error("Guest does not export function {0:?}")]
    MissingEntryPoint(String),

    #[error("Guest does not export a linear memory named \"memory\"")]
    MissingMemory,

    #[error("Guest memory access out of bounds: offset {offset}, len {len}, memory size {size}")]
    MemoryOutOfBounds { offset: u64, len: u64, size: usize },

    #[error("No preimage oracle is configured for this run")]
    NoOracle,

    #[error("Preimage length {0} does not fit in guest memory")]
    LengthOverflow(u64),

    #[error("Input feed exhausted after {0} items")]
    InputExhausted(usize),

    #[error(transparent)]
    Preimage(#[from] oracle_core::Error),

    #[error(transparent)]
    Channel(#[from] oracle_channel::ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Guest-initiated end of execution
///
/// Returned from host functions to unwind the guest; the driver turns it
/// into the run's exit status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    #[error("guest exited with code {0}")]
    Exit(i32),

    #[error("require is not satisfied, which is a false assertion in the wasm code. Please check the logic of your image or input.")]
    AssertionFailed,
}

pub type Result<T> = std::result::Result<T, HostError>;
