//! oracle-core: Preimage data model shared by the host bridge and the oracle peer
//!
//! A preimage is an immutable byte string addressed by a 32-byte content key
//! (usually the keccak256 of the value). This crate owns the two ways a run
//! can have its preimages preloaded:
//!
//! - **Table**: a JSON object mapping hex keys to hex values, loaded wholesale
//!   into memory and addressed by key (`preimages.json`).
//! - **Blob**: a flat byte file consumed strictly in order through a cursor
//!   that only moves forward (`preimages.bin`).
//!
//! It also carries the recorder that produces both files from a live oracle
//! session, the keccak helpers, and the host configuration.
//!
//! ## Blob layout
//!
//! | Field | Size | Encoding |
//! |-------|------|----------|
//! | length | 8 | big-endian u64 |
//! | value | length | raw bytes |
//! | padding | 0..7 | zero bytes up to the next 8-byte boundary |
//!
//! Records repeat back to back. Consumers that only see 8-byte words (the
//! guest input feed) read the same file as a sequence of big-endian i64s.

mod blob;
mod config;
mod error;
mod key;
mod keccak;
mod recorder;
mod table;

pub use blob::PreimageBlob;
pub use config::{ClockMode, FdConfig, HostConfig, InputSource, Mode, PROTOCOL_VERSION};
pub use error::Error;
pub use key::{format_key, parse_key};
pub use keccak::{keccak256, verify_keccak_key};
pub use recorder::{encode_blob_record, PreimageRecorder};
pub use table::PreimageTable;

pub type Result<T> = std::result::Result<T, Error>;

/// 32-byte content-addressed preimage key
pub type PreimageKey = [u8; 32];

/// Wire and file format constants
pub mod constants {
    /// Key size in bytes
    pub const KEY_SIZE: usize = 32;

    /// Size of a length frame on the pipe and in the blob
    pub const LENGTH_PREFIX_SIZE: usize = 8;

    /// Size of one input-feed word
    pub const WORD_SIZE: usize = 8;

    /// Default offline table location
    pub const DEFAULT_PREIMAGES_JSON: &str = "./bin/preimages.json";

    /// Default streaming blob location
    pub const DEFAULT_PREIMAGES_BIN: &str = "./bin/preimages.bin";
}
