//! oracle-bridge: wasm guest host with a preimage oracle
//!
//! Workspace facade over the member crates:
//!
//! - [`oracle_core`]: keys, preimage table and blob, recorder, configuration
//! - [`oracle_channel`]: pipe protocol client and server
//! - [`oracle_host`]: guest bridge, input feed, memory monitor, execution driver

pub use oracle_channel;
pub use oracle_core;
pub use oracle_host;
