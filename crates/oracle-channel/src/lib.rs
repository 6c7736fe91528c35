//! oracle-channel: Length-prefixed preimage protocol over raw byte streams
//!
//! The host writes a 32-byte key and reads back an 8-byte big-endian length
//! followed by exactly that many bytes. Hints travel on their own stream and
//! are never answered. Framing lives here because pipes carry no message
//! boundaries.

pub mod client;
pub mod error;
pub mod frame;
pub mod server;

pub use client::OracleChannel;
pub use error::{ChannelError, Result};
pub use server::{HintReader, OracleServer};
