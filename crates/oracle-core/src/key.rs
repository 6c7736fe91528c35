//! Hex encoding of preimage keys

use crate::{Error, PreimageKey, Result};

/// Parse a 32-byte key from hex, with or without a `0x` prefix
pub fn parse_key(s: &str) -> Result<PreimageKey> {
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex_str).map_err(|e| Error::InvalidKey(format!("{s}: {e}")))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| Error::InvalidKey(format!("{s}: expected 32 bytes, got {}", b.len())))
}

/// Lowercase hex without prefix, the form used as table keys
pub fn format_key(key: &PreimageKey) -> String {
    hex::encode(key)
}
