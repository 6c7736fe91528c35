//! Offline preimage table: hex key -> hex value, loaded before execution

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::key::{format_key, parse_key};
use crate::keccak::verify_keccak_key;
use crate::{Error, PreimageKey, Result};

/// Static key -> value mapping, read-only once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreimageTable {
    entries: HashMap<PreimageKey, Vec<u8>>,
}

impl PreimageTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a preimage, replacing any previous value for the key
    pub fn insert(&mut self, key: PreimageKey, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    /// Load a table from a JSON file
    ///
    /// Any failure (missing file, bad JSON, bad hex, wrong key size) is
    /// reported as [`Error::Load`] naming the path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_json_str(&content)
            .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            entries = table.len(),
            bytes = table.total_bytes(),
            "Preimage table loaded"
        );
        Ok(table)
    }

    /// Parse a table from its JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let map: BTreeMap<String, String> =
            serde_json::from_str(content).map_err(|e| Error::Load(e.to_string()))?;
        Self::from_hex_map(map)
    }

    /// Build a table from hex key/value strings
    pub fn from_hex_map(map: BTreeMap<String, String>) -> Result<Self> {
        let mut entries = HashMap::with_capacity(map.len());
        for (key_hex, value_hex) in map {
            let key = parse_key(&key_hex).map_err(|e| Error::Load(e.to_string()))?;
            let value_hex = value_hex.strip_prefix("0x").unwrap_or(&value_hex);
            let value = hex::decode(value_hex)
                .map_err(|e| Error::Load(format!("value for {key_hex}: {e}")))?;
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    /// Hex form of the table, ordered by key
    pub fn to_hex_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (format_key(k), hex::encode(v)))
            .collect()
    }

    /// Save the table as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.to_hex_map())?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Byte length of the value stored for `key`
    pub fn length(&self, key: &PreimageKey) -> Result<u64> {
        self.get(key)
            .map(|v| v.len() as u64)
            .ok_or_else(|| Error::unknown_key(key))
    }

    /// Up to `n` bytes of the value for `key`
    ///
    /// Asking for more than the stored length yields only the stored bytes.
    pub fn read(&self, key: &PreimageKey, n: usize) -> Result<&[u8]> {
        let value = self.get(key).ok_or_else(|| Error::unknown_key(key))?;
        Ok(&value[..n.min(value.len())])
    }

    pub fn get(&self, key: &PreimageKey) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn contains(&self, key: &PreimageKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all value lengths
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    /// Check every key against the keccak256 of its value
    pub fn verify_keccak(&self) -> Result<()> {
        for (key, value) in &self.entries {
            verify_keccak_key(key, value)?;
        }
        Ok(())
    }
}
