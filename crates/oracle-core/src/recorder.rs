//! Records served preimages so an online run can be replayed offline

use std::path::{Path, PathBuf};

use crate::blob::padding_for;
use crate::{PreimageKey, PreimageTable, Result};

/// Encode one blob record: BE length, value, zero padding to 8 bytes
pub fn encode_blob_record(value: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(8 + value.len() + padding_for(value.len()));
    record.extend_from_slice(&(value.len() as u64).to_be_bytes());
    record.extend_from_slice(value);
    record.resize(record.len() + padding_for(value.len()), 0);
    record
}

/// Accumulates every preimage served in a session
///
/// The table keeps one value per key. The blob keeps every serve in order,
/// duplicates included, since sequential replay follows request order.
#[derive(Debug, Default)]
pub struct PreimageRecorder {
    table: PreimageTable,
    blob: Vec<u8>,
    records: usize,
}

impl PreimageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: PreimageKey, value: &[u8]) {
        self.table.insert(key, value.to_vec());
        self.blob.extend_from_slice(&encode_blob_record(value));
        self.records += 1;
    }

    pub fn table(&self) -> &PreimageTable {
        &self.table
    }

    pub fn blob_bytes(&self) -> &[u8] {
        &self.blob
    }

    /// Number of serves recorded (not unique keys)
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn write_table(&self, path: impl AsRef<Path>) -> Result<()> {
        self.table.save(path)
    }

    pub fn write_blob(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.blob)?;
        Ok(())
    }

    /// Write `preimages.json` and `preimages.bin` into `dir`
    pub fn write_dir(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let table_path = dir.join("preimages.json");
        let blob_path = dir.join("preimages.bin");
        self.write_table(&table_path)?;
        self.write_blob(&blob_path)?;

        tracing::info!(
            dir = %dir.display(),
            keys = self.table.len(),
            records = self.records,
            blob_bytes = self.blob.len(),
            "Wrote preimage dump"
        );
        Ok((table_path, blob_path))
    }
}
