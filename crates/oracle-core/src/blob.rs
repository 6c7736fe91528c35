//! Streaming preimage blob: a flat file read strictly in order

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::constants::{LENGTH_PREFIX_SIZE, WORD_SIZE};
use crate::{Error, Result};

enum BlobData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for BlobData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            BlobData::Mapped(m) => m,
            BlobData::Owned(v) => v,
        }
    }
}

/// Sequential reader over a preimage blob
///
/// The cursor only moves forward. Reading past the end is an
/// [`Error::EndOfData`] and leaves the cursor where it was.
pub struct PreimageBlob {
    data: BlobData,
    cursor: usize,
}

impl PreimageBlob {
    /// Memory-map a blob file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;
        let len = file
            .metadata()
            .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?
            .len();

        // zero-length mappings are rejected by the OS
        let data = if len == 0 {
            BlobData::Owned(Vec::new())
        } else {
            // SAFETY: the blob is opened read-only and treated as immutable for the run.
            let mmap = unsafe { Mmap::map(&file) }
                .map_err(|e| Error::Load(format!("{}: {}", path.display(), e)))?;
            BlobData::Mapped(mmap)
        };

        tracing::info!(path = %path.display(), bytes = len, "Preimage blob opened");
        Ok(Self { data, cursor: 0 })
    }

    /// Blob over in-memory bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: BlobData::Owned(bytes),
            cursor: 0,
        }
    }

    /// Next `n` bytes, advancing the cursor by `n`
    pub fn read_next(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.take(n, n)?;
        Ok(&self.data[start..start + n])
    }

    /// Next 8-byte word as a big-endian signed integer
    pub fn read_word(&mut self) -> Result<i64> {
        let bytes: [u8; WORD_SIZE] = self
            .read_next(WORD_SIZE)?
            .try_into()
            .map_err(|_| Error::Load("short word".to_string()))?;
        Ok(i64::from_be_bytes(bytes))
    }

    /// Next length prefix of a record
    pub fn read_length(&mut self) -> Result<u64> {
        let bytes: [u8; LENGTH_PREFIX_SIZE] = self
            .read_next(LENGTH_PREFIX_SIZE)?
            .try_into()
            .map_err(|_| Error::Load("short length prefix".to_string()))?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Next `n` value bytes of a record, also consuming the zero padding
    /// that aligns records to 8 bytes
    ///
    /// Padding missing at the very end of the blob is tolerated.
    pub fn read_padded(&mut self, n: usize) -> Result<&[u8]> {
        let advance = (n + padding_for(n)).min(self.remaining().max(n));
        let start = self.take(n, advance)?;
        Ok(&self.data[start..start + n])
    }

    /// Reserve `required` bytes and advance by `advance`, returning the start offset
    fn take(&mut self, required: usize, advance: usize) -> Result<usize> {
        if required > self.remaining() {
            return Err(Error::EndOfData {
                requested: required,
                offset: self.cursor,
                remaining: self.remaining(),
            });
        }
        let start = self.cursor;
        self.cursor += advance;
        Ok(start)
    }

    /// Current cursor offset
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// Zero bytes needed after a value of `len` bytes to reach an 8-byte boundary
pub(crate) fn padding_for(len: usize) -> usize {
    (WORD_SIZE - len % WORD_SIZE) % WORD_SIZE
}
