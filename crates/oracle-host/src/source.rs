//! Preimage backends behind the oracle interface
//!
//! The bridge only sees [`PreimageSource`]; which variant answers is decided
//! once at startup from the configured [`Mode`].

use oracle_channel::{ChannelError, OracleChannel};
use oracle_core::{format_key, HostConfig, Mode, PreimageBlob, PreimageKey, PreimageTable};

use crate::error::{HostError, Result};

/// Something that can answer preimage requests
pub trait PreimageSource: Send {
    /// Short backend name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Byte length of the preimage for `key`
    fn length(&mut self, key: &PreimageKey) -> Result<u64>;

    /// Fill `buf` with the first `buf.len()` bytes of the preimage for `key`
    fn read_into(&mut self, key: &PreimageKey, buf: &mut [u8]) -> Result<()>;

    /// Whether hints reach anyone; preloaded backends have nobody to tell
    fn takes_hints(&self) -> bool {
        false
    }

    /// Deliver an advisory hint; returns false when it was dropped
    fn hint(&mut self, _hint: &[u8]) -> bool {
        false
    }
}

/// Preloaded key-addressed table
#[derive(Debug)]
pub struct TableSource {
    table: PreimageTable,
}

impl TableSource {
    pub fn new(table: PreimageTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PreimageTable {
        &self.table
    }
}

impl PreimageSource for TableSource {
    fn name(&self) -> &'static str {
        "table"
    }

    fn length(&mut self, key: &PreimageKey) -> Result<u64> {
        Ok(self.table.length(key)?)
    }

    fn read_into(&mut self, key: &PreimageKey, buf: &mut [u8]) -> Result<()> {
        let value = self.table.read(key, buf.len())?;
        // a short table value would leave guest memory partly unwritten
        if value.len() != buf.len() {
            return Err(oracle_core::Error::LengthMismatch {
                key: format_key(key),
                requested: buf.len() as u64,
                actual: value.len() as u64,
            }
            .into());
        }
        buf.copy_from_slice(value);
        Ok(())
    }
}

/// Live oracle process over pipes
#[derive(Debug)]
pub struct ChannelSource {
    channel: OracleChannel,
}

impl ChannelSource {
    pub fn new(channel: OracleChannel) -> Self {
        Self { channel }
    }
}

impl PreimageSource for ChannelSource {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn length(&mut self, key: &PreimageKey) -> Result<u64> {
        Ok(self.channel.request_length(key)?)
    }

    fn read_into(&mut self, key: &PreimageKey, buf: &mut [u8]) -> Result<()> {
        Ok(self.channel.request_bytes_into(key, buf)?)
    }

    fn takes_hints(&self) -> bool {
        true
    }

    fn hint(&mut self, hint: &[u8]) -> bool {
        self.channel.hint(hint)
    }
}

/// Streaming blob replayed in request order
///
/// Keys are not stored in the blob; each length request consumes the next
/// record header and the data request that follows consumes its value.
pub struct SequentialSource {
    blob: PreimageBlob,
    pending: Option<(PreimageKey, u64)>,
}

impl SequentialSource {
    pub fn new(blob: PreimageBlob) -> Self {
        Self {
            blob,
            pending: None,
        }
    }

    pub fn position(&self) -> usize {
        self.blob.position()
    }
}

impl PreimageSource for SequentialSource {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn length(&mut self, key: &PreimageKey) -> Result<u64> {
        // skip a value whose length was announced but never read
        if let Some((stale, len)) = self.pending.take() {
            tracing::warn!(
                key = %format_key(&stale),
                len,
                "Skipping value of a length request never followed by a data request"
            );
            self.blob.read_padded(len as usize)?;
        }
        let len = self.blob.read_length()?;
        self.pending = Some((*key, len));
        Ok(len)
    }

    fn read_into(&mut self, key: &PreimageKey, buf: &mut [u8]) -> Result<()> {
        let requested = buf.len() as u64;
        let Some((pending, len)) = self.pending else {
            return Err(HostError::Channel(ChannelError::NoPendingLength(format_key(key))));
        };
        if &pending != key {
            return Err(HostError::Channel(ChannelError::KeyMismatch {
                pending_key: format_key(&pending),
                requested_key: format_key(key),
            }));
        }
        if len != requested {
            return Err(HostError::Channel(ChannelError::LengthMismatch {
                announced: len,
                requested,
            }));
        }
        self.pending = None;
        buf.copy_from_slice(self.blob.read_padded(buf.len())?);
        Ok(())
    }
}

/// Build the backend for `config.mode`
///
/// Input-feed runs have no oracle and get `None`.
pub fn open_source(config: &HostConfig) -> Result<Option<Box<dyn PreimageSource>>> {
    let source: Box<dyn PreimageSource> = match config.mode {
        Mode::Offline => {
            let table = PreimageTable::load(&config.preimages_json)?;
            if config.verify_keccak {
                table.verify_keccak()?;
                tracing::info!(keys = table.len(), "Preimage table passed keccak verification");
            }
            Box::new(TableSource::new(table))
        }
        Mode::Sequential => Box::new(SequentialSource::new(PreimageBlob::open(
            &config.preimages_bin,
        )?)),
        Mode::Online => open_channel(config)?,
        Mode::InputFeed => return Ok(None),
    };
    tracing::info!(mode = %config.mode, backend = source.name(), "Preimage source ready");
    Ok(Some(source))
}

#[cfg(unix)]
fn open_channel(config: &HostConfig) -> Result<Box<dyn PreimageSource>> {
    // SAFETY: the descriptors are inherited from the parent that spawned us
    // with the oracle pipes attached, and nothing else in this process owns them.
    let channel = unsafe { OracleChannel::from_fds(config.fds)? };
    Ok(Box::new(ChannelSource::new(channel)))
}

#[cfg(not(unix))]
fn open_channel(_config: &HostConfig) -> Result<Box<dyn PreimageSource>> {
    Err(HostError::NoOracle)
}
