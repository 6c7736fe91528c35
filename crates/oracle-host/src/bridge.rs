//! Oracle interface exposed to the guest
//!
//! Three calls, identical for every backend:
//!
//! - `get_preimage_len(key_ptr) -> len`
//! - `get_preimage_from_oracle(key_ptr, dest, len) -> len`
//! - `hint_oracle(ptr, size)`
//!
//! Keys and answers cross the sandbox boundary through a [`GuestMemory`]
//! borrowed for the duration of one call.

use oracle_core::format_key;

use crate::error::{HostError, Result};
use crate::memory::GuestMemory;
use crate::metrics;
use crate::source::PreimageSource;

/// Serves the oracle calls from one [`PreimageSource`]
pub struct OracleBridge {
    source: Box<dyn PreimageSource>,
    requests: u64,
}

impl OracleBridge {
    pub fn new(source: Box<dyn PreimageSource>) -> Self {
        Self {
            source,
            requests: 0,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.source.name()
    }

    /// Number of length and data requests served
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Length of the preimage whose key sits at `key_ptr`
    pub fn get_preimage_len(&mut self, memory: &GuestMemory<'_>, key_ptr: u32) -> Result<u32> {
        let key = memory.read_key(key_ptr)?;
        let len = self.source.length(&key)?;
        let len = u32::try_from(len).map_err(|_| HostError::LengthOverflow(len))?;

        self.requests += 1;
        metrics::record_request(self.source.name(), metrics::OP_LENGTH);
        tracing::debug!(key = %format_key(&key), len, backend = self.source.name(), "get_preimage_len");
        Ok(len)
    }

    /// Copy `len` preimage bytes for the key at `key_ptr` into guest memory at `dest`
    ///
    /// Writes exactly `len` bytes or fails; nothing is written on failure
    /// except by a channel that died mid-payload.
    pub fn get_preimage_from_oracle(
        &mut self,
        memory: &mut GuestMemory<'_>,
        key_ptr: u32,
        dest: u32,
        len: u32,
    ) -> Result<u32> {
        let key = memory.read_key(key_ptr)?;
        let window = memory.slice_mut(dest, len as usize)?;
        self.source.read_into(&key, window)?;

        self.requests += 1;
        metrics::record_request(self.source.name(), metrics::OP_READ);
        metrics::record_bytes_served(self.source.name(), len as usize);
        tracing::debug!(
            key = %format_key(&key),
            dest,
            len,
            backend = self.source.name(),
            "get_preimage_from_oracle"
        );
        Ok(len)
    }

    /// Forward `size` bytes at `ptr` as a hint
    ///
    /// Delivery problems are swallowed; only a pointer outside guest memory
    /// fails the call.
    pub fn hint_oracle(&mut self, memory: &GuestMemory<'_>, ptr: u32, size: u32) -> Result<()> {
        if !self.source.takes_hints() {
            metrics::record_hint(metrics::HINT_IGNORED);
            return Ok(());
        }

        let hint = memory.read(ptr, size as usize)?;
        let outcome = if self.source.hint(hint) {
            metrics::HINT_SENT
        } else {
            metrics::HINT_DROPPED
        };
        metrics::record_hint(outcome);
        tracing::trace!(bytes = hint.len(), outcome, "hint_oracle");
        Ok(())
    }
}

impl std::fmt::Debug for OracleBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleBridge")
            .field("backend", &self.source.name())
            .field("requests", &self.requests)
            .finish()
    }
}
