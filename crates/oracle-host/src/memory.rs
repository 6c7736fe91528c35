//! Window onto the guest's linear memory
//!
//! Valid for a single host-function invocation: the slice is borrowed from
//! the store and memory may grow (and move) once the guest resumes.

use std::ops::Range;

use oracle_core::constants::KEY_SIZE;
use oracle_core::PreimageKey;
use wasmtime::{Caller, Extern, Memory};

use crate::error::{HostError, Result};

pub struct GuestMemory<'a> {
    data: &'a mut [u8],
}

impl<'a> GuestMemory<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Current memory size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn range(&self, offset: u32, len: usize) -> Result<Range<usize>> {
        let start = offset as usize;
        start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .map(|end| start..end)
            .ok_or(HostError::MemoryOutOfBounds {
                offset: offset as u64,
                len: len as u64,
                size: self.data.len(),
            })
    }

    pub fn read(&self, offset: u32, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Read a 32-byte preimage key
    pub fn read_key(&self, offset: u32) -> Result<PreimageKey> {
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(self.read(offset, KEY_SIZE)?);
        Ok(key)
    }

    /// Mutable window of `len` bytes starting at `offset`
    pub fn slice_mut(&mut self, offset: u32, len: usize) -> Result<&mut [u8]> {
        let range = self.range(offset, len)?;
        Ok(&mut self.data[range])
    }

    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        self.slice_mut(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}

/// The guest's exported `memory`
pub fn exported_memory<T>(caller: &mut Caller<'_, T>) -> Result<Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Ok(memory),
        _ => Err(HostError::MissingMemory),
    }
}
