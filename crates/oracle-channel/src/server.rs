//! Oracle side of the protocol
//!
//! Serves key requests from a preimage getter and optionally records every
//! answer so the session can later be replayed offline.

use std::io::{ErrorKind, Read, Write};

use oracle_core::constants::KEY_SIZE;
use oracle_core::{format_key, PreimageKey, PreimageRecorder};

use crate::error::{ChannelError, Result};
use crate::frame::{read_frame, read_frame_into, write_length};

/// Serves preimage requests written by an [`OracleChannel`](crate::OracleChannel)
pub struct OracleServer<R, W> {
    requests: R,
    responses: W,
    recorder: Option<PreimageRecorder>,
    served: usize,
}

impl<R: Read, W: Write> OracleServer<R, W> {
    pub fn new(requests: R, responses: W) -> Self {
        Self {
            requests,
            responses,
            recorder: None,
            served: 0,
        }
    }

    /// Record every served preimage
    pub fn with_recorder(mut self) -> Self {
        self.recorder = Some(PreimageRecorder::new());
        self
    }

    /// Serve one request
    ///
    /// Returns `Ok(None)` when the host hangs up cleanly between requests.
    /// A host that hangs up in the middle of a key is an error.
    pub fn next_request<F>(&mut self, mut get_preimage: F) -> Result<Option<PreimageKey>>
    where
        F: FnMut(&PreimageKey) -> anyhow::Result<Vec<u8>>,
    {
        let mut key = [0u8; KEY_SIZE];
        let first = loop {
            match self.requests.read(&mut key[..1]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if first == 0 {
            return Ok(None);
        }
        read_frame_into(&mut self.requests, &mut key[1..]).map_err(|e| match e {
            ChannelError::ChannelClosed { received, .. } => ChannelError::ChannelClosed {
                expected: KEY_SIZE,
                received: received + 1,
            },
            other => other,
        })?;

        let value = get_preimage(&key).map_err(|e| {
            ChannelError::Core(oracle_core::Error::UnknownKey(format!(
                "{}: {}",
                format_key(&key),
                e
            )))
        })?;

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(key, &value);
        }

        write_length(&mut self.responses, value.len() as u64)?;
        if !value.is_empty() {
            self.responses.write_all(&value)?;
        }
        self.responses.flush()?;
        self.served += 1;

        tracing::debug!(key = %format_key(&key), len = value.len(), "Served preimage");
        Ok(Some(key))
    }

    /// Serve until the host hangs up, returning the number of requests served
    pub fn serve<F>(&mut self, mut get_preimage: F) -> Result<usize>
    where
        F: FnMut(&PreimageKey) -> anyhow::Result<Vec<u8>>,
    {
        while self.next_request(&mut get_preimage)?.is_some() {}
        tracing::info!(served = self.served, "Host closed the key stream");
        Ok(self.served)
    }

    pub fn served(&self) -> usize {
        self.served
    }

    pub fn recorder(&self) -> Option<&PreimageRecorder> {
        self.recorder.as_ref()
    }

    pub fn into_recorder(self) -> Option<PreimageRecorder> {
        self.recorder
    }
}

/// Reads hints from the hint stream
///
/// Guests frame each hint as a 4-byte big-endian length followed by the hint
/// text; the host forwards those bytes untouched.
pub struct HintReader<R> {
    hints: R,
}

impl<R: Read> HintReader<R> {
    pub fn new(hints: R) -> Self {
        Self { hints }
    }

    /// Next hint, or `None` once the host closes the stream
    pub fn next_hint(&mut self) -> Result<Option<Vec<u8>>> {
        let mut len_buf = [0u8; 4];
        match read_frame_into(&mut self.hints, &mut len_buf) {
            Ok(()) => {}
            Err(ChannelError::ChannelClosed { received: 0, .. }) => return Ok(None),
            Err(e) => return Err(e),
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        Ok(Some(read_frame(&mut self.hints, len)?))
    }
}
