//! Host side of the online oracle protocol
//!
//! Four unidirectional streams connect the host to the oracle process:
//!
//! | Stream | Direction | Content |
//! |--------|-----------|---------|
//! | hint | host -> oracle | opaque hint bytes, no reply |
//! | key | host -> oracle | 32-byte key per request |
//! | length | oracle -> host | 8-byte big-endian length per key |
//! | data | oracle -> host | exactly the announced number of bytes |
//!
//! The length and data streams are usually the same descriptor.

use std::fs::File;
use std::io::{self, Read, Write};

use oracle_core::{format_key, FdConfig, PreimageKey};

use crate::error::{ChannelError, Result};
use crate::frame::{read_frame_into, read_length};

type Reader = Box<dyn Read + Send>;
type Writer = Box<dyn Write + Send>;

/// Length announced by the oracle and not yet consumed by a data request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingLength {
    key: PreimageKey,
    len: u64,
}

/// Blocking duplex channel to an external oracle process
pub struct OracleChannel {
    hints: Writer,
    keys: Writer,
    lengths: Reader,
    data: Reader,
    pending: Option<PendingLength>,
}

impl OracleChannel {
    /// Channel over arbitrary streams
    pub fn new(
        hints: impl Write + Send + 'static,
        keys: impl Write + Send + 'static,
        lengths: impl Read + Send + 'static,
        data: impl Read + Send + 'static,
    ) -> Self {
        Self {
            hints: Box::new(hints),
            keys: Box::new(keys),
            lengths: Box::new(lengths),
            data: Box::new(data),
            pending: None,
        }
    }

    /// Channel over inherited file descriptors
    ///
    /// When the length and data descriptors are the same number the
    /// descriptor is opened once and duplicated, so the two readers share
    /// one stream position.
    ///
    /// # Safety
    ///
    /// Every descriptor in `fds` must be open, owned by nobody else in this
    /// process, and stay open for the life of the channel.
    #[cfg(unix)]
    pub unsafe fn from_fds(fds: FdConfig) -> Result<Self> {
        use std::os::fd::FromRawFd;

        let hints = File::from_raw_fd(fds.hint_write);
        let keys = if fds.key_write == fds.hint_write {
            hints.try_clone()?
        } else {
            File::from_raw_fd(fds.key_write)
        };
        let lengths = File::from_raw_fd(fds.length_read);
        let data = if fds.data_read == fds.length_read {
            lengths.try_clone()?
        } else {
            File::from_raw_fd(fds.data_read)
        };

        tracing::debug!(?fds, "Oracle channel opened on inherited descriptors");
        Ok(Self::new(hints, keys, lengths, data))
    }

    /// Send an advisory hint
    ///
    /// Never fails: hints are optimizations, so write errors are logged and
    /// dropped.
    pub fn hint(&mut self, hint: &[u8]) -> bool {
        let result = self
            .hints
            .write_all(hint)
            .and_then(|_| self.hints.flush());
        match result {
            Ok(()) => {
                tracing::trace!(bytes = hint.len(), "Hint sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = hint.len(), "Dropping hint after write failure");
                false
            }
        }
    }

    /// Ask the oracle for the length of the preimage of `key`
    ///
    /// Always consumes the full 8-byte frame, zero included, so the stream
    /// stays aligned for the data request that follows.
    ///
    /// A previous announcement whose data was never requested is drained
    /// first, since its payload is still queued ahead of the new length.
    pub fn request_length(&mut self, key: &PreimageKey) -> Result<u64> {
        if let Some(stale) = self.pending.take() {
            self.discard_payload(&stale)?;
        }

        self.keys.write_all(key)?;
        self.keys.flush()?;

        let len = read_length(&mut self.lengths)?;
        self.pending = Some(PendingLength { key: *key, len });

        tracing::debug!(key = %format_key(key), len, "Preimage length received");
        Ok(len)
    }

    /// Read the `n` bytes announced by the preceding [`request_length`] for `key`
    ///
    /// The request must match the pending announcement; anything else would
    /// read bytes meant for a different response.
    ///
    /// [`request_length`]: OracleChannel::request_length
    pub fn request_bytes(&mut self, key: &PreimageKey, n: u64) -> Result<Vec<u8>> {
        let len = usize::try_from(n).map_err(|_| ChannelError::LengthOverflow(n))?;
        let mut payload = vec![0u8; len];
        self.request_bytes_into(key, &mut payload)?;
        Ok(payload)
    }

    /// Like [`request_bytes`](OracleChannel::request_bytes), filling `buf`
    /// whose length is the requested size
    pub fn request_bytes_into(&mut self, key: &PreimageKey, buf: &mut [u8]) -> Result<()> {
        let n = buf.len() as u64;
        let pending = self
            .pending
            .take()
            .ok_or_else(|| ChannelError::NoPendingLength(format_key(key)))?;

        // a rejected request leaves the payload queued for the next drain
        if &pending.key != key {
            self.pending = Some(pending);
            return Err(ChannelError::KeyMismatch {
                pending_key: format_key(&pending.key),
                requested_key: format_key(key),
            });
        }
        if pending.len != n {
            self.pending = Some(pending);
            return Err(ChannelError::LengthMismatch {
                announced: pending.len,
                requested: n,
            });
        }

        read_frame_into(&mut self.data, buf)?;

        tracing::debug!(key = %format_key(key), len = n, "Preimage data received");
        Ok(())
    }

    fn discard_payload(&mut self, stale: &PendingLength) -> Result<()> {
        if stale.len == 0 {
            return Ok(());
        }
        tracing::warn!(
            key = %format_key(&stale.key),
            len = stale.len,
            "Discarding payload of a length request never followed by a data request"
        );
        let skipped = io::copy(&mut (&mut self.data).take(stale.len), &mut io::sink())?;
        if skipped < stale.len {
            return Err(ChannelError::ChannelClosed {
                expected: stale.len as usize,
                received: skipped as usize,
            });
        }
        Ok(())
    }

    /// Length request followed by its data request
    pub fn fetch(&mut self, key: &PreimageKey) -> Result<Vec<u8>> {
        let len = self.request_length(key)?;
        self.request_bytes(key, len)
    }
}

impl std::fmt::Debug for OracleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleChannel")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    /// Writer whose contents stay observable after being boxed
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn responses(values: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in values {
            out.extend_from_slice(&(v.len() as u64).to_be_bytes());
            out.extend_from_slice(v);
        }
        out
    }

    fn channel_with(response: Vec<u8>) -> (OracleChannel, SharedBuf, SharedBuf) {
        let hints = SharedBuf::default();
        let keys = SharedBuf::default();
        let stream = Cursor::new(response);
        // one response stream serves both lengths and data, as with a shared fd
        let shared = Arc::new(Mutex::new(stream));
        let channel = OracleChannel::new(
            hints.clone(),
            keys.clone(),
            SharedReader(shared.clone()),
            SharedReader(shared),
        );
        (channel, hints, keys)
    }

    struct SharedReader(Arc<Mutex<Cursor<Vec<u8>>>>);

    impl Read for SharedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.lock().unwrap().read(buf)
        }
    }

    #[test]
    fn test_interleaved_requests_stay_aligned() {
        let (mut channel, _, keys) = channel_with(responses(&[b"hello", b"", b"Hello, World!"]));
        let a = [0x01; 32];
        let b = [0x02; 32];
        let c = [0x03; 32];

        assert_eq!(channel.request_length(&a).unwrap(), 5);
        assert_eq!(channel.request_bytes(&a, 5).unwrap(), b"hello");
        assert_eq!(channel.request_length(&b).unwrap(), 0);
        assert!(channel.request_bytes(&b, 0).unwrap().is_empty());
        assert_eq!(channel.fetch(&c).unwrap(), b"Hello, World!");

        let written = keys.0.lock().unwrap().clone();
        assert_eq!(written.len(), 96);
        assert_eq!(&written[..32], &a);
        assert_eq!(&written[64..], &c);
    }

    #[test]
    fn test_peer_closes_mid_payload() {
        let mut response = 10u64.to_be_bytes().to_vec();
        response.extend_from_slice(b"short");
        let (mut channel, _, _) = channel_with(response);
        let key = [0x01; 32];

        assert_eq!(channel.request_length(&key).unwrap(), 10);
        assert!(matches!(
            channel.request_bytes(&key, 10),
            Err(ChannelError::ChannelClosed { expected: 10, received: 5 })
        ));
    }

    #[test]
    fn test_peer_closes_mid_length() {
        let (mut channel, _, _) = channel_with(vec![0, 0, 0]);
        assert!(matches!(
            channel.request_length(&[0x01; 32]),
            Err(ChannelError::ChannelClosed { expected: 8, received: 3 })
        ));
    }

    #[test]
    fn test_data_request_must_follow_matching_length() {
        let key = [0x01; 32];

        let (mut channel, _, _) = channel_with(responses(&[b"hello"]));
        assert!(matches!(
            channel.request_bytes(&key, 5),
            Err(ChannelError::NoPendingLength(_))
        ));
        channel.request_length(&key).unwrap();
        assert!(matches!(
            channel.request_bytes(&[0x02; 32], 5),
            Err(ChannelError::KeyMismatch { .. })
        ));

        let (mut channel, _, _) = channel_with(responses(&[b"hello", b"world"]));
        channel.request_length(&key).unwrap();
        assert!(matches!(
            channel.request_bytes(&key, 4),
            Err(ChannelError::LengthMismatch { announced: 5, requested: 4 })
        ));
        // the rejected payload is skipped before the next answer
        assert_eq!(channel.fetch(&[0x02; 32]).unwrap(), b"world");
    }

    #[test]
    fn test_unfetched_length_is_drained() {
        let (mut channel, _, _) =
            channel_with(responses(&[b"hello", b"hello", b"Hello, World!"]));
        let a = [0x01; 32];
        let c = [0x03; 32];

        assert_eq!(channel.request_length(&a).unwrap(), 5);
        assert_eq!(channel.request_length(&a).unwrap(), 5);
        assert_eq!(channel.request_bytes(&a, 5).unwrap(), b"hello");
        assert_eq!(channel.request_length(&c).unwrap(), 13);
        assert_eq!(channel.request_bytes(&c, 13).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_unfetched_length_drain_hits_close() {
        let mut response = 10u64.to_be_bytes().to_vec();
        response.extend_from_slice(b"short");
        let (mut channel, _, _) = channel_with(response);
        let key = [0x01; 32];

        assert_eq!(channel.request_length(&key).unwrap(), 10);
        assert!(matches!(
            channel.request_length(&key),
            Err(ChannelError::ChannelClosed { expected: 10, received: 5 })
        ));
    }

    #[test]
    fn test_hint_is_forwarded_verbatim() {
        let (mut channel, hints, _) = channel_with(Vec::new());
        assert!(channel.hint(b"\x00\x00\x00\x05l1-block"));
        assert_eq!(hints.0.lock().unwrap().as_slice(), b"\x00\x00\x00\x05l1-block");
    }

    #[test]
    fn test_hint_failure_is_swallowed() {
        let mut channel = OracleChannel::new(BrokenPipe, io::sink(), io::empty(), io::empty());
        assert!(!channel.hint(b"advisory"));
    }
}
