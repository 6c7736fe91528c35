//! Explicit framing over raw byte streams
//!
//! Pipes give no message boundaries. Every frame, the 8-byte length as well
//! as the variable-length payload, goes through [`read_frame_into`], which
//! keeps reading until the frame is complete or the peer hangs up.

use std::io::{ErrorKind, Read, Write};

use oracle_core::constants::LENGTH_PREFIX_SIZE;

use crate::error::{ChannelError, Result};

/// Fill `buf` completely from `reader`
///
/// Short reads are retried against the remaining count. End of stream before
/// the buffer is full is [`ChannelError::ChannelClosed`].
pub fn read_frame_into<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ChannelError::ChannelClosed {
                    expected: buf.len(),
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read exactly `n` bytes into a fresh buffer
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    read_frame_into(reader, &mut buf)?;
    Ok(buf)
}

/// Read an 8-byte big-endian length frame
pub fn read_length<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; LENGTH_PREFIX_SIZE];
    read_frame_into(reader, &mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Write an 8-byte big-endian length frame
pub fn write_length<W: Write + ?Sized>(writer: &mut W, len: u64) -> Result<()> {
    writer.write_all(&len.to_be_bytes())?;
    Ok(())
}
