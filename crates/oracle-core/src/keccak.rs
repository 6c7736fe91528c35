//! Keccak256 content addressing

use tiny_keccak::{Hasher, Keccak};

use crate::{Error, PreimageKey, Result};

pub fn keccak256(data: &[u8]) -> PreimageKey {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Check that `key` is the keccak256 of `value`
pub fn verify_keccak_key(key: &PreimageKey, value: &[u8]) -> Result<()> {
    let actual = keccak256(value);
    if &actual != key {
        return Err(Error::KeccakMismatch {
            key: hex::encode(key),
            actual: hex::encode(actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_known_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_verify_keccak_key() {
        let key = keccak256(b"Hello, World!");
        assert!(verify_keccak_key(&key, b"Hello, World!").is_ok());
        assert!(matches!(
            verify_keccak_key(&key, b"Hello"),
            Err(Error::KeccakMismatch { .. })
        ));
    }
}
