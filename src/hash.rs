//! Content fingerprinting for change detection.
//!
//! A file's fingerprint is the SHA-256 digest of its bytes, hex-encoded.
//! Reading happens in fixed-size blocks so arbitrarily large PDFs never
//! land in memory whole.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Error;

const BLOCK_SIZE: usize = 8192;

/// Compute the content fingerprint of a file.
///
/// Pure function of the file's bytes: the same content always yields the
/// same 64-char lowercase hex string, and any byte-level change yields a
/// different one.
pub fn fingerprint(path: &Path) -> Result<String, Error> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut block).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn deterministic_for_same_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"identical bytes").unwrap();

        let first = fingerprint(&path).unwrap();
        let second = fingerprint(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn changes_when_content_changes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.pdf");

        fs::write(&path, b"version one").unwrap();
        let before = fingerprint(&path).unwrap();

        fs::write(&path, b"version two").unwrap();
        let after = fingerprint(&path).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn spans_block_boundaries() {
        let dir = tempfile::TempDir::new().unwrap();

        // Exactly one block, one block plus a byte, and several blocks must
        // all hash to the same value as a one-shot digest of the bytes.
        for len in [BLOCK_SIZE, BLOCK_SIZE + 1, BLOCK_SIZE * 3 + 17] {
            let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let path = dir.path().join(format!("f{}.bin", len));
            fs::write(&path, &bytes).unwrap();

            let streamed = fingerprint(&path).unwrap();
            let oneshot = format!("{:x}", Sha256::digest(&bytes));
            assert_eq!(streamed, oneshot);
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = fingerprint(&dir.path().join("absent.pdf")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
