//! Checksum Verification
//!
//! SHA256 content hashing of downloaded snapshot files. Retries are not
//! handled here; the orchestrator decides what a mismatch means.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Verifier for downloaded snapshot files
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Calculate the lowercase hex SHA256 of a file
    pub fn compute_checksum(path: &Path) -> Result<String, VerifyError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();

        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Case-sensitive comparison; only the expected value is trimmed.
    pub fn verify(path: &Path, expected: &str) -> Result<bool, VerifyError> {
        let actual = Self::compute_checksum(path)?;
        Ok(actual == expected.trim())
    }

    /// Like [`verify`](Self::verify) but reports the mismatch as an error
    pub fn ensure(path: &Path, expected: &str) -> Result<(), VerifyError> {
        let actual = Self::compute_checksum(path)?;
        if actual != expected.trim() {
            return Err(VerifyError::ChecksumMismatch {
                expected: expected.trim().to_string(),
                actual,
            });
        }
        Ok(())
    }
}
