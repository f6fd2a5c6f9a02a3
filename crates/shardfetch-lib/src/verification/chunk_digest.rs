use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Verification failed: expected {}, got {}",
        hex::encode(.expected),
        hex::encode(.actual)
    )]
    VerificationFailed { expected: Vec<u8>, actual: Vec<u8> },
}

/// Streams chunk bytes through SHA-256 and compares the result with the digest recorded
/// in the catalog.
pub struct ChunkDigestVerifier {
    hasher: Sha256,
    expected_digest: Vec<u8>,
}

impl ChunkDigestVerifier {
    #[inline]
    pub fn new(expected_digest: Vec<u8>) -> Self {
        Self {
            hasher: Sha256::new(),
            expected_digest,
        }
    }

    #[inline]
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        Digest::update(&mut self.hasher, data.as_ref());
    }

    pub fn verify(self) -> Result<(), VerificationError> {
        let actual_digest = self.hasher.finalize().to_vec();

        if actual_digest == self.expected_digest {
            Ok(())
        } else {
            Err(VerificationError::VerificationFailed {
                expected: self.expected_digest,
                actual: actual_digest,
            })
        }
    }
}
