//! Source of key and nonce bytes.

use crypto_secretbox::aead::{rand_core::RngCore, OsRng};

use crate::error::{Error, Result};

/// Something that can fill a buffer with cryptographically secure bytes.
///
/// [`OsRandom`] is the only implementation used outside tests.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource {
    /// Fill `dest` entirely, or fail with [`Error::RandomSource`].
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::RandomSource(e.to_string()))
    }
}
