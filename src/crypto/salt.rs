//! Project salt values and the random source that produces them.
//!
//! A `SaltValue` is 32 bytes (256 bits) straight from the operating
//! system CSPRNG.  It is zeroized on drop, never printed by `Debug`,
//! and compared in constant time.

use std::fmt;

use rand::TryRngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, SaltSealError};

/// Length of a project salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Fill `buf` from the OS random source.
///
/// Fails with `EntropySource` if the OS source is unavailable.  Callers
/// must treat that as fatal: there is no fallback generator.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    rand::rngs::OsRng
        .try_fill_bytes(buf)
        .map_err(|e| SaltSealError::EntropySource(e.to_string()))
}

/// The shared secret salt of a project.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SaltValue {
    bytes: [u8; SALT_LEN],
}

impl SaltValue {
    /// Wrap raw salt bytes.
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a salt from a decrypted buffer, wiping the buffer either way.
    pub(crate) fn from_vec(mut plaintext: Vec<u8>) -> Result<Self> {
        if plaintext.len() != SALT_LEN {
            plaintext.zeroize();
            return Err(SaltSealError::Integrity);
        }
        let mut bytes = [0u8; SALT_LEN];
        bytes.copy_from_slice(&plaintext);
        plaintext.zeroize();
        Ok(Self { bytes })
    }

    /// Access the raw salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.bytes
    }
}

impl PartialEq for SaltValue {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SaltValue {}

impl fmt::Debug for SaltValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SaltValue(<redacted>)")
    }
}

/// A source of fresh project salts.
pub trait SaltSource {
    /// Produce a new random salt.
    fn generate(&self) -> Result<SaltValue>;
}

/// Salt source backed by the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSaltSource;

impl SaltSource for OsSaltSource {
    fn generate(&self) -> Result<SaltValue> {
        let mut bytes = [0u8; SALT_LEN];
        fill_random(&mut bytes)?;
        let salt = SaltValue::from_bytes(bytes);
        bytes.zeroize();
        Ok(salt)
    }
}
