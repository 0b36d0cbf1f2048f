//! X25519 key material for sites and projects.
//!
//! Key files are small text files holding the standard base64 encoding
//! of the 32 raw key bytes.  Surrounding whitespace is ignored so keys
//! can be pasted or `echo`ed into place.
//!
//! Generating and rotating key pairs is left to the project's own key
//! management; `PrivateKey::generate` exists for tests and embedders.

use std::fmt;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::salt::fill_random;
use crate::errors::{Result, SaltSealError};

/// Length of an X25519 key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of a key fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Domain separation prefix for fingerprints.
const FINGERPRINT_DOMAIN: &[u8] = b"saltseal-key-fingerprint-v1";

/// A recipient public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl PublicKey {
    /// Build a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.as_bytes()
    }

    /// Base64 text form, as stored in key files.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.as_bytes())
    }

    /// Stable fingerprint identifying this key inside sealed blobs.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(self.as_bytes());
        KeyFingerprint(hasher.finalize().into())
    }

    pub(crate) fn inner(&self) -> &x25519_dalek::PublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// A private key.  Zeroized on drop by `x25519-dalek`.
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Generate a fresh private key from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        fill_random(&mut bytes)?;
        let key = Self(StaticSecret::from(bytes));
        bytes.zeroize();
        Ok(key)
    }

    /// Build a private key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519_dalek::PublicKey::from(&self.0))
    }

    /// Base64 text form, wiped from memory on drop.
    pub fn to_base64(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.0.to_bytes());
        Zeroizing::new(BASE64.encode(bytes.as_slice()))
    }

    pub(crate) fn inner(&self) -> &StaticSecret {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(<redacted>, public {})", self.public_key().fingerprint())
    }
}

/// SHA-256 fingerprint of a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint([u8; FINGERPRINT_LEN]);

impl KeyFingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

/// Short lowercase hex form (first 8 bytes) for display.
impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({self})")
    }
}

/// Load a public key file.
pub fn load_public_key(path: &Path) -> Result<PublicKey> {
    let bytes = read_key_file(path)?;
    Ok(PublicKey::from_bytes(*bytes))
}

/// Load a private key file.
pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let bytes = read_key_file(path)?;
    Ok(PrivateKey::from_bytes(*bytes))
}

/// Read and decode a base64 key file into exactly `KEY_LEN` bytes.
fn read_key_file(path: &Path) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if !path.exists() {
        return Err(SaltSealError::KeyFile(format!(
            "key file not found at {}",
            path.display()
        )));
    }

    let text = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
        SaltSealError::KeyFile(format!("failed to read {}: {e}", path.display()))
    })?);

    let decoded = Zeroizing::new(BASE64.decode(text.trim()).map_err(|e| {
        SaltSealError::KeyFile(format!("{} is not valid base64: {e}", path.display()))
    })?);

    if decoded.len() != KEY_LEN {
        return Err(SaltSealError::KeyFile(format!(
            "{} must hold exactly {KEY_LEN} key bytes, got {}",
            path.display(),
            decoded.len()
        )));
    }

    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}
