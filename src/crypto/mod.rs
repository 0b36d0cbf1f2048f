//! Cryptographic primitives for SaltSeal.
//!
//! This module provides:
//! - Project salt values and the OS-backed salt source (`salt`)
//! - X25519 public/private keys and key-file loading (`keys`)
//! - Per-recipient sealing and opening of salts (`envelope`)

pub mod envelope;
pub mod keys;
pub mod salt;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, SaltValue, ...};
pub use envelope::{open, seal, SealedBlob};
pub use keys::{load_private_key, load_public_key, KeyFingerprint, PrivateKey, PublicKey};
pub use salt::{OsSaltSource, SaltSource, SaltValue, SALT_LEN};
