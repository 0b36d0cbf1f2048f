//! Sealing a salt for one recipient public key.
//!
//! Each seal uses a fresh ephemeral X25519 key pair.  The Diffie-Hellman
//! output is stretched with HKDF-SHA256 into an AES-256-GCM key, and the
//! salt is encrypted with a random 12-byte nonce.  The ephemeral public
//! key, the recipient public key and the recipient's site id are bound in
//! as associated data, so a sealed salt only opens under the site id it
//! was sealed for.
//!
//! Layout of a sealed blob:
//!
//! ```text
//! [recipient fingerprint: 32][ephemeral public key: 32][nonce: 12][ciphertext + tag: 48]
//! ```
//!
//! The fingerprint lets `open` tell a wrong key (`KeyMismatch`) apart
//! from a damaged blob (`Integrity`).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::keys::{KeyFingerprint, PrivateKey, PublicKey, FINGERPRINT_LEN, KEY_LEN};
use crate::crypto::salt::{fill_random, SaltValue, SALT_LEN};
use crate::errors::{Result, SaltSealError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Total length of a sealed blob for a 32-byte salt.
pub const SEALED_LEN: usize = FINGERPRINT_LEN + KEY_LEN + NONCE_LEN + SALT_LEN + TAG_LEN;

/// HKDF info string for envelope keys.
const HKDF_INFO: &[u8] = b"saltseal-envelope-v1";

/// A salt sealed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    recipient: KeyFingerprint,
    ephemeral_public: [u8; KEY_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedBlob {
    /// Fingerprint of the public key this blob was sealed for.
    pub fn recipient(&self) -> &KeyFingerprint {
        &self.recipient
    }

    /// Serialize to the fixed blob layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SEALED_LEN);
        buf.extend_from_slice(self.recipient.as_bytes());
        buf.extend_from_slice(&self.ephemeral_public);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Parse the fixed blob layout.
    ///
    /// Only the length is checked here; authenticity is checked by `open`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SEALED_LEN {
            return None;
        }
        let (fp, rest) = bytes.split_at(FINGERPRINT_LEN);
        let (eph, rest) = rest.split_at(KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        Some(Self {
            recipient: KeyFingerprint::from_bytes(fp.try_into().ok()?),
            ephemeral_public: eph.try_into().ok()?,
            nonce: nonce.try_into().ok()?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Seal `salt` so that only the holder of `recipient`'s private key can open it.
///
/// `site_id` is authenticated but not stored in the blob.
/// Non-deterministic: sealing the same salt twice yields different blobs.
pub fn seal(salt: &SaltValue, recipient: &PublicKey, site_id: &str) -> Result<SealedBlob> {
    let mut eph_bytes = [0u8; KEY_LEN];
    fill_random(&mut eph_bytes)?;
    let ephemeral = StaticSecret::from(eph_bytes);
    eph_bytes.zeroize();
    let ephemeral_public = *x25519_dalek::PublicKey::from(&ephemeral).as_bytes();

    let shared = ephemeral.diffie_hellman(recipient.inner());
    if !shared.was_contributory() {
        return Err(SaltSealError::SealFailed(
            "recipient public key is a low-order point".into(),
        ));
    }

    let key = derive_envelope_key(shared.as_bytes(), &ephemeral_public, recipient.as_bytes())?;

    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| SaltSealError::SealFailed(format!("invalid key length: {e}")))?;
    let aad = associated_data(&ephemeral_public, recipient.as_bytes(), site_id);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: salt.as_bytes(),
                aad: &aad,
            },
        )
        .map_err(|e| SaltSealError::SealFailed(format!("encryption error: {e}")))?;

    Ok(SealedBlob {
        recipient: recipient.fingerprint(),
        ephemeral_public,
        nonce,
        ciphertext,
    })
}

/// Open a sealed blob with a private key.
///
/// `site_id` must be the id the blob was sealed under.  Fails with
/// `KeyMismatch` when the blob was sealed for another key and with
/// `Integrity` when the blob or its site id was altered.  Never returns
/// partial plaintext.
pub fn open(blob: &SealedBlob, key: &PrivateKey, site_id: &str) -> Result<SaltValue> {
    let our_public = key.public_key();
    let addressed_to_us = blob.recipient == our_public.fingerprint();

    match decrypt(blob, key, &our_public, site_id) {
        Ok(salt) if addressed_to_us => Ok(salt),
        // The ciphertext authenticated against our key, so the fingerprint
        // bytes themselves were altered.
        Ok(_) => Err(SaltSealError::Integrity),
        Err(_) if addressed_to_us => Err(SaltSealError::Integrity),
        Err(_) => Err(SaltSealError::KeyMismatch),
    }
}

/// Decrypt and authenticate the ciphertext under `key`.
fn decrypt(
    blob: &SealedBlob,
    key: &PrivateKey,
    our_public: &PublicKey,
    site_id: &str,
) -> Result<SaltValue> {
    let eph_public = x25519_dalek::PublicKey::from(blob.ephemeral_public);
    let shared = key.inner().diffie_hellman(&eph_public);
    if !shared.was_contributory() {
        return Err(SaltSealError::Integrity);
    }

    let env_key = derive_envelope_key(shared.as_bytes(), &blob.ephemeral_public, our_public.as_bytes())?;
    let cipher =
        Aes256Gcm::new_from_slice(env_key.as_slice()).map_err(|_| SaltSealError::Integrity)?;
    let aad = associated_data(&blob.ephemeral_public, our_public.as_bytes(), site_id);

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&blob.nonce),
            Payload {
                msg: &blob.ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| SaltSealError::Integrity)?;

    SaltValue::from_vec(plaintext)
}

/// HKDF-SHA256 with both public keys as salt.
fn derive_envelope_key(
    shared: &[u8; KEY_LEN],
    ephemeral_public: &[u8; KEY_LEN],
    recipient_public: &[u8; KEY_LEN],
) -> Result<Zeroizing<[u8; 32]>> {
    let hk_salt = key_pair_binding(ephemeral_public, recipient_public);
    let hk = Hkdf::<Sha256>::new(Some(&hk_salt), shared);

    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, okm.as_mut_slice())
        .map_err(|e| SaltSealError::SealFailed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

fn key_pair_binding(ephemeral_public: &[u8; KEY_LEN], recipient_public: &[u8; KEY_LEN]) -> [u8; 2 * KEY_LEN] {
    let mut out = [0u8; 2 * KEY_LEN];
    out[..KEY_LEN].copy_from_slice(ephemeral_public);
    out[KEY_LEN..].copy_from_slice(recipient_public);
    out
}

/// `ephemeral pk ‖ recipient pk ‖ site id`.
fn associated_data(
    ephemeral_public: &[u8; KEY_LEN],
    recipient_public: &[u8; KEY_LEN],
    site_id: &str,
) -> Vec<u8> {
    let mut aad = Vec::with_capacity(2 * KEY_LEN + site_id.len());
    aad.extend_from_slice(&key_pair_binding(ephemeral_public, recipient_public));
    aad.extend_from_slice(site_id.as_bytes());
    aad
}
