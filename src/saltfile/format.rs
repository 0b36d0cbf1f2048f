//! Binary salt file format and checksum verification.
//!
//! A `.salt` file has this layout:
//!
//! ```text
//! [SSLT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON]
//! [record_count: 4 bytes LE]{[record_len: 4 bytes LE][record]}*[SHA-256: 32 bytes]
//! ```
//!
//! - **Magic** (`SSLT`): identifies the file as a SaltSeal salt file.
//! - **Version**: format version (currently `1`).  Newer versions are
//!   refused rather than parsed on a best-effort basis.
//! - **Header JSON**: serialized `SaltFileHeader`.
//! - **Records**: each one encoded by `SealedSaltRecord::encode`.
//! - **SHA-256**: checksum over every preceding byte, catching
//!   accidental corruption.  Tampering with a sealed salt is caught
//!   independently by the envelope's authentication tag.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::record::{Reader, SealedSaltRecord};
use crate::errors::{Result, SaltSealError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every salt file.
const MAGIC: &[u8; 4] = b"SSLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the checksum appended to the file (SHA-256 = 32 bytes).
const CHECKSUM_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// SaltFileHeader
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a salt file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltFileHeader {
    /// Project name the salt belongs to.
    pub project: String,

    /// When the project was created.
    pub created_at: DateTime<Utc>,

    /// When sites were last added, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Length of the sealed salt in bytes.
    pub salt_len: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize a header and records into the binary file layout.
///
/// Records are written in the order given.
pub fn encode_file(header: &SaltFileHeader, records: &[&SealedSaltRecord]) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| SaltSealError::SerializationError(format!("header: {e}")))?;
    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        SaltSealError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let record_count = u32::try_from(records.len())
        .map_err(|_| SaltSealError::SerializationError("too many records".into()))?;

    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&record_count.to_le_bytes());

    for record in records {
        let encoded = record.encode()?;
        let len = u32::try_from(encoded.len())
            .map_err(|_| SaltSealError::SerializationError("record too long".into()))?;
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&encoded);
    }

    let checksum = Sha256::digest(&buf);
    buf.extend_from_slice(&checksum); // 32 bytes
    Ok(buf)
}

/// Parse the binary file layout into a header and its records.
///
/// Records come back in file order; duplicate detection is left to the
/// caller.
pub fn decode_file(data: &[u8]) -> Result<(SaltFileHeader, Vec<SealedSaltRecord>)> {
    if data.len() < PREFIX_LEN + CHECKSUM_LEN {
        return Err(SaltSealError::InvalidFileFormat(
            "file too small to be a salt file".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(SaltSealError::InvalidFileFormat(
            "missing SSLT magic bytes".into(),
        ));
    }

    let version = data[4];
    if version == 0 {
        return Err(SaltSealError::InvalidFileFormat("version 0 is not valid".into()));
    }
    if version > CURRENT_VERSION {
        return Err(SaltSealError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let (body, stored_checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    let mut reader = Reader::new(&body[5..]);

    let header_len = reader
        .u32()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SaltSealError::InvalidFileFormat("bad header length".into()))?;
    let header_bytes = reader.take(header_len).ok_or_else(|| {
        SaltSealError::InvalidFileFormat("header length exceeds file size".into())
    })?;
    let header: SaltFileHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| SaltSealError::InvalidFileFormat(format!("header JSON: {e}")))?;

    // --- Records ---

    let count = reader
        .u32()
        .ok_or_else(|| SaltSealError::InvalidFileFormat("missing record count".into()))?;
    let mut records = Vec::new();
    for index in 0..count as usize {
        let len = reader.u32().ok_or_else(|| SaltSealError::MalformedRecord {
            index,
            reason: "truncated record length".into(),
        })?;
        let bytes = reader
            .take(len as usize)
            .ok_or_else(|| SaltSealError::MalformedRecord {
                index,
                reason: format!("record length {len} exceeds file size"),
            })?;
        records.push(SealedSaltRecord::decode_at(bytes, index)?);
    }

    if !reader.is_empty() {
        return Err(SaltSealError::InvalidFileFormat(format!(
            "{} unexpected bytes after record #{}",
            reader.remaining(),
            records.len()
        )));
    }

    // --- Checksum over everything before it ---

    let actual = Sha256::digest(body);
    if !bool::from(actual.as_slice().ct_eq(stored_checksum)) {
        return Err(SaltSealError::ChecksumMismatch);
    }

    Ok((header, records))
}

/// Read and decode a salt file from disk.
pub fn read_salt_file(path: &Path) -> Result<(SaltFileHeader, Vec<SealedSaltRecord>)> {
    if !path.exists() {
        return Err(SaltSealError::SaltFileNotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    decode_file(&data)
}

/// Write bytes to `path` **atomically**.
///
/// The bytes go to a temp file in the same directory which is then
/// renamed over the target, so readers never see a half-written file
/// and a failed write leaves the old file in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, bytes)?;

    // Sealed salts are not secret, but nobody else needs to write them.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o644);
        if let Err(e) = fs::set_permissions(&tmp_path, perms) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Write bytes to a new file at `path`, failing if it already exists.
///
/// The target is created exclusively, so a file that appeared since the
/// caller last checked is never replaced.  A failed write removes the
/// partial file.
pub fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => SaltSealError::SaltFileExists(path.to_path_buf()),
        _ => SaltSealError::Io(e),
    })?;

    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}
