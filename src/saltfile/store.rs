//! In-memory salt file used by the engine workflows.
//!
//! `SaltFile` wraps the binary format layer.  Records are kept sorted
//! by site id, which is also the order they are written in, so saving
//! an unmodified file reproduces it byte for byte.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::format::{self, SaltFileHeader};
use super::record::SealedSaltRecord;
use crate::crypto::keys::PrivateKey;
use crate::crypto::salt::SALT_LEN;
use crate::errors::{Result, SaltSealError};

/// The full set of sealed salts for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltFile {
    header: SaltFileHeader,

    /// Site id -> sealed record.
    records: BTreeMap<String, SealedSaltRecord>,
}

impl SaltFile {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create an empty salt file for `project`.
    pub fn new(project: &str) -> Self {
        Self {
            header: SaltFileHeader {
                project: project.to_string(),
                created_at: Utc::now(),
                updated_at: None,
                salt_len: SALT_LEN,
            },
            records: BTreeMap::new(),
        }
    }

    /// Load a salt file from disk.
    ///
    /// Fails with `SaltFileNotFound`, format errors from the binary
    /// layer, or `DuplicateSite` if two records share a site id.
    pub fn load(path: &Path) -> Result<Self> {
        let (header, records) = format::read_salt_file(path)?;
        let file = Self::from_parts(header, records)?;
        debug!(path = %path.display(), records = file.len(), "loaded salt file");
        Ok(file)
    }

    /// Decode a salt file from its binary form.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (header, records) = format::decode_file(data)?;
        Self::from_parts(header, records)
    }

    fn from_parts(header: SaltFileHeader, records: Vec<SealedSaltRecord>) -> Result<Self> {
        if header.salt_len != SALT_LEN {
            return Err(SaltSealError::InvalidFileFormat(format!(
                "salt length {} is not supported (expected {SALT_LEN})",
                header.salt_len
            )));
        }

        let mut file = Self {
            header,
            records: BTreeMap::new(),
        };
        for record in records {
            file.add_record(record)?;
        }
        Ok(file)
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Add a record for a site that is not yet in the file.
    ///
    /// Existing records are never overwritten: a second record for the
    /// same site id fails with `DuplicateSite`.
    pub fn add_record(&mut self, record: SealedSaltRecord) -> Result<()> {
        if self.records.contains_key(record.site_id()) {
            return Err(SaltSealError::DuplicateSite(record.site_id().to_string()));
        }
        self.records.insert(record.site_id().to_string(), record);
        Ok(())
    }

    /// The record for `site_id`, if present.
    pub fn record_for(&self, site_id: &str) -> Option<&SealedSaltRecord> {
        self.records.get(site_id)
    }

    /// The record sealed for `key`'s public half, if any.
    ///
    /// Matching is by fingerprint only; nothing is decrypted.
    pub fn record_for_key(&self, key: &PrivateKey) -> Option<&SealedSaltRecord> {
        let fingerprint = key.public_key().fingerprint();
        self.records
            .values()
            .find(|r| r.blob().recipient() == &fingerprint)
    }

    /// Returns `true` if the file holds a record for `site_id`.
    pub fn contains(&self, site_id: &str) -> bool {
        self.records.contains_key(site_id)
    }

    /// All records, sorted by site id.
    pub fn records(&self) -> impl Iterator<Item = &SealedSaltRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encode the file in its binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let records: Vec<&SealedSaltRecord> = self.records.values().collect();
        format::encode_file(&self.header, &records)
    }

    /// Write the file to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        format::write_atomic(path, &bytes)?;
        debug!(path = %path.display(), records = self.len(), "saved salt file");
        Ok(())
    }

    /// Write the file to `path`, which must not exist yet.
    ///
    /// Fails with `SaltFileExists` if something is already at `path`.
    pub fn save_new(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        format::write_new(path, &bytes)?;
        debug!(path = %path.display(), records = self.len(), "wrote new salt file");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn project_name(&self) -> &str {
        &self.header.project
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.header.updated_at
    }

    /// Record that sites were added just now.
    pub fn touch(&mut self) {
        self.header.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::seal;
    use crate::crypto::salt::SaltValue;

    fn record_for(id: &str, key: &PrivateKey) -> SealedSaltRecord {
        let blob = seal(&SaltValue::from_bytes([5u8; SALT_LEN]), &key.public_key(), id).unwrap();
        SealedSaltRecord::new(id, format!("Site {id}"), blob)
    }

    #[test]
    fn add_record_rejects_duplicates() {
        let key = PrivateKey::generate().unwrap();
        let mut file = SaltFile::new("demo");
        file.add_record(record_for("a", &key)).unwrap();
        let original = file.record_for("a").cloned();

        let err = file.add_record(record_for("a", &key)).unwrap_err();
        assert!(matches!(err, SaltSealError::DuplicateSite(ref id) if id == "a"));
        assert_eq!(file.record_for("a").cloned(), original);
    }

    #[test]
    fn records_are_sorted_by_site_id() {
        let key = PrivateKey::generate().unwrap();
        let mut file = SaltFile::new("demo");
        for id in ["zeta", "alpha", "mid"] {
            file.add_record(record_for(id, &key)).unwrap();
        }
        let ids: Vec<&str> = file.records().map(|r| r.site_id()).collect();
        assert_eq!(ids, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn record_for_key_matches_by_fingerprint() {
        let a = PrivateKey::generate().unwrap();
        let b = PrivateKey::generate().unwrap();
        let outsider = PrivateKey::generate().unwrap();
        let mut file = SaltFile::new("demo");
        file.add_record(record_for("a", &a)).unwrap();
        file.add_record(record_for("b", &b)).unwrap();

        assert_eq!(file.record_for_key(&b).map(|r| r.site_id()), Some("b"));
        assert!(file.record_for_key(&outsider).is_none());
    }

    #[test]
    fn bytes_roundtrip_is_identical() {
        let key = PrivateKey::generate().unwrap();
        let mut file = SaltFile::new("demo");
        file.add_record(record_for("a", &key)).unwrap();

        let bytes = file.to_bytes().unwrap();
        let reloaded = SaltFile::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded, file);
        assert_eq!(reloaded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn unsupported_salt_length_is_rejected() {
        let mut file = SaltFile::new("demo");
        file.header.salt_len = 16;
        let bytes = file.to_bytes().unwrap();
        assert!(matches!(
            SaltFile::from_bytes(&bytes),
            Err(SaltSealError::InvalidFileFormat(_))
        ));
    }
}
