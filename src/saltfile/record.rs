//! One sealed salt record and its binary encoding.
//!
//! Every record is self-describing, so it can be decoded without any
//! context from the surrounding file:
//!
//! ```text
//! [tag: 0x01][id_len: u16 LE][site id][name_len: u16 LE][site name][blob_len: u32 LE][sealed blob]
//! ```

use crate::crypto::envelope::{SealedBlob, SEALED_LEN};
use crate::errors::{Result, SaltSealError};
use crate::sites::{validate_site_id, MAX_SITE_NAME_LEN};

/// Record format tag for the current layout.
const RECORD_TAG_V1: u8 = 0x01;

/// A site's copy of the project salt, sealed under the site's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSaltRecord {
    site_id: String,
    site_name: String,
    blob: SealedBlob,
}

impl SealedSaltRecord {
    pub fn new(site_id: impl Into<String>, site_name: impl Into<String>, blob: SealedBlob) -> Self {
        Self {
            site_id: site_id.into(),
            site_name: site_name.into(),
            blob,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn blob(&self) -> &SealedBlob {
        &self.blob
    }

    /// Encode this record.
    ///
    /// Fails only if a field is too long for its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let id_len = u16::try_from(self.site_id.len()).map_err(|_| {
            SaltSealError::SerializationError(format!("site id '{}' is too long", self.site_id))
        })?;
        let name_len = u16::try_from(self.site_name.len()).map_err(|_| {
            SaltSealError::SerializationError(format!(
                "name of site '{}' is too long",
                self.site_id
            ))
        })?;
        let blob = self.blob.to_bytes();
        let blob_len = u32::try_from(blob.len())
            .map_err(|_| SaltSealError::SerializationError("sealed blob is too long".into()))?;

        let mut buf = Vec::with_capacity(1 + 2 + self.site_id.len() + 2 + self.site_name.len() + 4 + blob.len());
        buf.push(RECORD_TAG_V1);
        buf.extend_from_slice(&id_len.to_le_bytes());
        buf.extend_from_slice(self.site_id.as_bytes());
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(self.site_name.as_bytes());
        buf.extend_from_slice(&blob_len.to_le_bytes());
        buf.extend_from_slice(&blob);
        Ok(buf)
    }

    /// Decode a record encoded by `encode`.
    ///
    /// Fails with `MalformedRecord` on truncated, oversized, or
    /// unrecognised input.  This is a structural check only: whether the
    /// sealed blob is authentic is decided when it is opened.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_at(bytes, 0)
    }

    /// Decode a record, reporting failures against record `index`.
    pub(crate) fn decode_at(bytes: &[u8], index: usize) -> Result<Self> {
        Self::parse(bytes).map_err(|reason| SaltSealError::MalformedRecord { index, reason })
    }

    fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let mut reader = Reader::new(bytes);

        let tag = reader.u8().ok_or("empty record")?;
        if tag != RECORD_TAG_V1 {
            return Err(format!("unknown record tag {tag:#04x}"));
        }

        let id_len = usize::from(reader.u16().ok_or("truncated site id length")?);
        let site_id = reader.utf8(id_len).ok_or("truncated or non-UTF-8 site id")?;
        validate_site_id(site_id).map_err(|e| e.to_string())?;

        let name_len = usize::from(reader.u16().ok_or("truncated site name length")?);
        if name_len > MAX_SITE_NAME_LEN {
            return Err(format!("site name length {name_len} exceeds {MAX_SITE_NAME_LEN}"));
        }
        let site_name = reader.utf8(name_len).ok_or("truncated or non-UTF-8 site name")?;

        let blob_len = reader.u32().ok_or("truncated blob length")?;
        let blob_len = usize::try_from(blob_len).map_err(|_| "blob length overflows".to_string())?;
        if blob_len != SEALED_LEN {
            return Err(format!(
                "sealed blob is {blob_len} bytes, expected {SEALED_LEN}"
            ));
        }
        let blob_bytes = reader.take(blob_len).ok_or("truncated sealed blob")?;
        let blob = SealedBlob::from_bytes(blob_bytes).ok_or("unreadable sealed blob")?;

        if !reader.is_empty() {
            return Err(format!("{} trailing bytes", reader.remaining()));
        }

        Ok(Self {
            site_id: site_id.to_string(),
            site_name: site_name.to_string(),
            blob,
        })
    }
}

/// Minimal little-endian cursor over a byte slice.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn u16(&mut self) -> Option<u16> {
        self.take(2)?.try_into().ok().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Option<u32> {
        self.take(4)?.try_into().ok().map(u32::from_le_bytes)
    }

    fn utf8(&mut self, n: usize) -> Option<&'a str> {
        std::str::from_utf8(self.take(n)?).ok()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::seal;
    use crate::crypto::keys::PrivateKey;
    use crate::crypto::salt::SaltValue;
    use proptest::prelude::*;

    fn record(id: &str, name: &str) -> SealedSaltRecord {
        let key = PrivateKey::from_bytes([9u8; 32]);
        let blob = seal(&SaltValue::from_bytes([3u8; 32]), &key.public_key(), id).unwrap();
        SealedSaltRecord::new(id, name, blob)
    }

    #[test]
    fn encode_decode_roundtrip() {
        let r = record("hospital-a", "Hôpital Saint-Éloi, Main Campus");
        let bytes = r.encode().unwrap();
        assert_eq!(SealedSaltRecord::decode(&bytes).unwrap(), r);
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(
            SealedSaltRecord::decode(&[]),
            Err(SaltSealError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let mut bytes = record("a", "A").encode().unwrap();
        bytes[0] = 0x7F;
        match SealedSaltRecord::decode(&bytes) {
            Err(SaltSealError::MalformedRecord { reason, .. }) => {
                assert!(reason.contains("unknown record tag"))
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut bytes = record("a", "A").encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            SealedSaltRecord::decode(&bytes),
            Err(SaltSealError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn invalid_site_id_is_malformed() {
        let r = SealedSaltRecord::new("bad id", "x", record("a", "A").blob.clone());
        let bytes = r.encode().unwrap();
        assert!(matches!(
            SealedSaltRecord::decode(&bytes),
            Err(SaltSealError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn decode_at_reports_index() {
        match SealedSaltRecord::decode_at(&[RECORD_TAG_V1], 7) {
            Err(SaltSealError::MalformedRecord { index, .. }) => assert_eq!(index, 7),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn roundtrip_for_any_valid_record(
            id in "[A-Za-z0-9_.-]{1,64}",
            name in "\\PC{0,80}",
        ) {
            let r = record(&id, &name);
            let bytes = r.encode().unwrap();
            prop_assert_eq!(SealedSaltRecord::decode(&bytes).unwrap(), r);
        }

        #[test]
        fn every_truncation_is_malformed(cut in 0usize..200) {
            let bytes = record("site-x", "Site X").encode().unwrap();
            let cut = cut % bytes.len();
            let result = SealedSaltRecord::decode(&bytes[..cut]);
            let is_malformed = matches!(result, Err(SaltSealError::MalformedRecord { .. }));
            prop_assert!(is_malformed);
        }
    }
}
