//! Participating sites and the site-list file.
//!
//! A site list is a plain text file with one site per line:
//!
//! ```text
//! # site_id,site_name,public_key
//! hospital-a,Hospital A,keys/hospital-a.pub
//! clinic-b,Clinic B,/etc/keys/clinic-b.pub
//! ```
//!
//! Blank lines and `#` comments are skipped.  Relative key paths are
//! resolved against the directory holding the site list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::crypto::keys::{load_public_key, PublicKey};
use crate::errors::{Result, SaltSealError};

/// Longest allowed site identifier, in bytes.
pub const MAX_SITE_ID_LEN: usize = 128;

/// Longest allowed display name, in bytes.
pub const MAX_SITE_NAME_LEN: usize = 1024;

/// A participating site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    id: String,
    name: String,
    public_key: PublicKey,
}

impl Site {
    /// Build a site, validating its identifier and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>, public_key: PublicKey) -> Result<Self> {
        let id = id.into();
        let name = name.into();
        validate_site_id(&id)?;
        if name.len() > MAX_SITE_NAME_LEN {
            return Err(SaltSealError::InvalidSiteList(format!(
                "name of site '{id}' exceeds {MAX_SITE_NAME_LEN} bytes"
            )));
        }
        Ok(Self {
            id,
            name,
            public_key,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// Validate that a site identifier is safe to store and display.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most `MAX_SITE_ID_LEN` bytes.
pub fn validate_site_id(id: &str) -> Result<()> {
    if id.is_empty()
        || id.len() > MAX_SITE_ID_LEN
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(SaltSealError::InvalidSiteId(id.to_string()));
    }
    Ok(())
}

/// Check that a site list is non-empty and has unique identifiers.
pub fn validate_site_list(sites: &[Site]) -> Result<()> {
    if sites.is_empty() {
        return Err(SaltSealError::EmptySiteList);
    }

    let mut seen = HashSet::with_capacity(sites.len());
    for site in sites {
        if !seen.insert(site.id()) {
            return Err(SaltSealError::DuplicateSite(site.id().to_string()));
        }
    }
    Ok(())
}

/// Parse a single site-list line into `(id, name, key_path)`.
///
/// Returns `None` for blank lines and comments.
pub fn parse_site_line(line: &str) -> Option<std::result::Result<(&str, &str, &str), String>> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = trimmed.splitn(3, ',').map(str::trim);
    let parsed = match (fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(name), Some(key)) if !id.is_empty() && !key.is_empty() => {
            Ok((id, name, key))
        }
        _ => Err(format!(
            "expected `site_id,site_name,public_key`, got `{trimmed}`"
        )),
    };
    Some(parsed)
}

/// Read a site-list file, loading every site's public key.
///
/// The returned list is in file order and has already passed
/// `validate_site_list`.
pub fn parse_site_list(path: &Path) -> Result<Vec<Site>> {
    let content = fs::read_to_string(path).map_err(|e| {
        SaltSealError::InvalidSiteList(format!("failed to read {}: {e}", path.display()))
    })?;
    let base_dir = path.parent().unwrap_or(Path::new("."));

    let mut sites = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let (id, name, key) = match parse_site_line(line) {
            None => continue,
            Some(Ok(fields)) => fields,
            Some(Err(reason)) => {
                return Err(SaltSealError::InvalidSiteList(format!(
                    "line {line_no}: {reason}"
                )))
            }
        };

        // Optional header row.
        if sites.is_empty() && id.eq_ignore_ascii_case("site_id") {
            continue;
        }

        let public_key = load_public_key(&base_dir.join(key)).map_err(|e| {
            SaltSealError::InvalidSiteList(format!("line {line_no}: site '{id}': {e}"))
        })?;
        let site = Site::new(id, name, public_key).map_err(|e| {
            SaltSealError::InvalidSiteList(format!("line {line_no}: {e}"))
        })?;
        sites.push(site);
    }

    validate_site_list(&sites)?;
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey;
    use tempfile::TempDir;

    fn public_key(seed: u8) -> PublicKey {
        PrivateKey::from_bytes([seed; 32]).public_key()
    }

    fn write_key(dir: &Path, file: &str, seed: u8) {
        fs::write(dir.join(file), public_key(seed).to_base64()).unwrap();
    }

    #[test]
    fn parse_line_variants() {
        assert_eq!(parse_site_line(""), None);
        assert_eq!(parse_site_line("   # comment"), None);
        assert_eq!(
            parse_site_line(" a , Site A , a.pub "),
            Some(Ok(("a", "Site A", "a.pub")))
        );
        // Commas after the second separator stay in the key path.
        assert_eq!(
            parse_site_line("a,Site A,dir,with,commas.pub"),
            Some(Ok(("a", "Site A", "dir,with,commas.pub")))
        );
        assert!(matches!(parse_site_line("a,Site A"), Some(Err(_))));
        assert!(matches!(parse_site_line(",Site A,a.pub"), Some(Err(_))));
    }

    #[test]
    fn site_ids_are_validated() {
        assert!(validate_site_id("hospital-a").is_ok());
        assert!(validate_site_id("site_01.east").is_ok());
        assert!(validate_site_id("").is_err());
        assert!(validate_site_id("has space").is_err());
        assert!(validate_site_id("slash/id").is_err());
        assert!(validate_site_id(&"x".repeat(MAX_SITE_ID_LEN + 1)).is_err());
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            validate_site_list(&[]),
            Err(SaltSealError::EmptySiteList)
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let sites = vec![
            Site::new("a", "A", public_key(1)).unwrap(),
            Site::new("b", "B", public_key(2)).unwrap(),
            Site::new("a", "A again", public_key(3)).unwrap(),
        ];
        match validate_site_list(&sites) {
            Err(SaltSealError::DuplicateSite(id)) => assert_eq!(id, "a"),
            other => panic!("expected DuplicateSite, got {other:?}"),
        }
    }

    #[test]
    fn parse_file_resolves_relative_key_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("keys")).unwrap();
        write_key(&dir.path().join("keys"), "a.pub", 1);
        write_key(dir.path(), "b.pub", 2);

        let list = dir.path().join("sites.csv");
        fs::write(
            &list,
            "site_id,site_name,public_key\n# participants\na,Site A,keys/a.pub\n\nb,Site B,b.pub\n",
        )
        .unwrap();

        let sites = parse_site_list(&list).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id(), "a");
        assert_eq!(sites[0].name(), "Site A");
        assert_eq!(sites[0].public_key(), &public_key(1));
        assert_eq!(sites[1].id(), "b");
    }

    #[test]
    fn parse_file_reports_line_of_bad_key() {
        let dir = TempDir::new().unwrap();
        write_key(dir.path(), "a.pub", 1);
        let list = dir.path().join("sites.csv");
        fs::write(&list, "a,Site A,a.pub\nb,Site B,missing.pub\n").unwrap();

        match parse_site_list(&list) {
            Err(SaltSealError::InvalidSiteList(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected InvalidSiteList, got {other:?}"),
        }
    }

    #[test]
    fn parse_file_with_only_comments_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("sites.csv");
        fs::write(&list, "# nothing here\n\n").unwrap();
        assert!(matches!(
            parse_site_list(&list),
            Err(SaltSealError::EmptySiteList)
        ));
    }
}
