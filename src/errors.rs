use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in SaltSeal.
#[derive(Debug, Error)]
pub enum SaltSealError {
    // --- Input validation errors ---
    #[error("Site list is empty — at least one site is required")]
    EmptySiteList,

    #[error("Site '{0}' appears more than once")]
    DuplicateSite(String),

    #[error("Invalid site list: {0}")]
    InvalidSiteList(String),

    #[error("Invalid site identifier '{0}' — only ASCII letters, digits, underscores, hyphens, and periods are allowed")]
    InvalidSiteId(String),

    #[error("Invalid project name '{0}' — only ASCII letters, digits, underscores, and hyphens are allowed")]
    InvalidProjectName(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("No new sites to add — every listed site already has a sealed salt")]
    NoNewSites,

    // --- Crypto errors ---
    #[error("Integrity check failed for sealed salt — data is corrupted or was tampered with")]
    Integrity,

    #[error("Private key does not match any recipient in this salt file")]
    KeyMismatch,

    #[error("Secure random source unavailable: {0}")]
    EntropySource(String),

    #[error("Sealing failed: {0}")]
    SealFailed(String),

    // --- Key file errors ---
    #[error("Key file error: {0}")]
    KeyFile(String),

    // --- Salt file errors ---
    #[error("Salt file not found at {0}")]
    SaltFileNotFound(PathBuf),

    #[error("Salt file already exists at {0}")]
    SaltFileExists(PathBuf),

    #[error("Invalid salt file format: {0}")]
    InvalidFileFormat(String),

    #[error("Salt file version {found} is newer than this tool supports (max {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("Malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Salt file checksum mismatch — file is corrupted")]
    ChecksumMismatch,

    #[error("Salt file has no records — cannot recover the project salt")]
    EmptyProject,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Broad category of a [`SaltSealError`].
///
/// Lets callers tell input mistakes apart from cryptographic failures
/// and file problems without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    Crypto,
    Format,
    Io,
    Config,
}

impl SaltSealError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptySiteList
            | Self::DuplicateSite(_)
            | Self::InvalidSiteList(_)
            | Self::InvalidSiteId(_)
            | Self::InvalidProjectName(_)
            | Self::MissingParameter(_)
            | Self::NoNewSites => ErrorKind::InputValidation,

            Self::Integrity
            | Self::KeyMismatch
            | Self::EntropySource(_)
            | Self::SealFailed(_)
            | Self::KeyFile(_) => ErrorKind::Crypto,

            Self::InvalidFileFormat(_)
            | Self::UnsupportedVersion { .. }
            | Self::MalformedRecord { .. }
            | Self::ChecksumMismatch
            | Self::EmptyProject
            | Self::SerializationError(_) => ErrorKind::Format,

            Self::SaltFileNotFound(_) | Self::SaltFileExists(_) | Self::Io(_) => ErrorKind::Io,

            Self::ConfigError(_) => ErrorKind::Config,
        }
    }
}

/// Convenience type alias for SaltSeal results.
pub type Result<T> = std::result::Result<T, SaltSealError>;
