//! Salt file module: the persisted set of sealed salts.
//!
//! This module provides:
//! - `SealedSaltRecord` and its self-describing binary codec (`record`)
//! - Binary salt file format with checksum and versioning (`format`)
//! - High-level `SaltFile` for loading, extending, and saving (`store`)

pub mod format;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use format::{SaltFileHeader, CURRENT_VERSION};
pub use record::SealedSaltRecord;
pub use store::SaltFile;
