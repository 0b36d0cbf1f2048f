//! Configuration loaded from `.saltseal.toml`.

pub mod settings;

pub use settings::Settings;
