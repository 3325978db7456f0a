/// Database configuration and connection management
pub mod database;

/// Application settings loading from pex.toml
pub mod settings;
