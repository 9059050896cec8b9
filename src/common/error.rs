//! Error types for minicoord
//!
//! The reconciliation engine itself never fails a cycle: placement misses and
//! delivery failures are logged and retried naturally on the next run. Errors
//! surface only at the edges, from configuration and rule (de)serialization.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    // === Serialization Errors ===
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
