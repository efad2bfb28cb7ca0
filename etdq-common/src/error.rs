//! Common error types for ETDQ

use thiserror::Error;

/// Common result type for ETDQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ETDQ crates
///
/// The ingest crate carries its own pipeline taxonomy; only the shared
/// configuration layer reports through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
