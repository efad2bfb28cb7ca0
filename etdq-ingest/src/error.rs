//! Error taxonomy for the ingestion pipeline
//!
//! Four failure classes with different blast radii:
//! - transient upstream ([`CatalogError::Unavailable`], [`StoreError`]):
//!   typed values, the batch continues for other bags
//! - data quality ([`crate::models::BagFailure`]): per-item, lands in the
//!   failure map, never aborts the run
//! - configuration ([`IngestError::Config`]): fatal, deployment defect
//! - import mechanism ([`IngestError::ImportFailed`]): fatal for one
//!   collection-group's batch

use thiserror::Error;

/// Bibliographic catalog access errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure; retry is caller policy
    #[error("Alma Connection Error - try again later.")]
    Unavailable,

    /// No record exists for the identifier
    #[error("Could not find record!")]
    NotFound,

    /// Catalog answered with a non-success status
    #[error("Alma server returned code: {0}")]
    Status(u16),

    /// Response body was not a parseable bibliographic record
    #[error("Could not parse bibliographic record: {0}")]
    Parse(String),
}

/// Tracking store / request queue access errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store answered with a non-success status
    #[error("Store returned code {0}: {1}")]
    Status(u16, String),

    /// Response body did not match the expected document shape
    #[error("Unexpected store response: {0}")]
    Parse(String),

    /// No document matched the lookup
    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Errors that end a pipeline operation (as opposed to isolating one bag)
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Deployment defect, e.g. an unknown organization/type combination
    /// in the collection routing table
    #[error("Configuration error: {0}")]
    Config(String),

    /// The repository bulk-import subprocess failed; partial import state
    /// cannot be assumed, so the whole collection batch is failed
    #[error("Import mechanism failed: {0}")]
    ImportFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;
