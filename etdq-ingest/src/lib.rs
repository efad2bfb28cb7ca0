//! etdq-ingest - Electronic thesis and dissertation ingestion pipeline
//!
//! Takes digitized, bagged theses and dissertations from object storage
//! through metadata validation and transformation into a bulk repository
//! import, then propagates the assigned URLs back to the catalog, the
//! tracking store, and the requesters.

pub mod error;
pub mod models;
pub mod services;
pub mod stores;

pub use error::{CatalogError, IngestError, IngestResult, StoreError};
pub use services::orchestrate::{PipelineOrchestrator, MISSING_METADATA_REASON};
