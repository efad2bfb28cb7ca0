//! # ETDQ Common Library
//!
//! Shared code for the ETDQ ingestion services including:
//! - Error types
//! - Typed pipeline events (PipelineEvent enum + EventBus)
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use config::Settings;
pub use error::{Error, Result};
pub use events::{EventBus, PipelineEvent};
