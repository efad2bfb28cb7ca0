//! Pipeline stage implementations

pub mod assemble;
pub mod catalog;
pub mod classify;
pub mod completeness;
pub mod files;
pub mod import;
pub mod mmsid;
pub mod orchestrate;
pub mod propagate;
pub mod transform;
