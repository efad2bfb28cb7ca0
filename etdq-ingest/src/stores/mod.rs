//! Tracking store and digitization request queue
//!
//! Both sit behind the same document API. The tracking store records
//! per-bag ingest status under an `application.<name>` sub-document; the
//! request queue lists outstanding digitization requests.

mod requests;
mod tracking;

pub use requests::{HttpRequestQueue, RequestQueue};
pub use tracking::{HttpTrackingStore, TrackingStore};
