//! Post-import status propagation
//!
//! Three sub-stages run after a successful import: push the repository
//! URL into the catalog's electronic-location field, flag the bag
//! ingested in the tracking store, and queue notifications for the
//! requesters. Each sub-stage tolerates per-item failure independently;
//! a catalog outage never blocks the tracking update, and vice versa.

use chrono::Utc;
use etdq_common::{EventBus, PipelineEvent};

use crate::models::{Bag, ImportResult};
use crate::services::catalog::Catalog;
use crate::stores::{RequestQueue, TrackingStore};

/// Status propagator for one ingestion run
pub struct StatusPropagator<'a> {
    catalog: &'a dyn Catalog,
    tracking: &'a dyn TrackingStore,
    requests: &'a dyn RequestQueue,
    events: &'a EventBus,
    /// Source prefix for tracking-document bag keys
    source: &'a str,
}

impl<'a> StatusPropagator<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        tracking: &'a dyn TrackingStore,
        requests: &'a dyn RequestQueue,
        events: &'a EventBus,
        source: &'a str,
    ) -> Self {
        Self {
            catalog,
            tracking,
            requests,
            events,
            source,
        }
    }

    /// Run all three sub-stages for every imported bag
    ///
    /// Failures are logged and skipped; the import itself already
    /// happened and must not be reported as failed because a follow-up
    /// write did not land. Each sub-stage is idempotent and can be rerun.
    pub async fn propagate(&self, bags: &[Bag], imported: &ImportResult) {
        self.update_catalog_urls(bags, imported).await;
        self.record_ingest_status(imported).await;
        self.notify_requesters(bags, imported).await;
    }

    /// Write each bag's repository URL into its catalog record
    pub async fn update_catalog_urls(&self, bags: &[Bag], imported: &ImportResult) {
        for bag in bags {
            let Some(url) = imported.handles.get(&bag.name) else {
                continue;
            };
            match self.catalog.update_electronic_location(&bag.mmsid, url).await {
                Ok(update) => {
                    self.events.emit_lossy(PipelineEvent::CatalogUrlUpdated {
                        mmsid: update.mmsid,
                        old_url: update.old_url,
                        new_url: update.new_url,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        mmsid = %bag.mmsid,
                        error = %e,
                        "Catalog URL update did not land; rerun update-url later"
                    );
                }
            }
        }
    }

    /// Flag each imported bag ingested in the tracking store
    pub async fn record_ingest_status(&self, imported: &ImportResult) {
        for (bag, url) in &imported.handles {
            let keyed = format!("{}/{}", self.source, bag);
            match self.tracking.update_ingest_status(&keyed, url, true).await {
                Ok(()) => {
                    self.events.emit_lossy(PipelineEvent::StatusRecorded {
                        bag: keyed,
                        url: url.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(bag = %keyed, error = %e, "Tracking status update did not land");
                }
            }
        }
    }

    /// Queue a notification for every outstanding request on an imported
    /// record
    pub async fn notify_requesters(&self, bags: &[Bag], imported: &ImportResult) {
        for bag in bags {
            let Some(url) = imported.handles.get(&bag.name) else {
                continue;
            };
            let requests = match self.requests.requests_for(&bag.mmsid).await {
                Ok(requests) => requests,
                Err(e) => {
                    tracing::warn!(mmsid = %bag.mmsid, error = %e, "Could not list requests");
                    continue;
                }
            };
            for request in requests {
                if request.email.is_empty() {
                    continue;
                }
                let title = if request.title.is_empty() {
                    bag.name.clone()
                } else {
                    request.title.clone()
                };
                self.events.emit_lossy(PipelineEvent::NotificationQueued {
                    recipient: request.email,
                    subject: format!("Requested item available: {}", title),
                    body: format!(
                        "The item you requested, \"{}\", is now available at {}",
                        title, url
                    ),
                    timestamp: Utc::now(),
                });
            }
        }
    }
}
