//! Pipeline orchestration
//!
//! Drives one ingestion run end to end: candidate discovery, per-bag
//! preparation (fetch, gate, transform, classify, collect, assemble),
//! per-collection import, and post-import propagation. Per-bag failures
//! are isolated into the outcome's failure map; only configuration
//! defects abort the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use etdq_common::{EventBus, PipelineEvent, Settings};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{IngestError, IngestResult};
use crate::models::{Bag, BagFailure, DepositUnit, IngestionOutcome, UrlUpdate};
use crate::services::assemble::PackageAssembler;
use crate::services::catalog::Catalog;
use crate::services::files::{self, ObjectStore};
use crate::services::import::ImportExecutor;
use crate::services::propagate::StatusPropagator;
use crate::services::{classify, completeness, mmsid, transform};
use crate::stores::{RequestQueue, TrackingStore};

/// Failure reason surfaced to operators when the completeness gate fails;
/// routing depends on this exact wording
pub const MISSING_METADATA_REASON: &str =
    "Missing required metadata in Alma - contact cataloging group";

/// One bag ready for import
struct Prepared {
    bag: Bag,
    collection: String,
    unit: DepositUnit,
}

/// Orchestrator over the full ingestion pipeline
pub struct PipelineOrchestrator {
    settings: Settings,
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    tracking: Arc<dyn TrackingStore>,
    requests: Arc<dyn RequestQueue>,
    events: EventBus,
}

impl PipelineOrchestrator {
    pub fn new(
        settings: Settings,
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        tracking: Arc<dyn TrackingStore>,
        requests: Arc<dyn RequestQueue>,
        events: EventBus,
    ) -> Self {
        Self {
            settings,
            catalog,
            store,
            tracking,
            requests,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run one ingestion pass
    ///
    /// With an explicit bag, only that bag is processed; otherwise every
    /// requested bag that is digitized but not yet ingested is a
    /// candidate. An explicit collection bypasses the classifier.
    pub async fn ingest(
        &self,
        bag: Option<String>,
        collection: Option<String>,
    ) -> IngestResult<IngestionOutcome> {
        let candidates = match bag {
            Some(bag) => vec![bag],
            None => self.discover_candidates().await?,
        };
        tracing::info!(candidates = candidates.len(), "Starting ingestion run");

        let mut outcome = IngestionOutcome::default();
        let mut groups: BTreeMap<String, Vec<Prepared>> = BTreeMap::new();

        let mut preparing: FuturesUnordered<_> = candidates
            .iter()
            .map(|name| self.prepare_bag(name, collection.as_deref()))
            .collect();
        while let Some(result) = preparing.next().await {
            match result? {
                Ok(prepared) => {
                    groups
                        .entry(prepared.collection.clone())
                        .or_default()
                        .push(prepared);
                }
                Err(failure) => self.record_failure(&mut outcome, failure),
            }
        }

        for (collection, group) in groups {
            self.import_group(&collection, group, &mut outcome).await;
        }

        tracing::info!(
            kicked_off = outcome.kicked_off.len(),
            failed = outcome.failed.len(),
            "Ingestion run complete"
        );
        Ok(outcome)
    }

    /// Report missing required fields for a set of record identifiers
    pub async fn check(
        &self,
        mmsids: &[String],
    ) -> IngestResult<BTreeMap<String, Vec<String>>> {
        let mut report = BTreeMap::new();
        for mmsid in mmsids {
            let fetched = self.catalog.fetch(mmsid).await;
            report.insert(mmsid.clone(), completeness::check_fetched(&fetched));
        }
        Ok(report)
    }

    /// Check every requested record and queue one notification per record
    /// with incomplete metadata
    ///
    /// Returns the missing-field report for the affected records only.
    pub async fn notify_missing(&self) -> IngestResult<BTreeMap<String, Vec<String>>> {
        let mmsids = self.requests.requested_mmsids().await?;
        let report = self.check(&mmsids).await?;
        let affected: BTreeMap<String, Vec<String>> = report
            .into_iter()
            .filter(|(_, missing)| !missing.is_empty())
            .collect();

        for (mmsid, missing) in &affected {
            self.events.emit_lossy(PipelineEvent::NotificationQueued {
                recipient: self.settings.repository.eperson.clone(),
                subject: format!("Incomplete catalog record: {}", mmsid),
                body: format!(
                    "Record {} cannot be ingested until these fields are \
                     populated:\n{}",
                    mmsid,
                    missing.join("\n")
                ),
                timestamp: Utc::now(),
            });
        }
        tracing::info!(affected = affected.len(), "Queued missing-field notifications");
        Ok(affected)
    }

    /// Point a catalog record's electronic location at a repository URL
    pub async fn update_url(&self, mmsid: &str, url: &str) -> IngestResult<UrlUpdate> {
        let update = self.catalog.update_electronic_location(mmsid, url).await?;
        self.events.emit_lossy(PipelineEvent::CatalogUrlUpdated {
            mmsid: update.mmsid.clone(),
            old_url: update.old_url.clone(),
            new_url: update.new_url.clone(),
            timestamp: Utc::now(),
        });
        Ok(update)
    }

    /// Requested records whose bags are digitized but not yet ingested
    async fn discover_candidates(&self) -> IngestResult<Vec<String>> {
        let requested = self.requests.requested_mmsids().await?;
        Ok(self.tracking.digitized_not_ingested(&requested).await?)
    }

    /// Take one bag from name to deposit unit
    ///
    /// The outer `Result` carries run-fatal errors (configuration); the
    /// inner one isolates this bag.
    async fn prepare_bag(
        &self,
        name: &str,
        collection_override: Option<&str>,
    ) -> IngestResult<Result<Prepared, BagFailure>> {
        let Some(mmsid) = mmsid::resolve(name) else {
            return Ok(Err(BagFailure::new(
                name,
                "Could not determine MMS ID from bag name",
            )));
        };

        let fetched = self.catalog.fetch(&mmsid).await;
        let missing = completeness::check_fetched(&fetched);
        if !missing.is_empty() {
            tracing::warn!(bag = %name, mmsid = %mmsid, missing = ?missing, "Completeness gate failed");
            return Ok(Err(BagFailure::new(name, MISSING_METADATA_REASON)));
        }
        // check_fetched reports a fetch error as a missing item, so an
        // empty report implies the fetch succeeded
        let bib = fetched.map_err(IngestError::Catalog)?;

        self.events.emit_lossy(PipelineEvent::BagValidated {
            bag: name.to_string(),
            mmsid: mmsid.clone(),
            timestamp: Utc::now(),
        });

        let output = match transform::transform(&bib) {
            Ok(output) => output,
            Err(e) => return Ok(Err(BagFailure::new(name, e.to_string()))),
        };

        let collection = match collection_override {
            Some(collection) => collection.to_string(),
            None => classify::classify(&bib, &self.settings.classifier)?,
        };

        let keys = match files::list_bag_files(self.store.as_ref(), &self.settings.storage, name)
            .await
        {
            Ok(keys) => keys,
            Err(e) => return Ok(Err(BagFailure::new(name, e.to_string()))),
        };
        if keys.is_empty() {
            return Ok(Err(BagFailure::new(name, "No content files found for bag")));
        }

        let unit = match PackageAssembler::new(self.store.as_ref())
            .assemble(name, output, keys)
            .await
        {
            Ok(unit) => unit,
            Err(failure) => return Ok(Err(failure)),
        };

        self.events.emit_lossy(PipelineEvent::BagAssembled {
            bag: name.to_string(),
            content_files: unit.content_file_names().iter().map(|s| s.to_string()).collect(),
            collection: collection.clone(),
            timestamp: Utc::now(),
        });

        Ok(Ok(Prepared {
            bag: Bag {
                name: name.to_string(),
                mmsid,
            },
            collection,
            unit,
        }))
    }

    /// Import one collection group and propagate on success
    ///
    /// An import failure fails every bag in this group but never aborts
    /// the remaining groups.
    async fn import_group(
        &self,
        collection: &str,
        group: Vec<Prepared>,
        outcome: &mut IngestionOutcome,
    ) {
        let bags: Vec<Bag> = group.iter().map(|p| p.bag.clone()).collect();
        let units: Vec<DepositUnit> = group.into_iter().map(|p| p.unit).collect();

        let executor = ImportExecutor::new(&self.settings.repository, self.store.as_ref());
        let imported = match executor.run(collection, &units).await {
            Ok(imported) => imported,
            Err(e) => {
                tracing::error!(collection = %collection, error = %e, "Collection batch failed");
                for bag in bags {
                    self.record_failure(
                        outcome,
                        BagFailure::new(bag.name, format!("Import failed: {}", e)),
                    );
                }
                return;
            }
        };

        for bag in &bags {
            match imported.handles.get(&bag.name) {
                Some(_) => outcome.record_success(bag.name.clone()),
                None => self.record_failure(
                    outcome,
                    BagFailure::new(
                        bag.name.clone(),
                        "Import completed but assigned no handle",
                    ),
                ),
            }
        }

        self.events.emit_lossy(PipelineEvent::BatchImported {
            collection: collection.to_string(),
            handles: imported
                .handles
                .iter()
                .map(|(bag, url)| (bag.clone(), url.clone()))
                .collect(),
            timestamp: Utc::now(),
        });

        StatusPropagator::new(
            self.catalog.as_ref(),
            self.tracking.as_ref(),
            self.requests.as_ref(),
            &self.events,
            &self.settings.storage.source,
        )
        .propagate(&bags, &imported)
        .await;
    }

    fn record_failure(&self, outcome: &mut IngestionOutcome, failure: BagFailure) {
        self.events.emit_lossy(PipelineEvent::BagFailed {
            bag: failure.bag.clone(),
            reason: failure.reason.clone(),
            timestamp: Utc::now(),
        });
        outcome.record_failure(failure.bag, failure.reason);
    }
}
