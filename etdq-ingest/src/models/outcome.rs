//! Pipeline domain types: bags, deposit units, import results, outcomes

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DublinCore;

/// A named unit of digitized content awaiting deposit
///
/// Created externally by the digitization process; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bag {
    /// Bag name, e.g. `Smith_2019_9876543210987`
    pub name: String,
    /// Bibliographic record identifier resolved from the name
    pub mmsid: String,
}

/// One importable item: content files plus metadata documents
///
/// Consumed (and its staging materialization deleted) by the import
/// executor; never persisted beyond the ingestion run.
#[derive(Debug, Clone)]
pub struct DepositUnit {
    /// Source bag name
    pub bag: String,
    /// Object-storage keys of the retained content files, in listing order
    pub content_files: Vec<String>,
    /// Descriptive metadata document
    pub metadata: DublinCore,
    /// Auxiliary metadata documents by stream name
    /// (e.g. `"ou"` is written as `metadata_ou.xml`)
    pub auxiliary: BTreeMap<String, DublinCore>,
}

impl DepositUnit {
    /// File names (final key segments) of the content files
    pub fn content_file_names(&self) -> Vec<&str> {
        self.content_files
            .iter()
            .map(|k| k.rsplit('/').next().unwrap_or(k.as_str()))
            .collect()
    }
}

/// Maps staged item positions back to repository-assigned handles
///
/// Immutable once created; derived solely from the accession map the
/// import mechanism wrote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    /// Bag name to repository URL (`<fqdn>/<handle>`)
    pub handles: BTreeMap<String, String>,
}

/// Per-run aggregate: every candidate bag lands in exactly one of the
/// two sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    /// Bags whose ingest was kicked off
    #[serde(rename = "Kicked off ingest")]
    pub kicked_off: Vec<String>,
    /// Bag name to human-readable failure reason
    pub failed: BTreeMap<String, String>,
}

impl IngestionOutcome {
    pub fn record_success(&mut self, bag: impl Into<String>) {
        self.kicked_off.push(bag.into());
    }

    pub fn record_failure(&mut self, bag: impl Into<String>, reason: impl Into<String>) {
        self.failed.insert(bag.into(), reason.into());
    }
}

/// A per-item failure: isolates one bag without aborting the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagFailure {
    pub bag: String,
    pub reason: String,
}

impl BagFailure {
    pub fn new(bag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            bag: bag.into(),
            reason: reason.into(),
        }
    }
}

/// Old/new values recorded by a catalog electronic-location update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlUpdate {
    pub mmsid: String,
    pub old_url: Option<String>,
    pub new_url: String,
}

/// An outstanding digitization request from the request queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitizationRequest {
    #[serde(default)]
    pub mmsid: String,
    /// Requester name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub year: String,
}

/// Ingest-status sub-document written under `application.<name>` in a
/// bag's tracking document
///
/// Mutated in place by the status propagator; never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStatusRecord {
    pub ingested: bool,
    pub url: String,
    pub datetime: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_original_keys() {
        let mut outcome = IngestionOutcome::default();
        outcome.record_success("Smith_2019_9876543210987");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json["Kicked off ingest"],
            serde_json::json!(["Smith_2019_9876543210987"])
        );
        assert_eq!(json["failed"], serde_json::json!({}));
    }

    #[test]
    fn content_file_names_strip_key_prefixes() {
        let unit = DepositUnit {
            bag: "b".into(),
            content_files: vec![
                "private/shareok/b/data/paper.pdf".into(),
                "notes.txt".into(),
            ],
            metadata: DublinCore::new(),
            auxiliary: BTreeMap::new(),
        };
        assert_eq!(unit.content_file_names(), vec!["paper.pdf", "notes.txt"]);
    }
}
