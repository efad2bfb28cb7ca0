//! Repository import execution
//!
//! One invocation stages a working area, populates it with deposit
//! units, invokes the import mechanism, and parses its results, with an
//! unconditional cleanup: the working area is a scoped temp directory
//! removed on every exit path. The accession map the import mechanism
//! writes is the sole source of truth for what was actually imported.

use std::collections::BTreeMap;
use std::path::Path;

use etdq_common::config::RepositorySettings;
use tokio::process::Command;

use crate::error::IngestError;
use crate::models::{DepositUnit, ImportResult};
use crate::services::files::ObjectStore;

/// Reserved filename for the accession map
const MAPFILE_NAME: &str = "mapfile";

/// Import executor over the configured repository import mechanism
pub struct ImportExecutor<'a> {
    settings: &'a RepositorySettings,
    store: &'a dyn ObjectStore,
}

impl<'a> ImportExecutor<'a> {
    pub fn new(settings: &'a RepositorySettings, store: &'a dyn ObjectStore) -> Self {
        Self { settings, store }
    }

    /// Materialize the deposit units, run the bulk import, and correlate
    /// the accession map back to bag names
    ///
    /// A failed invocation is fatal for this whole batch and is not
    /// retried here: partial import state cannot be safely assumed, so
    /// retry policy belongs to the caller at batch-selection level.
    pub async fn run(
        &self,
        collection: &str,
        units: &[DepositUnit],
    ) -> Result<ImportResult, IngestError> {
        // Exclusively owned working area; Drop is the cleanup safety net
        // if anything below returns early
        let workdir = tempfile::TempDir::new()?;
        tracing::info!(
            collection = %collection,
            items = units.len(),
            workdir = %workdir.path().display(),
            "Staging import batch"
        );

        let outcome = self.run_in(workdir.path(), collection, units).await;

        // Cleanup runs on success and failure alike
        if let Err(e) = workdir.close() {
            tracing::warn!(error = %e, "Working area removal reported an error");
        }
        outcome
    }

    async fn run_in(
        &self,
        dir: &Path,
        collection: &str,
        units: &[DepositUnit],
    ) -> Result<ImportResult, IngestError> {
        let index = self.populate(dir, units).await?;

        if let Some(owner) = &self.settings.staging_owner {
            self.apply_ownership(dir, owner).await?;
        }

        self.invoke(dir, collection).await?;
        self.parse_results(dir, &index)
    }

    /// Write one `item_<n>/` per unit with content files, metadata
    /// documents, and a `contents` listing of the retained filenames
    async fn populate(
        &self,
        dir: &Path,
        units: &[DepositUnit],
    ) -> Result<Vec<String>, IngestError> {
        let mut index = Vec::with_capacity(units.len());

        for (n, unit) in units.iter().enumerate() {
            let item_dir = dir.join(format!("item_{}", n));
            std::fs::create_dir_all(&item_dir)?;

            for key in &unit.content_files {
                let name = key.rsplit('/').next().unwrap_or(key.as_str());
                let bytes = self.store.download(key).await?;
                std::fs::write(item_dir.join(name), bytes)?;
            }

            std::fs::write(
                item_dir.join("dublin_core.xml"),
                unit.metadata.to_xml()?,
            )?;
            for (stream, doc) in &unit.auxiliary {
                std::fs::write(
                    item_dir.join(format!("metadata_{}.xml", stream)),
                    doc.to_xml()?,
                )?;
            }

            let mut listing = unit.content_file_names().join("\n");
            listing.push('\n');
            std::fs::write(item_dir.join("contents"), listing)?;

            index.push(unit.bag.clone());
        }

        Ok(index)
    }

    /// The import mechanism may run under a different service identity;
    /// hand the working area over before invoking it
    async fn apply_ownership(&self, dir: &Path, owner: &str) -> Result<(), IngestError> {
        let output = Command::new("chown")
            .arg("-R")
            .arg(owner)
            .arg(dir)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::ImportFailed(format!(
                "chown of working area failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Shell out to the bulk-import mechanism, requesting the
    /// accession map alongside the staging tree
    async fn invoke(&self, dir: &Path, collection: &str) -> Result<(), IngestError> {
        let mapfile = dir.join(MAPFILE_NAME);
        let output = Command::new(&self.settings.import_command)
            .arg("import")
            .arg("--add")
            .arg("--eperson")
            .arg(&self.settings.eperson)
            .arg("--collection")
            .arg(collection)
            .arg("--source")
            .arg(dir)
            .arg("--mapfile")
            .arg(&mapfile)
            .output()
            .await
            .map_err(|e| {
                IngestError::ImportFailed(format!(
                    "could not launch {}: {}",
                    self.settings.import_command, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                collection = %collection,
                status = %output.status,
                stderr = %stderr.trim(),
                "Repository import failed"
            );
            return Err(IngestError::ImportFailed(format!(
                "import exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Read `item_<n> <handle>` lines from the accession map and correlate the
    /// staged indices back to bag names
    fn parse_results(&self, dir: &Path, index: &[String]) -> Result<ImportResult, IngestError> {
        let mapfile = dir.join(MAPFILE_NAME);
        let content = std::fs::read_to_string(&mapfile).map_err(|e| {
            IngestError::ImportFailed(format!("accession map was not produced: {}", e))
        })?;

        let fqdn = self.settings.fqdn.trim_end_matches('/');
        let mut handles = BTreeMap::new();

        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let mut parts = line.split_whitespace();
            let (item, handle) = match (parts.next(), parts.next()) {
                (Some(item), Some(handle)) => (item, handle),
                _ => {
                    tracing::warn!(line = %line, "Skipping malformed accession map line");
                    continue;
                }
            };
            let bag = item
                .strip_prefix("item_")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| index.get(n));
            match bag {
                Some(bag) => {
                    handles.insert(bag.clone(), format!("{}/{}", fqdn, handle));
                }
                None => {
                    tracing::warn!(item = %item, "Accession map entry has no staged item");
                }
            }
        }

        if handles.is_empty() {
            return Err(IngestError::ImportFailed(
                "accession map contained no usable entries".to_string(),
            ));
        }

        tracing::info!(imported = handles.len(), "Correlated accession map");
        Ok(ImportResult { handles })
    }
}
