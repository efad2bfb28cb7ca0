//! Deposit package assembly
//!
//! Builds one self-contained deposit unit per bag. Files whose names
//! carry a reserved marker ("committee", "abstract") are side-channel
//! metadata, not content: their text is folded into the descriptive
//! document and they are dropped from the content list.

use crate::models::{BagFailure, DepositUnit};
use crate::services::files::ObjectStore;
use crate::services::transform::TransformOutput;

/// Marker for committee-member listings (one member per line)
const COMMITTEE_MARKER: &str = "committee";
/// Marker for abstract text
const ABSTRACT_MARKER: &str = "abstract";

/// Package assembler over an object store
pub struct PackageAssembler<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> PackageAssembler<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Assemble a deposit unit from a bag's listed content keys
    ///
    /// A side-channel file that cannot be decoded as text fails this bag
    /// only; the caller records the reason and moves on to the next bag.
    pub async fn assemble(
        &self,
        bag: &str,
        output: TransformOutput,
        keys: Vec<String>,
    ) -> Result<DepositUnit, BagFailure> {
        let TransformOutput {
            mut descriptive,
            auxiliary,
        } = output;
        let mut content_files = Vec::new();

        for key in keys {
            let name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
            let lower = name.to_lowercase();

            if lower.contains(COMMITTEE_MARKER) {
                let text = self.read_text(bag, &key, &name).await?;
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    descriptive.push("contributor", "committeeMember", line);
                }
            } else if lower.contains(ABSTRACT_MARKER) {
                let text = self.read_text(bag, &key, &name).await?;
                let text = text.trim();
                if !text.is_empty() {
                    descriptive.push("description", "abstract", text);
                }
            } else {
                content_files.push(key);
            }
        }

        Ok(DepositUnit {
            bag: bag.to_string(),
            content_files,
            metadata: descriptive,
            auxiliary,
        })
    }

    async fn read_text(&self, bag: &str, key: &str, name: &str) -> Result<String, BagFailure> {
        let bytes = self
            .store
            .download(key)
            .await
            .map_err(|e| BagFailure::new(bag, format!("Could not retrieve {}: {}", name, e)))?;
        String::from_utf8(bytes).map_err(|_| {
            tracing::warn!(bag = %bag, file = %name, "Side-channel file is not valid text");
            BagFailure::new(bag, format!("Could not decode {} as text", name))
        })
    }
}
