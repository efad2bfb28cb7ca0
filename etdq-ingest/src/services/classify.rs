//! Collection classification from bibliographic record content
//!
//! Infers the target repository collection from the degree statement
//! (502 $a) when no explicit collection is supplied.

use etdq_common::config::ClassifierSettings;

use crate::error::IngestError;
use crate::models::BibRecord;

/// Work-type keywords; fixed vocabulary, matched case-insensitively
const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("thesis", "THESIS"),
    ("theses", "THESIS"),
    ("dissertation", "DISSERTATION"),
    ("dissertations", "DISSERTATION"),
];

/// Determine the collection handle for a record
///
/// Falls back to the configured default organization and type when no
/// keyword matches or the 502 field is absent. A missing entry in the
/// routing table is a deployment defect, not bad input data.
pub fn classify(bib: &BibRecord, settings: &ClassifierSettings) -> Result<String, IngestError> {
    let text = bib
        .record
        .first_subfield_value("502", "a")
        .unwrap_or_default()
        .to_lowercase();

    let mut org = settings.default_org.as_str();
    for (keyword, code) in &settings.organizations {
        if text.contains(keyword.to_lowercase().as_str()) {
            org = code;
            break;
        }
    }

    let mut work_type = settings.default_type.as_str();
    for (keyword, code) in TYPE_KEYWORDS {
        if text.contains(keyword) {
            work_type = code;
            break;
        }
    }

    let key = format!("{}_{}", org, work_type);
    settings.collections.get(&key).cloned().ok_or_else(|| {
        IngestError::Config(format!(
            "No collection configured for '{}' - check the classifier routing table",
            key
        ))
    })
}
