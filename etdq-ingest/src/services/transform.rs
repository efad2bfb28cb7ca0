//! Bibliographic-to-descriptive metadata transformation
//!
//! Deterministic MARC to Dublin Core mapping with a fail-closed validation
//! gate: a malformed record produces no metadata at all rather than
//! garbage. Internal-only note tags are stripped before mapping so they
//! can never leak into public metadata.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{BibRecord, DublinCore, MarcRecord};

/// Tags that must never reach public metadata (restriction / local
/// embargo notes)
const INTERNAL_ONLY_TAGS: &[&str] = &["506", "590"];

/// Subject heading tags mapped to `dc.subject`
const SUBJECT_TAGS: &[&str] = &["600", "610", "611", "630", "650", "651"];

/// Subfield codes joined into one subject heading string
const SUBJECT_CODES: &[&str] = &["a", "x", "y", "z"];

/// Auxiliary stream name for institution-specific values
const OU_STREAM: &str = "ou";

/// The record failed structural validation
#[derive(Debug, Error)]
#[error("Invalid MARC record: {0}")]
pub struct InvalidRecord(pub String);

/// Transformation result: the descriptive document plus any auxiliary
/// metadata streams synthesized from the record
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub descriptive: DublinCore,
    pub auxiliary: BTreeMap<String, DublinCore>,
}

/// Transform a validated bibliographic record into descriptive metadata
pub fn transform(bib: &BibRecord) -> Result<TransformOutput, InvalidRecord> {
    bib.record.validate().map_err(InvalidRecord)?;

    let record = strip_internal_fields(&bib.record);
    let mut dc = DublinCore::new();

    // 245 $a $b: title
    for field in record.data_fields_with_tag("245") {
        let title: Vec<&str> = ["a", "b"]
            .iter()
            .filter_map(|code| field.subfield(code))
            .map(|s| s.value.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !title.is_empty() {
            dc.push("title", "none", title.join(" "));
        }
    }

    // 100 $a: author; 700 $a: other contributors
    for value in record.subfield_values("100", "a") {
        dc.push("contributor", "author", value);
    }
    for value in record.subfield_values("700", "a") {
        dc.push("contributor", "other", value);
    }

    // 264 preferred over 260 for the issued date; both sources contribute
    // a created date, deduplicated below
    if let Some(issued) = record
        .first_subfield_value("264", "c")
        .or_else(|| record.first_subfield_value("260", "c"))
    {
        dc.push("date", "issued", issued);
    }
    for tag in ["260", "264"] {
        for value in record.subfield_values(tag, "c") {
            dc.push("date", "created", value);
        }
    }

    if let Some(publisher) = record
        .first_subfield_value("260", "b")
        .or_else(|| record.first_subfield_value("264", "b"))
    {
        dc.push("publisher", "none", publisher);
    }

    // 502 / 500: degree statement and general notes
    for tag in ["502", "500"] {
        for value in record.subfield_values(tag, "a") {
            dc.push("description", "none", value);
        }
    }
    for value in record.subfield_values("520", "a") {
        dc.push("description", "abstract", value);
    }

    // Subject headings with subdivisions joined LCSH-style
    for tag in SUBJECT_TAGS {
        for field in record.data_fields_with_tag(tag) {
            let heading: Vec<&str> = field
                .subfields
                .iter()
                .filter(|s| SUBJECT_CODES.contains(&s.code.as_str()))
                .map(|s| s.value.trim())
                .filter(|v| !v.is_empty())
                .collect();
            if !heading.is_empty() {
                dc.push("subject", "none", heading.join(" -- "));
            }
        }
    }

    // 008 positions 35-37: language code
    if let Some(fixed) = record.control_value("008") {
        if let Some(lang) = fixed.get(35..38) {
            if !lang.trim().is_empty() {
                dc.push("language", "iso", lang);
            }
        }
    }

    dc.push("type", "none", work_type(&record));

    dedupe_date_created(&mut dc);

    let mut auxiliary = BTreeMap::new();
    let schools = record.subfield_values("690", "a");
    if !schools.is_empty() {
        let mut ou = DublinCore::with_schema(OU_STREAM);
        for school in schools {
            ou.push("thesis", "school", school);
        }
        if let Some(degree) = record.first_subfield_value("502", "a") {
            ou.push("thesis", "degree", degree);
        }
        auxiliary.insert(OU_STREAM.to_string(), ou);
    }

    Ok(TransformOutput {
        descriptive: dc,
        auxiliary,
    })
}

/// Enforce the single-"date created" invariant: the first occurrence
/// survives, later duplicates are dropped
pub fn dedupe_date_created(dc: &mut DublinCore) {
    let mut seen = false;
    dc.values.retain(|v| {
        if v.element == "date" && v.qualifier == "created" {
            if seen {
                return false;
            }
            seen = true;
        }
        true
    });
}

fn strip_internal_fields(record: &MarcRecord) -> MarcRecord {
    let mut cleaned = record.clone();
    cleaned
        .data_fields
        .retain(|f| !INTERNAL_ONLY_TAGS.contains(&f.tag.as_str()));
    cleaned
}

fn work_type(record: &MarcRecord) -> &'static str {
    let degree = record
        .first_subfield_value("502", "a")
        .unwrap_or_default()
        .to_lowercase();
    if degree.contains("dissertation") {
        "Dissertation"
    } else {
        "Thesis"
    }
}
