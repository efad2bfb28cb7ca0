//! Metadata completeness gate
//!
//! Labels and their order are stable contract: they are surfaced verbatim
//! in failure reports and notification emails.

use crate::error::CatalogError;
use crate::models::{BibRecord, MarcRecord};

/// Where to look for a required field
enum Locator {
    /// Any data field with one of these tags carries non-blank text
    AnyTag(&'static [&'static str]),
    /// A specific tag/subfield carries non-blank text
    Subfield(&'static str, &'static str),
}

struct Requirement {
    label: &'static str,
    locator: Locator,
}

/// Required fields, in the order they are reported
const REQUIRED: &[Requirement] = &[
    Requirement {
        label: "245: Title",
        locator: Locator::AnyTag(&["245"]),
    },
    Requirement {
        label: "100: Author",
        locator: Locator::AnyTag(&["100"]),
    },
    Requirement {
        label: "260/264: Publish Year",
        locator: Locator::AnyTag(&["260", "264"]),
    },
    Requirement {
        label: "502a: Thesis/Diss Tag",
        locator: Locator::Subfield("502", "a"),
    },
    Requirement {
        label: "690: School",
        locator: Locator::AnyTag(&["690"]),
    },
    Requirement {
        label: "600/610/611/630/650/651: Subject Heading",
        locator: Locator::AnyTag(&["600", "610", "611", "630", "650", "651"]),
    },
];

fn is_missing(record: &MarcRecord, locator: &Locator) -> bool {
    match locator {
        Locator::AnyTag(tags) => !tags
            .iter()
            .any(|tag| record.data_fields_with_tag(tag).any(|f| f.has_text())),
        Locator::Subfield(tag, code) => record.first_subfield_value(tag, code).is_none(),
    }
}

/// Labels of required fields that are absent or blank, in declared order
pub fn check(record: &BibRecord) -> Vec<String> {
    REQUIRED
        .iter()
        .filter(|req| is_missing(&record.record, &req.locator))
        .map(|req| req.label.to_string())
        .collect()
}

/// Like [`check`], but a failed fetch passes the error's message through
/// directly as the single reported item
pub fn check_fetched(fetched: &Result<BibRecord, CatalogError>) -> Vec<String> {
    match fetched {
        Ok(record) => check(record),
        Err(e) => vec![e.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &str) -> BibRecord {
        let xml = format!(
            r#"<bib><mms_id>9876543210987</mms_id><record>
                 <leader>00000nam a2200000 a 4500</leader>
                 {}
               </record></bib>"#,
            fields
        );
        BibRecord::parse(&xml).unwrap()
    }

    const COMPLETE: &str = r#"
        <datafield tag="245" ind1="1" ind2="0"><subfield code="a">Title</subfield></datafield>
        <datafield tag="100" ind1="1" ind2=" "><subfield code="a">Smith, Jordan.</subfield></datafield>
        <datafield tag="260" ind1=" " ind2=" "><subfield code="c">2019.</subfield></datafield>
        <datafield tag="502" ind1=" " ind2=" "><subfield code="a">Thesis (M.S.)--University of Oklahoma, 2019.</subfield></datafield>
        <datafield tag="690" ind1=" " ind2=" "><subfield code="a">School of Civil Engineering.</subfield></datafield>
        <datafield tag="650" ind1=" " ind2="0"><subfield code="a">Hydrology.</subfield></datafield>
    "#;

    #[test]
    fn complete_record_has_no_missing_fields() {
        assert!(check(&record(COMPLETE)).is_empty());
    }

    #[test]
    fn reports_missing_fields_in_declared_order() {
        // Only a title present: everything else missing, in fixed order
        let rec = record(
            r#"<datafield tag="245" ind1="1" ind2="0"><subfield code="a">Title</subfield></datafield>"#,
        );
        assert_eq!(
            check(&rec),
            vec![
                "100: Author",
                "260/264: Publish Year",
                "502a: Thesis/Diss Tag",
                "690: School",
                "600/610/611/630/650/651: Subject Heading",
            ]
        );
    }

    #[test]
    fn blank_field_counts_as_missing() {
        let rec = record(
            r#"
            <datafield tag="245" ind1="1" ind2="0"><subfield code="a">  </subfield></datafield>
            <datafield tag="100" ind1="1" ind2=" "><subfield code="a">Smith</subfield></datafield>
            "#,
        );
        let missing = check(&rec);
        assert!(missing.contains(&"245: Title".to_string()));
        assert!(!missing.contains(&"100: Author".to_string()));
    }

    #[test]
    fn publish_year_accepts_either_260_or_264() {
        let with_264 = record(&COMPLETE.replace(r#"tag="260""#, r#"tag="264""#));
        assert!(!check(&with_264).contains(&"260/264: Publish Year".to_string()));
    }

    #[test]
    fn any_subject_heading_tag_satisfies_the_requirement() {
        for tag in ["600", "610", "611", "630", "650", "651"] {
            let fields = COMPLETE.replace(r#"tag="650""#, &format!(r#"tag="{}""#, tag));
            assert!(
                check(&record(&fields)).is_empty(),
                "tag {} should satisfy subject heading",
                tag
            );
        }
    }

    #[test]
    fn thesis_tag_requires_subfield_a_specifically() {
        let fields = COMPLETE.replace(
            r#"<datafield tag="502" ind1=" " ind2=" "><subfield code="a">Thesis (M.S.)--University of Oklahoma, 2019.</subfield></datafield>"#,
            r#"<datafield tag="502" ind1=" " ind2=" "><subfield code="b">wrong subfield</subfield></datafield>"#,
        );
        assert_eq!(check(&record(&fields)), vec!["502a: Thesis/Diss Tag"]);
    }

    #[test]
    fn fetch_error_content_is_passed_through() {
        let fetched: Result<BibRecord, CatalogError> = Err(CatalogError::Status(403));
        assert_eq!(
            check_fetched(&fetched),
            vec!["Alma server returned code: 403"]
        );

        let fetched: Result<BibRecord, CatalogError> = Err(CatalogError::Unavailable);
        assert_eq!(
            check_fetched(&fetched),
            vec!["Alma Connection Error - try again later."]
        );
    }

    #[test]
    fn absent_record_reports_not_found() {
        let fetched: Result<BibRecord, CatalogError> = Err(CatalogError::NotFound);
        assert_eq!(check_fetched(&fetched), vec!["Could not find record!"]);
    }
}
