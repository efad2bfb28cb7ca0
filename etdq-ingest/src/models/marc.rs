//! MARC bibliographic record model
//!
//! Deserialized from the catalog's bib XML (`<bib>` wrapper holding a
//! MARC21 `<record>`). Only the fields the pipeline inspects are modeled;
//! unknown elements are ignored on the way in. The write-back path never
//! goes through this model: the catalog owns elements the model does not
//! carry, so the electronic-location update splices the raw document
//! instead ([`splice_electronic_location`]).

use quick_xml::de::from_str;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use serde::Deserialize;

use crate::error::CatalogError;

/// Electronic-location field coordinates: tag 856, ind1=4, ind2=0, $u
const URL_TAG: &str = "856";
const URL_IND1: &str = "4";
const URL_IND2: &str = "0";
const URL_CODE: &str = "u";

/// Catalog bib record: identifier plus embedded MARC record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "bib")]
pub struct BibRecord {
    /// Bibliographic record identifier (MMS ID)
    #[serde(default)]
    pub mms_id: String,
    /// Embedded MARC21 record
    pub record: MarcRecord,
}

/// MARC21 record: leader, control fields, data fields
#[derive(Debug, Clone, Deserialize)]
pub struct MarcRecord {
    pub leader: Option<String>,
    #[serde(rename = "controlfield", default)]
    pub control_fields: Vec<ControlField>,
    #[serde(rename = "datafield", default)]
    pub data_fields: Vec<DataField>,
}

/// MARC control field (e.g. 008 fixed-length data elements)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// MARC data field with indicators and subfields
#[derive(Debug, Clone, Deserialize)]
pub struct DataField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "@ind1", default)]
    pub ind1: String,
    #[serde(rename = "@ind2", default)]
    pub ind2: String,
    #[serde(rename = "subfield", default)]
    pub subfields: Vec<SubField>,
}

/// MARC subfield
#[derive(Debug, Clone, Deserialize)]
pub struct SubField {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl DataField {
    /// First subfield with the given code
    pub fn subfield(&self, code: &str) -> Option<&SubField> {
        self.subfields.iter().find(|s| s.code == code)
    }

    /// Whether any subfield carries non-blank text
    pub fn has_text(&self) -> bool {
        self.subfields.iter().any(|s| !s.value.trim().is_empty())
    }
}

impl BibRecord {
    /// Parse a catalog bib XML document
    pub fn parse(xml: &str) -> Result<Self, CatalogError> {
        from_str(xml).map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

impl MarcRecord {
    /// All data fields with the given tag
    pub fn data_fields_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |f| f.tag == tag)
    }

    /// First non-blank value of `tag`/`code`
    pub fn first_subfield_value<'a>(&'a self, tag: &'a str, code: &str) -> Option<&'a str> {
        self.data_fields_with_tag(tag)
            .filter_map(|f| f.subfield(code))
            .map(|s| s.value.trim())
            .find(|v| !v.is_empty())
    }

    /// All non-blank values of `tag`/`code`, in record order
    pub fn subfield_values<'a>(&'a self, tag: &'a str, code: &str) -> Vec<&'a str> {
        self.data_fields_with_tag(tag)
            .filter_map(|f| f.subfield(code))
            .map(|s| s.value.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Value of a control field (e.g. "008")
    pub fn control_value(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Structural validation of the record
    ///
    /// A malformed record fails closed: the transformer refuses to produce
    /// metadata from it rather than emitting garbage.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(leader) = &self.leader {
            if leader.len() != 24 {
                return Err(format!("leader length {} (expected 24)", leader.len()));
            }
        }
        if self.data_fields.is_empty() {
            return Err("record contains no data fields".to_string());
        }
        for field in &self.control_fields {
            if field.tag.len() != 3 || !field.tag.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid control field tag '{}'", field.tag));
            }
        }
        for field in &self.data_fields {
            if field.tag.len() != 3 || !field.tag.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid data field tag '{}'", field.tag));
            }
            if field.ind1.len() > 1 || field.ind2.len() > 1 {
                return Err(format!("invalid indicators on tag '{}'", field.tag));
            }
            for sub in &field.subfields {
                if sub.code.len() != 1 {
                    return Err(format!(
                        "invalid subfield code '{}' on tag '{}'",
                        sub.code, field.tag
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Rewrite the electronic-location URL (856 40 $u) inside a raw bib XML
/// document, returning the new document and the previous value
///
/// Operates on the document event stream so every element the catalog
/// owns passes through untouched; only the one subfield text changes.
/// The $u subfield is inserted into the first 856 40 field when absent,
/// and the whole field is appended to the record when none exists.
pub fn splice_electronic_location(
    xml: &str,
    url: &str,
) -> Result<(String, Option<String>), CatalogError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let mut old_url: Option<String> = None;
    let mut in_url_field = false;
    let mut in_url_subfield = false;
    let mut url_field_seen = false;
    let mut url_subfield_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        match event {
            Event::Eof => break,

            Event::Start(e)
                if !url_field_seen && is_url_field(&e) =>
            {
                in_url_field = true;
                url_field_seen = true;
                url_subfield_seen = false;
                write(&mut writer, Event::Start(e))?;
            }
            // Self-closing 856 40: reopen it to carry the subfield
            Event::Empty(e)
                if !url_field_seen && is_url_field(&e) =>
            {
                url_field_seen = true;
                write(&mut writer, Event::Start(e))?;
                write_url_subfield(&mut writer, url)?;
                write(&mut writer, Event::End(BytesEnd::new("datafield")))?;
            }

            Event::Start(e)
                if in_url_field
                    && e.name().as_ref() == b"subfield"
                    && attr_eq(&e, "code", URL_CODE) =>
            {
                in_url_subfield = true;
                url_subfield_seen = true;
                write(&mut writer, Event::Start(e))?;
                write(&mut writer, Event::Text(BytesText::new(url)))?;
            }
            Event::Empty(e)
                if in_url_field
                    && e.name().as_ref() == b"subfield"
                    && attr_eq(&e, "code", URL_CODE) =>
            {
                url_subfield_seen = true;
                old_url = Some(String::new());
                write(&mut writer, Event::Start(e))?;
                write(&mut writer, Event::Text(BytesText::new(url)))?;
                write(&mut writer, Event::End(BytesEnd::new("subfield")))?;
            }

            // The old URL text is captured, not copied through
            Event::Text(t) if in_url_subfield => {
                let text = t
                    .unescape()
                    .map_err(|e| CatalogError::Parse(e.to_string()))?;
                old_url.get_or_insert_with(String::new).push_str(&text);
            }
            Event::End(e) if in_url_subfield && e.name().as_ref() == b"subfield" => {
                in_url_subfield = false;
                if old_url.is_none() {
                    old_url = Some(String::new());
                }
                write(&mut writer, Event::End(e))?;
            }

            Event::End(e) if in_url_field && e.name().as_ref() == b"datafield" => {
                if !url_subfield_seen {
                    write_url_subfield(&mut writer, url)?;
                }
                in_url_field = false;
                write(&mut writer, Event::End(e))?;
            }
            Event::End(e) if !url_field_seen && e.name().as_ref() == b"record" => {
                url_field_seen = true;
                write_url_field(&mut writer, url)?;
                write(&mut writer, Event::End(e))?;
            }

            other => write(&mut writer, other)?,
        }
    }

    let document = String::from_utf8(writer.into_inner())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;
    Ok((document, old_url))
}

fn is_url_field(e: &BytesStart) -> bool {
    e.name().as_ref() == b"datafield"
        && attr_eq(e, "tag", URL_TAG)
        && attr_eq(e, "ind1", URL_IND1)
        && attr_eq(e, "ind2", URL_IND2)
}

fn attr_eq(e: &BytesStart, name: &str, expected: &str) -> bool {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .map(|a| a.value.as_ref() == expected.as_bytes())
        .unwrap_or(false)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CatalogError> {
    writer
        .write_event(event)
        .map_err(|e| CatalogError::Parse(e.to_string()))
}

fn write_url_subfield(writer: &mut Writer<Vec<u8>>, url: &str) -> Result<(), CatalogError> {
    let mut subfield = BytesStart::new("subfield");
    subfield.push_attribute(("code", URL_CODE));
    write(writer, Event::Start(subfield))?;
    write(writer, Event::Text(BytesText::new(url)))?;
    write(writer, Event::End(BytesEnd::new("subfield")))
}

fn write_url_field(writer: &mut Writer<Vec<u8>>, url: &str) -> Result<(), CatalogError> {
    let mut field = BytesStart::new("datafield");
    field.push_attribute(("ind1", URL_IND1));
    field.push_attribute(("ind2", URL_IND2));
    field.push_attribute(("tag", URL_TAG));
    write(writer, Event::Start(field))?;
    write_url_subfield(writer, url)?;
    write(writer, Event::End(BytesEnd::new("datafield")))
}
