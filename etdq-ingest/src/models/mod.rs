//! Data models for the ingestion pipeline

mod dc;
mod marc;
mod outcome;

pub use dc::{DcValue, DublinCore};
pub use marc::{
    splice_electronic_location, BibRecord, ControlField, DataField, MarcRecord, SubField,
};
pub use outcome::{
    Bag, BagFailure, CatalogStatusRecord, DepositUnit, DigitizationRequest, ImportResult,
    IngestionOutcome, UrlUpdate,
};
