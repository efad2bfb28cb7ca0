//! Ingest-status tracking over the data catalog document API

use async_trait::async_trait;
use chrono::Utc;
use etdq_common::config::TrackingSettings;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::StoreError;
use crate::models::CatalogStatusRecord;

/// Tracking store over per-bag digital-object documents
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Bag names whose content is in object storage but whose ingest flag
    /// is not yet set, limited to the given record identifiers
    async fn digitized_not_ingested(&self, mmsids: &[String]) -> Result<Vec<String>, StoreError>;

    /// Record a bag's ingest status and repository URL
    ///
    /// The bag name here carries the source prefix (`<source>/<bag>`),
    /// matching how the digitization process keys its documents.
    async fn update_ingest_status(
        &self,
        bag: &str,
        url: &str,
        ingested: bool,
    ) -> Result<(), StoreError>;
}

/// One page of a paginated document listing
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

/// HTTP client for the data catalog's digital-object documents
pub struct HttpTrackingStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    application: String,
    source: String,
}

impl HttpTrackingStore {
    pub fn new(client: reqwest::Client, settings: &TrackingSettings, source: &str) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            application: settings.application.clone(),
            source: source.to_string(),
        }
    }

    fn search_url(&self, query: &Value) -> String {
        format!("{}/digital_objects/search?query={}", self.base_url, query)
    }

    /// Documents for bags tied to one record identifier that are stored
    /// but not yet flagged ingested
    fn pending_query(&self, mmsid: &str) -> Value {
        let ingested_key = format!("application.{}.ingested", self.application);
        json!({
            "bag": { "$regex": format!("^{}.*({})$", self.source, mmsid) },
            "locations.s3.exists": true,
            (ingested_key): { "$ne": true },
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, StoreError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16(), body));
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// Walk `next` links until the listing is exhausted
    async fn search_all(&self, query: &Value) -> Result<Vec<Value>, StoreError> {
        let mut url = self.search_url(query);
        let mut documents = Vec::new();
        loop {
            let body = self.get_json(&url).await?;
            let page: Page =
                serde_json::from_value(body).map_err(|e| StoreError::Parse(e.to_string()))?;
            documents.extend(page.results);
            match page.next {
                Some(next) if next.starts_with("http") => url = next,
                Some(next) => url = format!("{}{}", self.base_url, next),
                None => break,
            }
        }
        Ok(documents)
    }

    async fn put_document(&self, bag: &str, document: &Value) -> Result<(), StoreError> {
        let url = format!("{}/digital_objects/{}", self.base_url, bag);
        let mut request = self.client.put(&url).json(document);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status(status.as_u16(), body));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for HttpTrackingStore {
    async fn digitized_not_ingested(&self, mmsids: &[String]) -> Result<Vec<String>, StoreError> {
        let mut bags = Vec::new();
        for mmsid in mmsids {
            let documents = self.search_all(&self.pending_query(mmsid)).await?;
            for doc in documents {
                if let Some(bag) = doc.get("bag").and_then(Value::as_str) {
                    // Documents key bags as <source>/<bag>; the pipeline
                    // works with the bare bag name
                    let name = bag
                        .strip_prefix(&format!("{}/", self.source))
                        .unwrap_or(bag);
                    bags.push(name.to_string());
                }
            }
        }
        bags.sort();
        bags.dedup();
        tracing::debug!(candidates = bags.len(), "Resolved digitized-not-ingested bags");
        Ok(bags)
    }

    async fn update_ingest_status(
        &self,
        bag: &str,
        url: &str,
        ingested: bool,
    ) -> Result<(), StoreError> {
        let query = json!({ "bag": bag });
        let mut documents = self.search_all(&query).await?;
        let mut document = documents
            .drain(..)
            .next()
            .ok_or_else(|| StoreError::NotFound(bag.to_string()))?;

        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::Parse(format!("document for {} is not an object", bag)))?;

        // Merge into application.<name>; sub-documents owned by other
        // applications are preserved untouched
        let application = object
            .entry("application")
            .or_insert_with(|| Value::Object(Map::new()));
        let application = application
            .as_object_mut()
            .ok_or_else(|| StoreError::Parse(format!("application field of {} is not an object", bag)))?;
        let status = CatalogStatusRecord {
            ingested,
            url: url.to_string(),
            datetime: Utc::now(),
        };
        let status =
            serde_json::to_value(&status).map_err(|e| StoreError::Parse(e.to_string()))?;
        application.insert(self.application.clone(), status);

        self.put_document(bag, &document).await?;
        tracing::info!(bag = %bag, url = %url, ingested, "Recorded ingest status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpTrackingStore {
        HttpTrackingStore::new(
            reqwest::Client::new(),
            &TrackingSettings {
                base_url: "https://cc.example.edu/api/catalog/".to_string(),
                token: None,
                application: "dspace".to_string(),
            },
            "shareok",
        )
    }

    #[test]
    fn pending_query_matches_document_conventions() {
        let query = store().pending_query("9876543210987");
        assert_eq!(
            query["bag"]["$regex"],
            json!("^shareok.*(9876543210987)$")
        );
        assert_eq!(query["locations.s3.exists"], json!(true));
        assert_eq!(query["application.dspace.ingested"], json!({ "$ne": true }));
    }

    #[test]
    fn search_url_trims_base_slash() {
        let url = store().search_url(&json!({ "bag": "x" }));
        assert!(url.starts_with("https://cc.example.edu/api/catalog/digital_objects/search?query="));
    }
}
