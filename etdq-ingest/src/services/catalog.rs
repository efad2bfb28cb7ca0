//! Bibliographic catalog gateway
//!
//! Read path and write path use separate credentials: the read-only key
//! serves every fetch, and only the electronic-location update goes out
//! with the write-scoped key.

use async_trait::async_trait;
use etdq_common::config::CatalogSettings;

use crate::error::CatalogError;
use crate::models::{splice_electronic_location, BibRecord, UrlUpdate};

/// Narrow interface over the external catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the bibliographic record for an identifier
    async fn fetch(&self, mmsid: &str) -> Result<BibRecord, CatalogError>;

    /// Persist a repository URL into the record's electronic-location
    /// field, returning the old and new values
    async fn update_electronic_location(
        &self,
        mmsid: &str,
        url: &str,
    ) -> Result<UrlUpdate, CatalogError>;
}

/// HTTP client for the hosted Alma bib API
pub struct AlmaCatalog {
    client: reqwest::Client,
    base_url: String,
    read_key: String,
    write_key: String,
}

impl AlmaCatalog {
    /// Wrap an already-constructed HTTP client
    ///
    /// The client is built once at process start and injected here; the
    /// gateway never creates connections of its own accord.
    pub fn new(client: reqwest::Client, settings: &CatalogSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            read_key: settings.read_key.clone(),
            write_key: settings.write_key.clone(),
        }
    }

    fn bib_url(&self, mmsid: &str, key: &str) -> String {
        format!("{}/bibs/{}?expand=None&apikey={}", self.base_url, mmsid, key)
    }

    /// Fetch the raw bib document; the write path needs the full text,
    /// not just the modeled subset
    async fn fetch_raw(&self, mmsid: &str, key: &str) -> Result<String, CatalogError> {
        let url = self.bib_url(mmsid, key);
        tracing::debug!(mmsid = %mmsid, "Fetching bib record from catalog");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(mmsid = %mmsid, error = %e, "Catalog connection failed");
                CatalogError::Unavailable
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            tracing::warn!(mmsid = %mmsid, "Catalog has no record for identifier");
            return Err(CatalogError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(mmsid = %mmsid, status = %status, body = %body, "Catalog returned error status");
            return Err(CatalogError::Status(status.as_u16()));
        }

        response.text().await.map_err(|_| CatalogError::Unavailable)
    }

    async fn fetch_with_key(&self, mmsid: &str, key: &str) -> Result<BibRecord, CatalogError> {
        let body = self.fetch_raw(mmsid, key).await?;
        BibRecord::parse(&body)
    }
}

#[async_trait]
impl Catalog for AlmaCatalog {
    async fn fetch(&self, mmsid: &str) -> Result<BibRecord, CatalogError> {
        self.fetch_with_key(mmsid, &self.read_key).await
    }

    async fn update_electronic_location(
        &self,
        mmsid: &str,
        url: &str,
    ) -> Result<UrlUpdate, CatalogError> {
        // Read-modify-write with the write-scoped key throughout. The
        // catalog owns elements the record model does not carry, so the
        // new URL is spliced into the fetched document as-is rather than
        // round-tripped through the model.
        let raw = self.fetch_raw(mmsid, &self.write_key).await?;
        let (body, old_url) = splice_electronic_location(&raw, url)?;

        let put_url = self.bib_url(mmsid, &self.write_key);
        let response = self
            .client
            .put(&put_url)
            .header("content-type", "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(mmsid = %mmsid, error = %e, "Catalog update connection failed");
                CatalogError::Unavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(mmsid = %mmsid, status = %status, body = %body, "Could not update record");
            return Err(CatalogError::Status(status.as_u16()));
        }

        tracing::info!(
            mmsid = %mmsid,
            old_url = %old_url.as_deref().unwrap_or("<none>"),
            new_url = %url,
            "Updated catalog electronic location"
        );

        Ok(UrlUpdate {
            mmsid: mmsid.to_string(),
            old_url,
            new_url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CatalogSettings {
        CatalogSettings {
            base_url: "https://api.example.edu/almaws/v1/".to_string(),
            read_key: "ro".to_string(),
            write_key: "rw".to_string(),
        }
    }

    #[test]
    fn bib_url_uses_given_key_and_trims_slash() {
        let catalog = AlmaCatalog::new(reqwest::Client::new(), &settings());
        assert_eq!(
            catalog.bib_url("9876543210987", "ro"),
            "https://api.example.edu/almaws/v1/bibs/9876543210987?expand=None&apikey=ro"
        );
    }

    #[test]
    fn error_messages_match_operator_expectations() {
        // These strings surface verbatim in failure reports
        assert_eq!(
            CatalogError::Unavailable.to_string(),
            "Alma Connection Error - try again later."
        );
        assert_eq!(
            CatalogError::Status(500).to_string(),
            "Alma server returned code: 500"
        );
        assert_eq!(CatalogError::NotFound.to_string(), "Could not find record!");
    }
}
