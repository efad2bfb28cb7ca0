//! Digitization request queue

use async_trait::async_trait;
use etdq_common::config::TrackingSettings;
use serde::Deserialize;

use crate::error::StoreError;
use crate::models::DigitizationRequest;

/// Read interface over outstanding digitization requests
#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Record identifiers with at least one outstanding request
    async fn requested_mmsids(&self) -> Result<Vec<String>, StoreError>;

    /// Every outstanding request for one record identifier
    async fn requests_for(&self, mmsid: &str) -> Result<Vec<DigitizationRequest>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct RequestPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<DigitizationRequest>,
}

/// HTTP client for the request listing endpoint
pub struct HttpRequestQueue {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRequestQueue {
    pub fn new(client: reqwest::Client, settings: &TrackingSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<RequestPage, StoreError> {
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

    async fn fetch_all(&self, first: String) -> Result<Vec<DigitizationRequest>, StoreError> {
        let mut url = first;
        let mut requests = Vec::new();
        loop {
            let page = self.fetch_page(&url).await?;
            requests.extend(page.results);
            match page.next {
                Some(next) if next.starts_with("http") => url = next,
                Some(next) => url = format!("{}{}", self.base_url, next),
                None => break,
            }
        }
        Ok(requests)
    }
}

#[async_trait]
impl RequestQueue for HttpRequestQueue {
    async fn requested_mmsids(&self) -> Result<Vec<String>, StoreError> {
        let requests = self
            .fetch_all(format!("{}/requests", self.base_url))
            .await?;
        let mut mmsids: Vec<String> = requests
            .into_iter()
            .map(|r| r.mmsid)
            .filter(|m| !m.is_empty())
            .collect();
        mmsids.sort();
        mmsids.dedup();
        tracing::debug!(count = mmsids.len(), "Listed requested record identifiers");
        Ok(mmsids)
    }

    async fn requests_for(&self, mmsid: &str) -> Result<Vec<DigitizationRequest>, StoreError> {
        let url = format!("{}/requests?mmsid={}", self.base_url, mmsid);
        self.fetch_all(url).await
    }
}
