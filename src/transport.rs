use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, SeekSenseError};
use crate::models::{Review, SearchRequest};

#[cfg(test)]
use mockall::automock;

/// Longest slice of an error body kept in logs and errors
const MAX_ERROR_BODY: usize = 200;

/// Review backend as seen by the views
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// Free-text search over reviews
    async fn search(&self, query: &str) -> Result<Vec<Review>>;

    /// All review rows sharing a clothing id. Empty means "not found".
    async fn get_by_id(&self, id: u32) -> Result<Vec<Review>>;
}

pub struct HttpReviewApi {
    client: Client,
    base_url: String,
}

impl HttpReviewApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.api.base_url, cfg.api_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode(response: reqwest::Response, endpoint: &str) -> Result<Vec<Review>> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!("Failed to parse {} response: {}", endpoint, e);
            SeekSenseError::Json(e)
        })
    }

    async fn status_error(response: reqwest::Response, endpoint: &str) -> SeekSenseError {
        let status = response.status().as_u16();
        let mut body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        tracing::warn!("{} returned {}: {}", endpoint, status, body);
        SeekSenseError::Status { status, body }
    }
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn search(&self, query: &str) -> Result<Vec<Review>> {
        let endpoint = "/api/reviews/search";
        tracing::debug!("POST {} query={:?}", endpoint, query);

        let response = self
            .client
            .post(self.url(endpoint))
            .json(&SearchRequest { query })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to {}: {}", endpoint, e);
                SeekSenseError::Http(e)
            })?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, endpoint).await);
        }

        let reviews = Self::decode(response, endpoint).await?;
        tracing::debug!("{} returned {} reviews", endpoint, reviews.len());
        Ok(reviews)
    }

    async fn get_by_id(&self, id: u32) -> Result<Vec<Review>> {
        let endpoint = format!("/api/product/{id}");
        tracing::debug!("GET {}", endpoint);

        let response = self
            .client
            .get(self.url(&endpoint))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to {}: {}", endpoint, e);
                SeekSenseError::Http(e)
            })?;

        // An unknown id may come back as 404 rather than an empty array
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("{} not found", endpoint);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response, &endpoint).await);
        }

        let reviews = Self::decode(response, &endpoint).await?;
        tracing::debug!("{} returned {} rows", endpoint, reviews.len());
        Ok(reviews)
    }
}
