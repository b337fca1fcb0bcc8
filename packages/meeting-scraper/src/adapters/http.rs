//! Polite HTTP GETs shared by the static and API adapters and agenda downloads.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{FetchError, SourceResult};
use crate::politeness::Politeness;

/// Backoff before the single retry of a transport failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Build the shared HTTP client from settings.
pub fn build_client(settings: &Settings) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.fetch_timeout_ms))
        .user_agent(settings.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// A downloaded document with what the server said about it.
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client that asks [`Politeness`] before every request.
pub struct HttpFetcher {
    client: reqwest::Client,
    politeness: Arc<Politeness>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, politeness: Arc<Politeness>) -> Self {
        Self { client, politeness }
    }

    pub fn politeness(&self) -> &Arc<Politeness> {
        &self.politeness
    }

    /// Admitted GET with one retry on transport errors. Non-success statuses
    /// are not retried.
    async fn get(&self, url: &str, accept: &str) -> SourceResult<reqwest::Response> {
        self.politeness.admit(url).await?;

        let mut retried = false;
        loop {
            debug!(url = %url, "HTTP fetch starting");
            let result = self.client.get(url).header(ACCEPT, accept).send().await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    }
                    .into());
                }
                Err(e) if !retried && (e.is_connect() || e.is_timeout() || e.is_request()) => {
                    warn!(url = %url, error = %e, "HTTP request failed, retrying once");
                    retried = true;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    return Err(FetchError::Http {
                        url: url.to_string(),
                        source: e,
                    }
                    .into());
                }
            }
        }
    }

    /// Fetch a page body as text.
    pub async fn get_text(&self, url: &str) -> SourceResult<String> {
        let response = self
            .get(url, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .await?;
        let text = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(text)
    }

    /// Fetch and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let body = self.get(url, "application/json").await?;
        let bytes = body.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        let decoded = serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok(decoded)
    }

    /// Fetch raw bytes, keeping the content type for format sniffing.
    pub async fn get_document(&self, url: &str) -> SourceResult<Downloaded> {
        let response = self.get(url, "*/*").await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(Downloaded {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
