//! HTTP retrieval for extractors.
//!
//! Every extractor that needs network access goes through [`Fetcher`], which
//! owns a single pooled `reqwest` client configured with the crate's user
//! agent and timeouts. Fetches are single-shot: nothing is cached or retried.

use scraper::Html;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Charset used when the response does not declare one.
const DEFAULT_CHARSET: &str = "utf-8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid JSON from {url}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// HTTP status of the failed response, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status(),
            Self::Json { .. } => None,
        }
    }
}

/// Shared HTTP helper. Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (for example
    /// when the TLS backend fails to initialize).
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.http_timeout)
            .connect_timeout(config.http_connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        debug!(url = %url, "Fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    /// Fetch a URL and decode the body as text.
    ///
    /// The charset from `Content-Type` is honored; UTF-8 is assumed otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_text_with_charset(url, DEFAULT_CHARSET).await
    }

    /// Fetch a URL and decode the body as text, assuming `charset` (a WHATWG
    /// encoding label such as `"iso-8859-1"` or `"shift_jis"`) when the
    /// response does not declare one.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_text_with_charset(
        &self,
        url: &str,
        charset: &str,
    ) -> Result<String, FetchError> {
        self.get(url)
            .await?
            .text_with_charset(charset)
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })
    }

    /// Fetch a URL and parse it as an HTML document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_html(&self, url: &str) -> Result<Html, FetchError> {
        self.fetch_html_with_charset(url, DEFAULT_CHARSET).await
    }

    /// Like [`Fetcher::fetch_html`], with a fallback charset.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_html_with_charset(
        &self,
        url: &str,
        charset: &str,
    ) -> Result<Html, FetchError> {
        let body = self.fetch_text_with_charset(url, charset).await?;
        Ok(Html::parse_document(&body))
    }

    /// Fetch a URL and parse it as an untyped JSON tree.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a body
    /// that is not valid JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        self.fetch_json_as(url).await
    }

    /// Fetch a URL and deserialize the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a body
    /// that does not deserialize into `T`.
    pub async fn fetch_json_as<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch a URL and return the raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}
