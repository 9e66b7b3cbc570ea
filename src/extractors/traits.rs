use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::events::EventSink;
use crate::config::Config;
use crate::fetch::Fetcher;

/// Broad category of an extracted media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Other,
}

/// A single media item found at a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// The page or resource the item was extracted from.
    pub source_url: String,
    /// Kind of media (video, audio, image).
    pub media_type: MediaType,
    /// Direct location of the media file.
    pub real_url: String,
    /// Title of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Short description of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL of a preview image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Playback length, for audio and video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Extractor-specific details (resolution, format, size).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl MediaInfo {
    /// Create a media item with only the required fields set.
    #[must_use]
    pub fn new(source_url: &str, media_type: MediaType, real_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.to_string(),
            media_type,
            real_url: real_url.into(),
            title: None,
            description: None,
            thumbnail: None,
            duration_secs: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Shared state handed to extractors when they are built.
#[derive(Debug, Clone)]
pub struct ExtractorContext {
    pub fetcher: Fetcher,
    pub config: Arc<Config>,
}

impl ExtractorContext {
    /// Build a context with a fetcher configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            fetcher,
            config: Arc::new(config),
        })
    }
}

/// An extractor instance, built for one dispatch and dropped afterwards.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Id of the kind this instance was built from.
    fn extractor_id(&self) -> &'static str;

    /// Extract media from a URL this extractor's kind matched.
    ///
    /// Implementations report progress through `events` and emit exactly one
    /// completion, usually via [`EventSink::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if fetching or parsing fails.
    async fn extract(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>>;
}

/// The static side of an extractor: how to recognize its URLs and how to
/// build an instance.
///
/// Matching lives here rather than on [`Extractor`] so that testing a URL
/// never requires building an instance.
pub trait ExtractorType: Extractor + Sized + 'static {
    /// Unique identifier for this extractor.
    const ID: &'static str;

    /// URL patterns this extractor handles.
    fn url_patterns() -> &'static [Regex];

    /// Check if this extractor can handle the given URL. Must not perform I/O.
    fn matches(url: &str) -> bool {
        Self::url_patterns().iter().any(|p| p.is_match(url))
    }

    /// Build a fresh instance.
    fn build(context: &ExtractorContext) -> Self;
}
