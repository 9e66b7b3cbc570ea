use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::events::EventSink;
use super::traits::{Extractor, ExtractorContext, ExtractorType, MediaInfo, MediaType};
use crate::fetch::Fetcher;

static PATTERNS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    vec![
        Regex::new(r"^https?://(www\.)?streamable\.com/[a-zA-Z0-9]+/?([?#].*)?$").unwrap(),
        Regex::new(r"^https?://(www\.)?streamable\.com/[eo]/[a-zA-Z0-9]+").unwrap(),
    ]
});

/// Video status reported by the API once encoding has finished.
const STATUS_READY: u8 = 2;

/// File variants in preference order.
const FILE_VARIANTS: &[&str] = &["mp4", "mp4-mobile"];

pub struct StreamableExtractor {
    fetcher: Fetcher,
    api_base: String,
}

impl StreamableExtractor {
    #[must_use]
    pub fn new(fetcher: Fetcher, api_base: &str) -> Self {
        Self {
            fetcher,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    status: u8,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    files: BTreeMap<String, VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    size: Option<u64>,
}

impl ExtractorType for StreamableExtractor {
    const ID: &'static str = "streamable";

    fn url_patterns() -> &'static [Regex] {
        &PATTERNS
    }

    fn build(context: &ExtractorContext) -> Self {
        Self::new(context.fetcher.clone(), &context.config.streamable_api_base)
    }
}

#[async_trait]
impl Extractor for StreamableExtractor {
    fn extractor_id(&self) -> &'static str {
        Self::ID
    }

    async fn extract(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>> {
        let result = self.fetch_media(url, events).await;
        events.finish(result)
    }
}

impl StreamableExtractor {
    async fn fetch_media(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>> {
        let video_id = extract_video_id(url).context("Streamable URL has no video id")?;
        debug!(video_id = %video_id, "Extracted Streamable video ID");
        events.progress(0.1, Some("fetching video metadata"));

        let api_url = format!("{}/videos/{}", self.api_base, video_id);
        let video: VideoResponse = self
            .fetcher
            .fetch_json_as(&api_url)
            .await
            .context("Failed to fetch Streamable video metadata")?;
        events.progress(0.7, Some("parsing video metadata"));

        if video.status != STATUS_READY {
            bail!(
                "Streamable video {video_id} is not ready (status {}){}",
                video.status,
                video
                    .message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            );
        }

        let thumbnail = video.thumbnail_url.as_deref().map(absolutize);
        let media: Vec<MediaInfo> = FILE_VARIANTS
            .iter()
            .filter_map(|variant| video.files.get(*variant).map(|file| (*variant, file)))
            .filter_map(|(variant, file)| {
                let file_url = file.url.as_deref()?;
                let mut info = MediaInfo::new(url.as_str(), MediaType::Video, absolutize(file_url));
                info.title.clone_from(&video.title);
                info.thumbnail.clone_from(&thumbnail);
                info.duration_secs = file.duration;
                info.attributes
                    .insert("variant".to_string(), variant.to_string());
                if let (Some(w), Some(h)) = (file.width, file.height) {
                    info.attributes.insert("width".to_string(), w.to_string());
                    info.attributes.insert("height".to_string(), h.to_string());
                }
                if let Some(size) = file.size {
                    info.attributes.insert("size".to_string(), size.to_string());
                }
                Some(info)
            })
            .collect();

        if media.is_empty() {
            bail!("Streamable video {video_id} has no downloadable files");
        }

        events.progress(1.0, None);
        Ok(media)
    }
}

/// Streamable returns protocol-relative CDN links.
fn absolutize(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

/// Extract video ID from a Streamable URL.
///
/// Accepts `https://streamable.com/{id}` and the embed forms `/e/{id}`, `/o/{id}`.
#[must_use]
pub fn extract_video_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let id = match segments.as_slice() {
        [id] | ["e" | "o", id] => *id,
        _ => return None,
    };
    if id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}
