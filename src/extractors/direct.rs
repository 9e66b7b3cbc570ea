use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::events::EventSink;
use super::traits::{Extractor, ExtractorContext, ExtractorType, MediaInfo, MediaType};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mkv", "mov", "avi", "m3u8"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "ogg", "oga", "opus", "flac", "wav"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

static PATTERNS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    vec![Regex::new(
        r"(?i)^https?://[^/?#\s]+/[^?#\s]*\.(mp4|m4v|webm|mkv|mov|avi|m3u8|mp3|m4a|aac|ogg|oga|opus|flac|wav|jpe?g|png|gif|webp|avif)([?#].*)?$",
    )
    .unwrap()]
});

/// Links that point straight at a media file. Needs no network access.
pub struct DirectExtractor;

impl DirectExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for DirectExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorType for DirectExtractor {
    const ID: &'static str = "direct";

    fn url_patterns() -> &'static [Regex] {
        &PATTERNS
    }

    fn build(_context: &ExtractorContext) -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for DirectExtractor {
    fn extractor_id(&self) -> &'static str {
        Self::ID
    }

    async fn extract(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>> {
        events.finish(describe(url).map(|media| vec![media]))
    }
}

fn describe(url: &Url) -> Result<MediaInfo> {
    let (file_name, extension) = file_name_and_extension(url)
        .with_context(|| format!("URL has no file extension: {url}"))?;

    let media_type = media_type_for(&extension);
    let mut media = MediaInfo::new(url.as_str(), media_type, url.as_str());
    media.title = Some(file_name);
    media.attributes.insert("format".to_string(), extension);
    if media_type == MediaType::Image {
        media.thumbnail = Some(url.to_string());
    }
    Ok(media)
}

/// Last path segment and its lowercased extension.
fn file_name_and_extension(url: &Url) -> Option<(String, String)> {
    let segment = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    let ext = ext.to_lowercase();
    Some((name, ext))
}

/// Classify a lowercased file extension.
#[must_use]
pub fn media_type_for(extension: &str) -> MediaType {
    if VIDEO_EXTENSIONS.contains(&extension) {
        MediaType::Video
    } else if AUDIO_EXTENSIONS.contains(&extension) {
        MediaType::Audio
    } else if IMAGE_EXTENSIONS.contains(&extension) {
        MediaType::Image
    } else {
        MediaType::Other
    }
}
