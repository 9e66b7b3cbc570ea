//! Fallback extractor reading Open Graph media tags.
//!
//! Most media pages advertise their video, audio and image files through
//! `<meta property="og:*">` tags for social previews. This extractor fetches
//! the page and turns those tags into [`MediaInfo`] items, so it works on any
//! http(s) URL no site-specific extractor claimed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::events::EventSink;
use super::traits::{Extractor, ExtractorContext, ExtractorType, MediaInfo, MediaType};
use crate::fetch::Fetcher;

static PATTERNS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    vec![
        // Match any HTTP(S) URL as fallback
        Regex::new(r"^https?://").unwrap(),
    ]
});

pub struct OpenGraphExtractor {
    fetcher: Fetcher,
}

impl OpenGraphExtractor {
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

impl ExtractorType for OpenGraphExtractor {
    const ID: &'static str = "opengraph";

    fn url_patterns() -> &'static [Regex] {
        &PATTERNS
    }

    fn build(context: &ExtractorContext) -> Self {
        Self::new(context.fetcher.clone())
    }
}

#[async_trait]
impl Extractor for OpenGraphExtractor {
    fn extractor_id(&self) -> &'static str {
        Self::ID
    }

    async fn extract(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>> {
        let result = self.fetch_media(url, events).await;
        events.finish(result)
    }
}

impl OpenGraphExtractor {
    async fn fetch_media(&self, url: &Url, events: &EventSink) -> Result<Vec<MediaInfo>> {
        events.progress(0.1, Some("fetching page"));
        let body = self
            .fetcher
            .fetch_text(url.as_str())
            .await
            .context("Failed to fetch page")?;

        events.progress(0.6, Some("parsing page"));
        let media = media_from_html(&body, url)?;

        events.progress(1.0, None);
        Ok(media)
    }
}

/// One `og:video`, `og:audio` or `og:image` tag with its structured
/// properties (`:secure_url`, `:type`, `:width`, `:height`).
#[derive(Debug, Default, PartialEq, Eq)]
struct OgMedia {
    url: Option<String>,
    secure_url: Option<String>,
    mime_type: Option<String>,
    width: Option<String>,
    height: Option<String>,
}

impl OgMedia {
    fn link(&self) -> Option<&str> {
        self.secure_url.as_deref().or(self.url.as_deref())
    }
}

/// Open Graph tags relevant to media extraction.
#[derive(Debug, Default, PartialEq, Eq)]
struct PageTags {
    title: Option<String>,
    description: Option<String>,
    videos: Vec<OgMedia>,
    audios: Vec<OgMedia>,
    images: Vec<OgMedia>,
}

/// Record one `og:<kind>[:<field>]` property.
///
/// The root tag (or its `:url` alias) starts a new entry; other fields
/// describe the most recent one.
fn add_property(entries: &mut Vec<OgMedia>, field: &str, content: String) {
    if field == "url" || entries.is_empty() {
        entries.push(OgMedia::default());
    }
    let Some(current) = entries.last_mut() else {
        return;
    };
    match field {
        "url" => current.url = Some(content),
        "secure_url" => current.secure_url = Some(content),
        "type" => current.mime_type = Some(content),
        "width" => current.width = Some(content),
        "height" => current.height = Some(content),
        _ => {}
    }
}

fn read_tags(html: &str) -> Result<PageTags> {
    let document = Html::parse_document(html);

    let og_meta_selector = Selector::parse(r#"meta[property^="og:"]"#)
        .map_err(|e| anyhow::anyhow!("Failed to create selector: {e:?}"))?;
    let title_selector = Selector::parse("title")
        .map_err(|e| anyhow::anyhow!("Failed to create selector: {e:?}"))?;

    let mut tags = PageTags::default();

    for element in document.select(&og_meta_selector) {
        let Some(property) = element
            .value()
            .attr("property")
            .and_then(|p| p.strip_prefix("og:"))
        else {
            continue;
        };
        let Some(content) = element
            .value()
            .attr("content")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
        else {
            continue;
        };

        let (kind, field) = property.split_once(':').unwrap_or((property, "url"));
        match kind {
            "title" => tags.title = Some(content),
            "description" => tags.description = Some(content),
            "video" => add_property(&mut tags.videos, field, content),
            "audio" => add_property(&mut tags.audios, field, content),
            "image" => add_property(&mut tags.images, field, content),
            _ => {}
        }
    }

    if tags.title.is_none() {
        tags.title = document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());
    }

    Ok(tags)
}

/// Build media items from a page's Open Graph tags.
///
/// One item per distinct media tag: videos first, then audio, then images.
/// The first image doubles as every item's thumbnail. Relative links are
/// resolved against `page_url`.
fn media_from_html(html: &str, page_url: &Url) -> Result<Vec<MediaInfo>> {
    let tags = read_tags(html)?;

    let videos = resolve_unique(&tags.videos, page_url);
    let audios = resolve_unique(&tags.audios, page_url);
    let images = resolve_unique(&tags.images, page_url);
    let thumbnail = images.first().map(|(link, _)| link.clone());

    let mut media = Vec::new();
    for (media_type, entries) in [
        (MediaType::Video, videos),
        (MediaType::Audio, audios),
        (MediaType::Image, images),
    ] {
        for (link, entry) in entries {
            let mut item = MediaInfo::new(page_url.as_str(), media_type, link);
            item.title.clone_from(&tags.title);
            item.description.clone_from(&tags.description);
            item.thumbnail.clone_from(&thumbnail);
            if let Some(mime) = &entry.mime_type {
                item.attributes.insert("mime_type".to_string(), mime.clone());
            }
            if let (Some(w), Some(h)) = (&entry.width, &entry.height) {
                item.attributes.insert("width".to_string(), w.clone());
                item.attributes.insert("height".to_string(), h.clone());
            }
            media.push(item);
        }
    }

    Ok(media)
}

/// Resolve each entry's link, keeping the first entry for each distinct URL.
fn resolve_unique<'a>(entries: &'a [OgMedia], page_url: &Url) -> Vec<(String, &'a OgMedia)> {
    let mut resolved: Vec<(String, &OgMedia)> = Vec::new();
    for entry in entries {
        let Some(link) = entry.link().and_then(|l| page_url.join(l).ok()) else {
            continue;
        };
        let link = link.to_string();
        if !resolved.iter().any(|(seen, _)| *seen == link) {
            resolved.push((link, entry));
        }
    }
    resolved
}
