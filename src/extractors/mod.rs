mod events;
mod registry;
mod traits;

// Site extractors
pub mod direct;
pub mod opengraph;
pub mod streamable;

pub use events::{CompletedEvent, EventSink, ExtractorEvent, Outcome, ProgressEvent};
pub use registry::{DispatchError, ExtractorKind, ExtractorRegistry};
pub use traits::{Extractor, ExtractorContext, ExtractorType, MediaInfo, MediaType};

use anyhow::Result;

use crate::config::Config;

/// Built-in extractor kinds in default priority order.
///
/// Site-specific extractors come first; `opengraph` accepts any http(s) URL
/// and must stay last.
#[must_use]
pub fn builtin_kinds() -> Vec<ExtractorKind> {
    vec![
        ExtractorKind::of::<streamable::StreamableExtractor>(),
        ExtractorKind::of::<direct::DirectExtractor>(),
        ExtractorKind::of::<opengraph::OpenGraphExtractor>(),
    ]
}

/// Ids of all built-in extractors.
#[must_use]
pub fn builtin_ids() -> Vec<&'static str> {
    builtin_kinds().iter().map(ExtractorKind::id).collect()
}

impl ExtractorRegistry {
    /// Build the registry described by `config`.
    ///
    /// With `enabled_extractors` set, only those built-ins are registered, in
    /// the configured order.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed or an
    /// enabled id is unknown.
    pub fn from_config(config: Config) -> Result<Self> {
        let builtin = builtin_kinds();
        let kinds = match &config.enabled_extractors {
            None => builtin,
            Some(ids) => ids
                .iter()
                .map(|id| {
                    builtin
                        .iter()
                        .find(|k| k.id() == id.as_str())
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("unknown extractor '{id}'"))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let context = ExtractorContext::new(config)?;
        Ok(Self::new(kinds, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        assert_eq!(builtin_ids(), vec!["streamable", "direct", "opengraph"]);
    }

    #[test]
    fn test_from_config_all() {
        let registry = ExtractorRegistry::from_config(Config::for_testing()).unwrap();
        assert_eq!(registry.kinds().len(), 3);
        assert_eq!(
            registry.find_kind("https://streamable.com/abc123").map(ExtractorKind::id),
            Some("streamable")
        );
        assert_eq!(
            registry.find_kind("https://cdn.example.com/clip.mp4").map(ExtractorKind::id),
            Some("direct")
        );
        assert_eq!(
            registry.find_kind("https://example.com/watch/1").map(ExtractorKind::id),
            Some("opengraph")
        );
        assert!(!registry.is_supported("ftp://example.com/clip.mp4"));
    }

    #[test]
    fn test_kind_for_ignores_scheme_and_host_case() {
        let registry = ExtractorRegistry::from_config(Config::for_testing()).unwrap();
        let url = url::Url::parse("HTTPS://Streamable.com/abc123").unwrap();

        assert_eq!(registry.kind_for(&url).map(ExtractorKind::id), Some("streamable"));
        assert_eq!(url.as_str(), "https://streamable.com/abc123");
    }

    #[test]
    fn test_from_config_respects_enabled_order() {
        let config = Config {
            enabled_extractors: Some(vec!["opengraph".to_string(), "direct".to_string()]),
            ..Config::for_testing()
        };
        let registry = ExtractorRegistry::from_config(config).unwrap();

        let ids: Vec<_> = registry.kinds().iter().map(ExtractorKind::id).collect();
        assert_eq!(ids, vec!["opengraph", "direct"]);
        // opengraph now shadows direct
        assert_eq!(
            registry.find_kind("https://cdn.example.com/clip.mp4").map(ExtractorKind::id),
            Some("opengraph")
        );
        assert_eq!(
            registry.find_kind("https://streamable.com/abc123").map(ExtractorKind::id),
            Some("opengraph")
        );
    }

    #[test]
    fn test_from_config_unknown_id() {
        let config = Config {
            enabled_extractors: Some(vec!["vimeo".to_string()]),
            ..Config::for_testing()
        };
        assert!(ExtractorRegistry::from_config(config).is_err());
    }
}
