use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};
use url::Url;

use super::events::{EventSink, ExtractorEvent};
use super::traits::{Extractor, ExtractorContext, ExtractorType, MediaInfo};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no registered extractor supports {url}")]
    NoSupportedExtractor { url: String },
    /// The selected extractor failed. Display and source are the extractor's own.
    #[error(transparent)]
    ExtractionFailed(anyhow::Error),
}

impl DispatchError {
    /// True when no extractor could handle the URL, as opposed to one failing.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::NoSupportedExtractor { .. })
    }
}

/// Registration entry for one class of extractor.
///
/// Holds a pure match predicate and a constructor, so selecting a kind never
/// builds instances of the kinds that lose.
#[derive(Clone, Copy)]
pub struct ExtractorKind {
    id: &'static str,
    matches: fn(&str) -> bool,
    create: fn(&ExtractorContext) -> Box<dyn Extractor>,
}

impl ExtractorKind {
    /// Build a kind from explicit parts.
    #[must_use]
    pub const fn new(
        id: &'static str,
        matches: fn(&str) -> bool,
        create: fn(&ExtractorContext) -> Box<dyn Extractor>,
    ) -> Self {
        Self {
            id,
            matches,
            create,
        }
    }

    /// The kind for extractor type `T`.
    #[must_use]
    pub fn of<T: ExtractorType>() -> Self {
        Self::new(T::ID, T::matches, create_boxed::<T>)
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Check if this kind handles `url`.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        (self.matches)(url)
    }

    fn instantiate(&self, context: &ExtractorContext) -> Box<dyn Extractor> {
        (self.create)(context)
    }
}

impl fmt::Debug for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorKind").field("id", &self.id).finish()
    }
}

fn create_boxed<T: ExtractorType>(context: &ExtractorContext) -> Box<dyn Extractor> {
    Box::new(T::build(context))
}

/// Ordered set of extractor kinds with URL-based dispatch.
///
/// Registration order is match priority: the first kind whose predicate
/// accepts a URL handles it. The kind list is fixed at construction, so a
/// registry can serve concurrent dispatches through a shared reference.
#[derive(Debug)]
pub struct ExtractorRegistry {
    kinds: Vec<ExtractorKind>,
    context: ExtractorContext,
}

impl ExtractorRegistry {
    /// Create a registry from kinds in priority order.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = ExtractorKind>, context: ExtractorContext) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            context,
        }
    }

    /// Get all registered kinds, in priority order.
    #[must_use]
    pub fn kinds(&self) -> &[ExtractorKind] {
        &self.kinds
    }

    /// Check whether any registered kind handles `url`.
    #[must_use]
    pub fn is_supported(&self, url: &str) -> bool {
        self.find_kind(url).is_some()
    }

    /// Find the highest-priority kind for `url`.
    #[must_use]
    pub fn find_kind(&self, url: &str) -> Option<&ExtractorKind> {
        self.kinds.iter().find(|k| k.matches(url))
    }

    /// Find the highest-priority kind for a parsed URL.
    ///
    /// Matches against the normalized form, so scheme and host case do not
    /// matter. This is the lookup dispatch uses.
    #[must_use]
    pub fn kind_for(&self, url: &Url) -> Option<&ExtractorKind> {
        self.find_kind(url.as_str())
    }

    /// Extract media from `url`, discarding progress events.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoSupportedExtractor`] if no kind matches, or
    /// [`DispatchError::ExtractionFailed`] with the extractor's error.
    pub async fn dispatch(&self, url: &Url) -> Result<Vec<MediaInfo>, DispatchError> {
        let extractor = self.select(url)?;
        let events = EventSink::detached(extractor.extractor_id(), url.as_str());
        Self::run(extractor, url, &events).await
    }

    /// Extract media from `url`, forwarding every event the extractor emits to
    /// `subscriber` in emission order.
    ///
    /// All events emitted before the extractor returns are delivered before
    /// this returns, including those emitted before a failure. The relay is
    /// private to this call and closes with it: events sent afterwards through
    /// a retained clone of the sink are dropped.
    ///
    /// # Errors
    ///
    /// Same as [`ExtractorRegistry::dispatch`].
    pub async fn dispatch_with_events(
        &self,
        url: &Url,
        subscriber: &UnboundedSender<ExtractorEvent>,
    ) -> Result<Vec<MediaInfo>, DispatchError> {
        let extractor = self.select(url)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventSink::new(extractor.extractor_id(), url.as_str(), tx);

        let extraction = Self::run(extractor, url, &events);
        tokio::pin!(extraction);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => {
                    let _ = subscriber.send(event);
                }
                result = &mut extraction => break result,
            }
        };

        // Whatever was queued before the extractor returned
        while let Ok(event) = rx.try_recv() {
            let _ = subscriber.send(event);
        }
        drop(rx);

        result
    }

    fn select(&self, url: &Url) -> Result<Box<dyn Extractor>, DispatchError> {
        let Some(kind) = self.kind_for(url) else {
            info!(url = %url, "No extractor supports URL");
            return Err(DispatchError::NoSupportedExtractor {
                url: url.to_string(),
            });
        };

        debug!(url = %url, extractor = kind.id(), "Selected extractor");
        Ok(kind.instantiate(&self.context))
    }

    async fn run(
        extractor: Box<dyn Extractor>,
        url: &Url,
        events: &EventSink,
    ) -> Result<Vec<MediaInfo>, DispatchError> {
        let id = extractor.extractor_id();
        let result = extractor.extract(url, events).await;
        drop(extractor);

        match result {
            Ok(media) => {
                debug!(url = %url, extractor = id, count = media.len(), "Extraction finished");
                Ok(media)
            }
            Err(e) => {
                warn!(url = %url, extractor = id, error = %format!("{e:#}"), "Extraction failed");
                Err(DispatchError::ExtractionFailed(e))
            }
        }
    }
}
