//! Progress and completion notifications emitted during extraction.

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

use super::traits::MediaInfo;

/// Intermediate progress of an extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub extractor: &'static str,
    pub url: String,
    /// Fraction of work done, in `0.0..=1.0`.
    pub fraction: f64,
    pub message: Option<String>,
}

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { media_count: usize },
    Failed { reason: String },
}

/// Final notification of an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEvent {
    pub extractor: &'static str,
    pub url: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorEvent {
    Progress(ProgressEvent),
    Completed(CompletedEvent),
}

impl ExtractorEvent {
    /// Id of the extractor that emitted this event.
    #[must_use]
    pub fn extractor(&self) -> &'static str {
        match self {
            Self::Progress(e) => e.extractor,
            Self::Completed(e) => e.extractor,
        }
    }

    /// URL the emitting extraction is working on.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Progress(e) => &e.url,
            Self::Completed(e) => &e.url,
        }
    }
}

/// Emission handle given to an extractor for a single extraction.
///
/// Events are tagged with the extractor id and URL. A detached sink drops
/// everything; sends to a closed channel are ignored.
#[derive(Debug, Clone)]
pub struct EventSink {
    extractor: &'static str,
    url: String,
    tx: Option<UnboundedSender<ExtractorEvent>>,
}

impl EventSink {
    #[must_use]
    pub fn new(extractor: &'static str, url: &str, tx: UnboundedSender<ExtractorEvent>) -> Self {
        Self {
            extractor,
            url: url.to_string(),
            tx: Some(tx),
        }
    }

    /// A sink that discards every event.
    #[must_use]
    pub fn detached(extractor: &'static str, url: &str) -> Self {
        Self {
            extractor,
            url: url.to_string(),
            tx: None,
        }
    }

    /// Report progress. `fraction` is clamped to `0.0..=1.0`.
    pub fn progress(&self, fraction: f64, message: Option<&str>) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.emit(ExtractorEvent::Progress(ProgressEvent {
            extractor: self.extractor,
            url: self.url.clone(),
            fraction,
            message: message.map(str::to_string),
        }));
    }

    /// Report that the extraction has ended.
    pub fn completed(&self, outcome: Outcome) {
        self.emit(ExtractorEvent::Completed(CompletedEvent {
            extractor: self.extractor,
            url: self.url.clone(),
            outcome,
        }));
    }

    /// Emit the completion matching `result` and hand the result back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `result`'s error, if any.
    pub fn finish(&self, result: Result<Vec<MediaInfo>>) -> Result<Vec<MediaInfo>> {
        let outcome = match &result {
            Ok(media) => Outcome::Succeeded {
                media_count: media.len(),
            },
            Err(e) => Outcome::Failed {
                reason: format!("{e:#}"),
            },
        };
        self.completed(outcome);
        result
    }

    fn emit(&self, event: ExtractorEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::extractors::traits::MediaType;

    #[test]
    fn test_progress_is_clamped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new("test", "https://example.com/", tx);

        sink.progress(1.5, None);
        sink.progress(-0.2, Some("starting"));
        sink.progress(f64::NAN, None);

        let fractions: Vec<f64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                ExtractorEvent::Progress(p) => p.fraction,
                ExtractorEvent::Completed(_) => panic!("unexpected completion"),
            })
            .collect();
        assert_eq!(fractions, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_finish_success_reports_count() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new("test", "https://example.com/a", tx);

        let media = vec![
            MediaInfo::new("https://example.com/a", MediaType::Image, "https://example.com/a.png"),
            MediaInfo::new("https://example.com/a", MediaType::Image, "https://example.com/b.png"),
        ];
        let result = sink.finish(Ok(media.clone())).unwrap();
        assert_eq!(result, media);

        assert_eq!(
            rx.try_recv().unwrap(),
            ExtractorEvent::Completed(CompletedEvent {
                extractor: "test",
                url: "https://example.com/a".to_string(),
                outcome: Outcome::Succeeded { media_count: 2 },
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_finish_failure_passes_error_through() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new("test", "https://example.com/a", tx);

        let err = sink
            .finish(Err(anyhow::anyhow!("page layout changed")))
            .unwrap_err();
        assert_eq!(err.to_string(), "page layout changed");

        match rx.try_recv().unwrap() {
            ExtractorEvent::Completed(c) => {
                assert_eq!(
                    c.outcome,
                    Outcome::Failed {
                        reason: "page layout changed".to_string()
                    }
                );
            }
            ExtractorEvent::Progress(_) => panic!("expected completion"),
        }
    }

    #[test]
    fn test_detached_and_closed_sinks_do_not_panic() {
        let sink = EventSink::detached("test", "https://example.com/");
        sink.progress(0.5, None);
        sink.completed(Outcome::Succeeded { media_count: 0 });

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = EventSink::new("test", "https://example.com/", tx);
        sink.progress(0.5, None);
    }
}
