//! Media information extraction library.
//!
//! Given a URL, [`extractors::ExtractorRegistry`] selects the first registered
//! extractor whose pattern matches, runs it, and relays its progress and
//! completion events to the caller.

pub mod config;
pub mod constants;
pub mod extractors;
pub mod fetch;
