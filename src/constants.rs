//! Shared constants used across the crate.

/// User agent string sent with every fetch.
///
/// Many media sites serve reduced or empty pages to unknown clients, so this
/// mirrors a current desktop browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default root of the Streamable public API.
pub const STREAMABLE_API_BASE: &str = "https://api.streamable.com";
