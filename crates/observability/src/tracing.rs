//! Tracing/logging initialization.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to the host application (or a test/bench harness).

use tracing_subscriber::EnvFilter;

/// Filter variable checked before `RUST_LOG`.
pub const FILTER_ENV: &str = "BOUNCER_LOG";

/// Output format variable: `json` (default) or `pretty`.
pub const FORMAT_ENV: &str = "BOUNCER_LOG_FORMAT";

/// Default filter: decision outcomes from bouncer, warnings from everything else.
pub const DEFAULT_FILTER: &str = "warn,bouncer=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Parse a format name; anything unrecognised falls back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Build the filter from `BOUNCER_LOG`, then `RUST_LOG`, then the default.
pub fn filter_from(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    lookup(FILTER_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Entry point for applications embedding a `Bouncer`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let lookup = |key: &str| std::env::var(key).ok();
    let format = lookup(FORMAT_ENV)
        .map(|raw| LogFormat::parse(&raw))
        .unwrap_or(LogFormat::Json);
    init_with(filter_from(lookup), format);
}

pub fn init_with(filter: EnvFilter, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

/// Initialize human-readable logging captured by the test harness.
///
/// Safe to call from every test.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
