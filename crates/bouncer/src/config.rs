//! Decision configuration.

use std::time::Duration;

use bouncer_core::{BouncerError, BouncerResult};

/// Environment variable holding the default decision timeout in milliseconds.
pub const TIMEOUT_ENV: &str = "BOUNCER_TIMEOUT_MS";

/// Default decision timeout when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BouncerConfig {
    /// Deadline applied to each new decision.
    pub default_timeout: Duration,
}

impl Default for BouncerConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BouncerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Load from the process environment (`BOUNCER_TIMEOUT_MS`).
    pub fn from_env() -> BouncerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> BouncerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let ms: f64 = raw.trim().parse().map_err(|_| {
                BouncerError::invalid_argument(format!("{TIMEOUT_ENV} must be a number, got '{raw}'"))
            })?;
            config.default_timeout = timeout_from_millis(ms)?;
        }

        Ok(config)
    }
}

/// Convert a millisecond count into a timeout.
///
/// Rejects NaN, infinities, negative values and anything too large for a
/// `Duration`.
pub fn timeout_from_millis(ms: f64) -> BouncerResult<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(BouncerError::invalid_argument(format!(
            "timeout must be a non-negative number of milliseconds, got {ms}"
        )));
    }

    Duration::try_from_secs_f64(ms / 1000.0)
        .map_err(|e| BouncerError::invalid_argument(format!("timeout out of range: {e}")))
}
