//! Registry timing configuration.
//!
//! Both values are plain durations supplied on the command line. A registry
//! refuses to start with a configuration that fails [`RegistryConfig::validate`].

use std::time::Duration;
use thiserror::Error;

/// Default entry staleness threshold.
pub const DEFAULT_TTL: Duration = Duration::from_millis(10_000);

/// Default cadence of the expiry scheduler.
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_millis(30_000);

/// Errors for configurations the registry cannot run with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ttl must be greater than zero")]
    ZeroTtl,
    #[error("sweep period must be greater than zero")]
    ZeroSweepPeriod,
    #[error("scan period must be greater than zero")]
    ZeroScanPeriod,
}

/// Timing parameters of a proximity registry.
///
/// Without new readings, an entry is gone at most `ttl + sweep_period` after
/// its last observation: it becomes stale after `ttl`, and the next periodic
/// sweep follows within `sweep_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum age of an entry before eviction
    pub ttl: Duration,
    /// Interval between periodic sweeps
    pub sweep_period: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_period: DEFAULT_SWEEP_PERIOD,
        }
    }
}

impl RegistryConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` for a zero TTL or zero sweep period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.sweep_period.is_zero() {
            return Err(ConfigError::ZeroSweepPeriod);
        }
        Ok(())
    }

    /// Upper bound on how long an unobserved entry can stay visible.
    pub fn staleness_bound(&self) -> Duration {
        self.ttl.saturating_add(self.sweep_period)
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use beacon_proximity::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
/// assert_eq!(parse_duration("1100ms").unwrap(), Duration::from_millis(1100));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();

    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    let parse = |num: &str, unit: &str| -> Result<u64, String> {
        num.trim()
            .parse()
            .map_err(|_| format!("invalid {unit}: {num}"))
    };

    if let Some(num) = src.strip_suffix("ms") {
        return Ok(Duration::from_millis(parse(num, "milliseconds")?));
    }
    if let Some(num) = src.strip_suffix('h') {
        return Ok(Duration::from_secs(parse(num, "hours")?.saturating_mul(3600)));
    }
    if let Some(num) = src.strip_suffix('m') {
        return Ok(Duration::from_secs(parse(num, "minutes")?.saturating_mul(60)));
    }
    if let Some(num) = src.strip_suffix('s') {
        return Ok(Duration::from_secs(parse(num, "seconds")?));
    }

    Ok(Duration::from_secs(parse(src, "duration")?))
}
