//! Access workflow configuration.
//!
//! Values come from `FLEETDESK_*` environment variables (a `.env` file is
//! loaded by the binary before calling [`AccessConfig::from_env`]), with
//! defaults suitable for a local backend.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FLEETDESK_API_URL` | `http://localhost:5000` |
//! | `FLEETDESK_REQUEST_TIMEOUT_SECS` | `10` |
//! | `FLEETDESK_TICK_INTERVAL_MS` | `1000` |
//! | `FLEETDESK_POLL_INTERVAL_SECS` | unset (no polling) |
//! | `FLEETDESK_ACTIVE_SELECTION` | `first-listed` |
//! | `FLEETDESK_SESSION_FILE` | `.fleetdesk/session.json` |

use crate::error::AccessError;
use crate::evaluator::ActiveSelection;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: `{value}`")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for AccessError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Settings for the access client and workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Backend base URL, without a trailing slash
    pub api_base_url: String,

    /// Timeout applied to every backend call.
    ///
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// Countdown refresh period.
    ///
    /// Default: 1 second
    pub tick_interval: Duration,

    /// Background refresh period, `None` to refresh only on demand.
    pub poll_interval: Option<Duration>,

    /// Which active grant the countdown follows.
    pub active_selection: ActiveSelection,

    /// Where the persisted session lives.
    pub session_file: PathBuf,
}

impl AccessConfig {
    /// Create a configuration pointing at `api_base_url`.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the result fails
    /// [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("FLEETDESK_API_URL") {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "FLEETDESK_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "FLEETDESK_TICK_INTERVAL_MS")? {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "FLEETDESK_POLL_INTERVAL_SECS")? {
            config.poll_interval = Some(Duration::from_secs(secs));
        }
        if let Some(selection) = parse_var::<ActiveSelection, _>(&lookup, "FLEETDESK_ACTIVE_SELECTION")? {
            config.active_selection = selection;
        }
        if let Some(path) = lookup("FLEETDESK_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for a blank or non-http URL or
    /// a zero duration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.is_empty() {
            return Err(ConfigError::ValidationError("api_base_url is empty".to_string()));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api_base_url must start with http:// or https://, got `{}`",
                self.api_base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError("request_timeout must be > 0".to_string()));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ValidationError("tick_interval must be > 0".to_string()));
        }
        if self.poll_interval.is_some_and(|p| p.is_zero()) {
            return Err(ConfigError::ValidationError("poll_interval must be > 0".to_string()));
        }
        Ok(())
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the countdown refresh period.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Enable background polling.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Choose which active grant the countdown follows.
    #[must_use]
    pub const fn with_active_selection(mut self, selection: ActiveSelection) -> Self {
        self.active_selection = selection;
        self
    }

    /// Set the session file location.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout: Duration::from_secs(10),
            tick_interval: Duration::from_secs(1),
            poll_interval: None,
            active_selection: ActiveSelection::FirstListed,
            session_file: PathBuf::from(".fleetdesk/session.json"),
        }
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = AccessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AccessConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, None);
    }

    #[test]
    fn reads_every_variable() {
        let config = AccessConfig::from_lookup(lookup(&[
            ("FLEETDESK_API_URL", "https://fleet.example.com/"),
            ("FLEETDESK_REQUEST_TIMEOUT_SECS", "3"),
            ("FLEETDESK_TICK_INTERVAL_MS", "250"),
            ("FLEETDESK_POLL_INTERVAL_SECS", "30"),
            ("FLEETDESK_ACTIVE_SELECTION", "soonest-expiring"),
            ("FLEETDESK_SESSION_FILE", "/tmp/session.json"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://fleet.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.active_selection, ActiveSelection::SoonestExpiring);
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
    }

    #[test]
    fn malformed_number_is_reported() {
        let err = AccessConfig::from_lookup(lookup(&[("FLEETDESK_TICK_INTERVAL_MS", "fast")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "FLEETDESK_TICK_INTERVAL_MS",
                value: "fast".to_string()
            }
        );
    }

    #[test]
    fn unknown_selection_is_reported_and_blank_is_default() {
        let err = AccessConfig::from_lookup(lookup(&[("FLEETDESK_ACTIVE_SELECTION", "newest")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "FLEETDESK_ACTIVE_SELECTION", .. }));

        let config =
            AccessConfig::from_lookup(lookup(&[("FLEETDESK_ACTIVE_SELECTION", "  ")])).unwrap();
        assert_eq!(config.active_selection, ActiveSelection::FirstListed);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(AccessConfig::new("ftp://fleet").validate().is_err());
        assert!(AccessConfig::default().with_request_timeout(Duration::ZERO).validate().is_err());
        assert!(AccessConfig::default().with_poll_interval(Duration::ZERO).validate().is_err());
        assert!(AccessConfig::from_lookup(lookup(&[("FLEETDESK_API_URL", "")])).is_err());
    }

    #[test]
    fn converts_into_access_error() {
        let err: AccessError = ConfigError::ValidationError("x".to_string()).into();
        assert!(matches!(err, AccessError::InvalidConfig(_)));
    }
}
