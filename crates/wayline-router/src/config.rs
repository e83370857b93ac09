//! Router configuration
//!
//! ```toml
//! completion_timeout_ms = 3000
//! slow_transition_warn_ms = 1000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{RouterError, RouterResult};

/// Default deadline for a handler to signal completion.
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 3_000;

/// Default threshold above which a completed transition is logged as slow.
pub const DEFAULT_SLOW_TRANSITION_WARN_MS: u64 = 1_000;

/// Navigation router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Deadline for each action's completion signal, in milliseconds.
    /// Exceeding it halts the router.
    pub completion_timeout_ms: u64,

    /// Transitions completing slower than this are logged as warnings.
    /// `None` disables the warning.
    pub slow_transition_warn_ms: Option<u64>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            slow_transition_warn_ms: Some(DEFAULT_SLOW_TRANSITION_WARN_MS),
        }
    }
}

impl RouterConfig {
    /// Start building a configuration from defaults.
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> RouterResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| RouterError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot run with.
    pub fn validate(&self) -> RouterResult<()> {
        if self.completion_timeout_ms == 0 {
            return Err(RouterError::config("completion_timeout_ms must be positive"));
        }
        if let Some(warn_ms) = self.slow_transition_warn_ms {
            if warn_ms >= self.completion_timeout_ms {
                return Err(RouterError::config(format!(
                    "slow_transition_warn_ms ({warn_ms}) must be below completion_timeout_ms ({})",
                    self.completion_timeout_ms
                )));
            }
        }
        Ok(())
    }

    /// Completion deadline as a [`Duration`].
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    /// Slow-transition threshold as a [`Duration`].
    pub fn slow_transition_threshold(&self) -> Option<Duration> {
        self.slow_transition_warn_ms.map(Duration::from_millis)
    }
}

/// Builder for [`RouterConfig`]
#[derive(Debug, Clone, Default)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl RouterConfigBuilder {
    /// Set the completion deadline.
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set or disable the slow-transition warning threshold.
    pub fn slow_transition_warning(mut self, threshold: Option<Duration>) -> Self {
        self.config.slow_transition_warn_ms =
            threshold.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> RouterResult<RouterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.completion_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_from_toml_fills_missing_fields() {
        let config = RouterConfig::from_toml_str("completion_timeout_ms = 5000").unwrap();
        assert_eq!(config.completion_timeout(), Duration::from_secs(5));
        assert_eq!(config.slow_transition_warn_ms, Some(DEFAULT_SLOW_TRANSITION_WARN_MS));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = RouterConfig::from_toml_str("completion_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_rejects_warning_above_timeout() {
        let result = RouterConfig::builder()
            .completion_timeout(Duration::from_millis(500))
            .slow_transition_warning(Some(Duration::from_secs(1)))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_without_warning() {
        let config = RouterConfig::builder()
            .completion_timeout(Duration::from_millis(500))
            .slow_transition_warning(None)
            .build()
            .unwrap();
        assert_eq!(config.completion_timeout_ms, 500);
        assert_eq!(config.slow_transition_threshold(), None);
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(RouterConfig::from_toml_str("completion_timeout_ms = \"soon\"").is_err());
    }
}
