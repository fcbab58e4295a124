//! Harness configuration.
//!
//! Timeouts are expressed in seconds because step definitions think in
//! seconds ("find within 10 s"); every actor stretches them by its own
//! multiplier. A YAML file can override the defaults and two environment
//! variables override the file, so a slow CI runner can be tuned without
//! editing anything:
//!
//! ```yaml
//! find_timeout_secs: 10
//! short_find_timeout_secs: 2
//! poll_interval_ms: 100
//! default_find_timeout_multiplier: 1.0
//! match_policy: strict
//! actors:
//!   user0: 2.5
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor::Actor;
use crate::locator::MatchPolicy;
use crate::result::{HarnessError, HarnessResult};

/// Environment override for the default find timeout multiplier
pub const ENV_FIND_TIMEOUT_MULTIPLIER: &str = "ACCEPTANCE_FIND_TIMEOUT_MULTIPLIER";

/// Environment override for the poll interval in milliseconds
pub const ENV_POLL_INTERVAL_MS: &str = "ACCEPTANCE_POLL_INTERVAL_MS";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base timeout for lookups of content that may take a while to appear
    pub find_timeout_secs: f64,
    /// Base timeout for lookups right after the action that reveals them
    pub short_find_timeout_secs: f64,
    /// Interval between polls, sub-second
    pub poll_interval_ms: u64,
    /// Multiplier for actors without an override
    pub default_find_timeout_multiplier: f64,
    /// Per-actor multiplier overrides
    pub actors: BTreeMap<String, f64>,
    /// Ambiguity policy applied by the step catalogue
    pub match_policy: MatchPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            find_timeout_secs: 10.0,
            short_find_timeout_secs: 2.0,
            poll_interval_ms: 100,
            default_find_timeout_multiplier: 1.0,
            actors: BTreeMap::new(),
            match_policy: MatchPolicy::Strict,
        }
    }
}

impl HarnessConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the long find timeout
    #[must_use]
    pub const fn with_find_timeout_secs(mut self, secs: f64) -> Self {
        self.find_timeout_secs = secs;
        self
    }

    /// Set the short find timeout
    #[must_use]
    pub const fn with_short_find_timeout_secs(mut self, secs: f64) -> Self {
        self.short_find_timeout_secs = secs;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the multiplier for actors without an override
    #[must_use]
    pub const fn with_default_multiplier(mut self, multiplier: f64) -> Self {
        self.default_find_timeout_multiplier = multiplier;
        self
    }

    /// Override the multiplier of one actor
    #[must_use]
    pub fn with_actor_multiplier(mut self, name: impl Into<String>, multiplier: f64) -> Self {
        let _ = self.actors.insert(name.into(), multiplier);
        self
    }

    /// Set the ambiguity policy
    #[must_use]
    pub const fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading harness config");
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply environment overrides, then validate
    pub fn apply_env(self) -> HarnessResult<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FIND_TIMEOUT_MULTIPLIER) {
            self.default_find_timeout_multiplier =
                raw.trim().parse().map_err(|_| HarnessError::Config {
                    message: format!("{ENV_FIND_TIMEOUT_MULTIPLIER} is not a number: {raw}"),
                })?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| HarnessError::Config {
                message: format!("{ENV_POLL_INTERVAL_MS} is not an integer: {raw}"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values no wait could honour
    pub fn validate(&self) -> HarnessResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(HarnessError::Config {
                    message: format!("{name} must be a positive number, got {value}"),
                })
            }
        };
        positive("find_timeout_secs", self.find_timeout_secs)?;
        positive("short_find_timeout_secs", self.short_find_timeout_secs)?;
        positive(
            "default_find_timeout_multiplier",
            self.default_find_timeout_multiplier,
        )?;
        for (name, multiplier) in &self.actors {
            positive(&format!("multiplier of actor {name}"), *multiplier)?;
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= 1000 {
            return Err(HarnessError::Config {
                message: format!(
                    "poll_interval_ms must be between 1 and 999, got {}",
                    self.poll_interval_ms
                ),
            });
        }
        Ok(())
    }

    /// Poll interval as a Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Multiplier for the actor called `name`
    #[must_use]
    pub fn multiplier_for(&self, name: &str) -> f64 {
        self.actors
            .get(name)
            .copied()
            .unwrap_or(self.default_find_timeout_multiplier)
    }

    /// Build the actor called `name` with its configured multiplier
    #[must_use]
    pub fn actor(&self, name: &str) -> Actor {
        Actor::new(name).with_find_timeout_multiplier(self.multiplier_for(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = HarnessConfig::default();
            assert!((config.find_timeout_secs - 10.0).abs() < f64::EPSILON);
            assert!((config.short_find_timeout_secs - 2.0).abs() < f64::EPSILON);
            assert_eq!(config.poll_interval(), Duration::from_millis(100));
            assert_eq!(config.match_policy, MatchPolicy::Strict);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_actor_multiplier_override() {
            let config = HarnessConfig::new()
                .with_default_multiplier(1.5)
                .with_actor_multiplier("user0", 3.0);
            assert!((config.actor("user0").find_timeout_multiplier() - 3.0).abs() < f64::EPSILON);
            assert!((config.actor("admin").find_timeout_multiplier() - 1.5).abs() < f64::EPSILON);
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_poll_interval_bounds() {
            assert!(HarnessConfig::new().with_poll_interval_ms(0).validate().is_err());
            assert!(HarnessConfig::new().with_poll_interval_ms(1000).validate().is_err());
            assert!(HarnessConfig::new().with_poll_interval_ms(999).validate().is_ok());
        }

        #[test]
        fn test_non_positive_values_rejected() {
            assert!(HarnessConfig::new().with_find_timeout_secs(0.0).validate().is_err());
            assert!(HarnessConfig::new()
                .with_short_find_timeout_secs(f64::NAN)
                .validate()
                .is_err());
            assert!(HarnessConfig::new()
                .with_actor_multiplier("slow", -1.0)
                .validate()
                .is_err());
        }
    }

    mod loading_tests {
        use super::*;

        #[test]
        fn test_from_yaml_partial_document() {
            let config = HarnessConfig::from_yaml_str(
                "poll_interval_ms: 50\nmatch_policy: first\nactors:\n  user0: 2.5\n",
            )
            .unwrap();
            assert_eq!(config.poll_interval_ms, 50);
            assert_eq!(config.match_policy, MatchPolicy::First);
            assert!((config.multiplier_for("user0") - 2.5).abs() < f64::EPSILON);
            assert!((config.find_timeout_secs - 10.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_invalid_yaml_is_error() {
            assert!(matches!(
                HarnessConfig::from_yaml_str("poll_interval_ms: [1, 2]"),
                Err(HarnessError::Yaml(_))
            ));
            assert!(matches!(
                HarnessConfig::from_yaml_str("poll_interval_ms: 5000"),
                Err(HarnessError::Config { .. })
            ));
        }

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "find_timeout_secs: 20").unwrap();
            let config = HarnessConfig::load(file.path()).unwrap();
            assert!((config.find_timeout_secs - 20.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_load_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            assert!(matches!(
                HarnessConfig::load(dir.path().join("missing.yaml")),
                Err(HarnessError::Io(_))
            ));
        }
    }

    mod override_tests {
        use super::*;

        fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |name| map.get(name).cloned()
        }

        #[test]
        fn test_overrides_applied() {
            let config = HarnessConfig::new()
                .apply_overrides(env(&[
                    (ENV_FIND_TIMEOUT_MULTIPLIER, "4"),
                    (ENV_POLL_INTERVAL_MS, " 25 "),
                ]))
                .unwrap();
            assert!((config.default_find_timeout_multiplier - 4.0).abs() < f64::EPSILON);
            assert_eq!(config.poll_interval_ms, 25);
        }

        #[test]
        fn test_override_must_parse_and_validate() {
            assert!(HarnessConfig::new()
                .apply_overrides(env(&[(ENV_FIND_TIMEOUT_MULTIPLIER, "fast")]))
                .is_err());
            assert!(HarnessConfig::new()
                .apply_overrides(env(&[(ENV_POLL_INTERVAL_MS, "2000")]))
                .is_err());
        }

        #[test]
        fn test_no_overrides_keeps_values() {
            let config = HarnessConfig::new().apply_overrides(env(&[])).unwrap();
            assert_eq!(config, HarnessConfig::default());
        }
    }
}
