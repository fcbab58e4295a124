//! Actor identity.
//!
//! An actor is one simulated user driving its own browser session. Its name
//! is the key for per-actor state; its find timeout multiplier stretches
//! every timeout on slow environments without touching step logic.

use std::time::Duration;

/// Identity of one simulated user in a scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    name: String,
    find_timeout_multiplier: f64,
}

impl Actor {
    /// Create an actor with a multiplier of 1
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            find_timeout_multiplier: 1.0,
        }
    }

    /// Set the find timeout multiplier.
    ///
    /// Non-finite or non-positive values fall back to 1.
    #[must_use]
    pub fn with_find_timeout_multiplier(mut self, multiplier: f64) -> Self {
        self.find_timeout_multiplier = if multiplier.is_finite() && multiplier > 0.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    /// Unique name of the actor
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scale factor applied to every timeout of this actor
    #[must_use]
    pub const fn find_timeout_multiplier(&self) -> f64 {
        self.find_timeout_multiplier
    }

    /// `base` stretched by this actor's multiplier
    #[must_use]
    pub fn scaled(&self, base: Duration) -> Duration {
        Duration::try_from_secs_f64(base.as_secs_f64() * self.find_timeout_multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Timeout in seconds stretched by this actor's multiplier
    #[must_use]
    pub fn scaled_secs(&self, base_secs: f64) -> Duration {
        self.scaled(Duration::try_from_secs_f64(base_secs.max(0.0)).unwrap_or(Duration::MAX))
    }
}
