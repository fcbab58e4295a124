//! Result and error types for acceptance-kit.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A `find` exceeded its timeout without a match
    #[error("{description} could not be found after {timeout_ms}ms")]
    ElementNotFound {
        /// Human-readable description of the locator
        description: String,
        /// Effective timeout in milliseconds
        timeout_ms: u64,
    },

    /// A wait predicate never became true
    #[error("Waiting for {description} timed out after {timeout_ms}ms")]
    WaitTimedOut {
        /// What was waited for
        description: String,
        /// Effective timeout in milliseconds
        timeout_ms: u64,
    },

    /// A strict locator matched more than one element
    #[error("{description} is ambiguous: {count} elements matched")]
    AmbiguousLocator {
        /// Human-readable description of the locator
        description: String,
        /// Number of matching elements
        count: usize,
    },

    /// Assertion failed (the test-failure signal)
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Failure message
        message: String,
    },

    /// The element behind a handle is no longer attached to the document
    #[error("{description} is no longer attached to the document")]
    StaleElement {
        /// Human-readable description of the locator
        description: String,
    },

    /// Selector expression cannot be built or evaluated
    #[error("Invalid selector: {message}")]
    InvalidSelector {
        /// Error message
        message: String,
    },

    /// Switching to an actor that was never registered
    #[error("Unknown actor: {name}")]
    UnknownActor {
        /// Actor name
        name: String,
    },

    /// A step needed the current actor before any actor was switched to
    #[error("No actor is currently active")]
    NoCurrentActor,

    /// The run-wide cancellation token fired
    #[error("Test run cancelled")]
    Cancelled,

    /// A step or the world factory panicked instead of returning an error
    #[error("Step panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Whether this error is a scenario-level test failure rather than a
    /// harness malfunction.
    #[must_use]
    pub const fn is_test_failure(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::WaitTimedOut { .. }
                | Self::AmbiguousLocator { .. }
                | Self::AssertionFailed { .. }
        )
    }

    /// Shorthand for an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }
}
