//! Tracing subscriber setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - scenario progress
    #[default]
    Normal,
    /// Verbose - actor switches and scope changes
    Verbose,
    /// Debug - every resolution and poll
    Debug,
}

impl Verbosity {
    /// Default filter directive for this level
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "acceptance_kit=debug,info",
            Self::Debug => "debug",
        }
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

/// Install a global `fmt` subscriber writing to stderr.
///
/// Meant for runner binaries. `RUST_LOG` takes precedence over `verbosity`.
/// Returns `false` when a subscriber was already installed, which is not an
/// error.
pub fn init_logging(verbosity: Verbosity) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Install a global `fmt` subscriber whose output the test harness captures.
///
/// Same filtering and return value as [`init_logging`]; every test binary
/// may call this.
pub fn init_test_logging(verbosity: Verbosity) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(false)
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}
