//! Wait Mechanisms
//!
//! Bounded "retry until the predicate holds or the deadline passes" polling
//! used to tolerate asynchronous UI rendering.
//!
//! Every wait is independent: `Polling -> Succeeded` when the predicate
//! holds in time, `Polling -> TimedOut` once the deadline is reached. A run
//! wide [`CancellationToken`] adds a third exit, `Cancelled`, for aborting a
//! whole test run; it is never needed by step logic.
//!
//! The engine only reports outcomes. Turning a timeout into a test failure
//! with a readable message is the caller's job (see
//! [`WaitOutcome::into_result`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{ActorSession, BrowserSession, Visibility};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Shortest sleep between two evaluations; shorter intervals are raised to it
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// =============================================================================
// CANCELLATION
// =============================================================================

/// Run-wide abort flag shared by every wait of a test run
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every wait observing this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancellationToken::cancel`] was called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Timeout of `base_secs` stretched by the actor's multiplier
    #[must_use]
    pub fn scaled_for(mut self, actor: &Actor, base_secs: f64) -> Self {
        self.timeout_ms = duration_to_ms(actor.scaled_secs(base_secs));
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// WAIT CONDITION TRAIT
// =============================================================================

/// Trait for custom wait conditions
pub trait WaitCondition {
    /// Check if the condition is satisfied
    fn check(&mut self) -> bool;

    /// Get description for error messages
    fn description(&self) -> String;
}

/// A function-based wait condition
pub struct FnCondition<F: FnMut() -> bool> {
    func: F,
    description: String,
}

impl<F: FnMut() -> bool> std::fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F: FnMut() -> bool> FnCondition<F> {
    /// Create a new function condition
    pub fn new(func: F, description: impl Into<String>) -> Self {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<F: FnMut() -> bool> WaitCondition for FnCondition<F> {
    fn check(&mut self) -> bool {
        (self.func)()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// Terminal state of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate held before the deadline
    Succeeded {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of predicate evaluations
        attempts: u32,
    },
    /// The deadline passed without the predicate holding
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of predicate evaluations
        attempts: u32,
    },
    /// The run-wide cancellation token fired
    Cancelled,
}

impl WaitOutcome {
    /// Whether the predicate held in time
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Time spent waiting (zero when cancelled)
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Succeeded { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
            Self::Cancelled => Duration::ZERO,
        }
    }

    /// Number of predicate evaluations
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
            Self::Cancelled => 0,
        }
    }

    /// Convert into a result, describing what was waited for on timeout
    pub fn into_result(self, description: &str, timeout: Duration) -> HarnessResult<Duration> {
        match self {
            Self::Succeeded { elapsed, .. } => Ok(elapsed),
            Self::TimedOut { .. } => Err(HarnessError::WaitTimedOut {
                description: description.to_string(),
                timeout_ms: duration_to_ms(timeout),
            }),
            Self::Cancelled => Err(HarnessError::Cancelled),
        }
    }
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Polls a predicate until it holds, the timeout elapses or the run is
/// cancelled.
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
    cancellation: Option<CancellationToken>,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub fn with_options(options: WaitOptions) -> Self {
        Self {
            options,
            cancellation: None,
        }
    }

    /// Observe a run-wide cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Evaluate `predicate` until it returns true or the timeout elapses.
    ///
    /// The predicate is evaluated at least once, immediately. Between
    /// evaluations the thread sleeps for the poll interval (never less than
    /// [`MIN_POLL_INTERVAL`]), shortened so the last evaluation happens right
    /// at the deadline.
    pub fn poll<F>(&self, mut predicate: F) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let poll_interval = self.options.poll_interval().max(MIN_POLL_INTERVAL);
        let mut attempts = 0u32;

        loop {
            if self.is_cancelled() {
                debug!(attempts, "wait cancelled");
                return WaitOutcome::Cancelled;
            }

            attempts = attempts.saturating_add(1);
            if predicate() {
                let elapsed = start.elapsed();
                debug!(attempts, elapsed_ms = duration_to_ms(elapsed), "wait succeeded");
                return WaitOutcome::Succeeded { elapsed, attempts };
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(attempts, elapsed_ms = duration_to_ms(elapsed), "wait timed out");
                return WaitOutcome::TimedOut { elapsed, attempts };
            }
            std::thread::sleep(poll_interval.min(timeout - elapsed));
        }
    }

    /// Wait for a custom condition, failing with its description on timeout
    pub fn wait_for<C: WaitCondition>(&self, condition: &mut C) -> HarnessResult<Duration> {
        let outcome = self.poll(|| condition.check());
        outcome.into_result(&condition.description(), self.options.timeout())
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Poll `predicate` every `poll_interval` until it holds or `timeout`
/// elapses. Returns whether it held.
pub fn wait_until<F>(predicate: F, timeout: Duration, poll_interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let options = WaitOptions::new()
        .with_timeout(duration_to_ms(timeout))
        .with_poll_interval(duration_to_ms(poll_interval));
    Waiter::with_options(options).poll(predicate).succeeded()
}

// =============================================================================
// ELEMENT WAITS
// =============================================================================

/// Wait until the element matched by `locator` is visible.
///
/// The timeout is `base_timeout_secs` stretched by the actor's multiplier.
/// An element that is missing counts as not shown; a stale element is
/// looked up again. Any other lookup error (an ambiguous or invalid locator)
/// ends the wait at once and is returned.
pub fn element_eventually_shown<S: BrowserSession>(
    session: &ActorSession<S>,
    locator: &Locator,
    base_timeout_secs: f64,
) -> HarnessResult<WaitOutcome> {
    element_eventually(session, locator, base_timeout_secs, Visibility::Shown)
}

/// Wait until the element matched by `locator` is hidden or gone.
///
/// Same timeout and error rules as [`element_eventually_shown`].
pub fn element_eventually_not_shown<S: BrowserSession>(
    session: &ActorSession<S>,
    locator: &Locator,
    base_timeout_secs: f64,
) -> HarnessResult<WaitOutcome> {
    element_eventually(session, locator, base_timeout_secs, Visibility::Hidden)
}

fn element_eventually<S: BrowserSession>(
    session: &ActorSession<S>,
    locator: &Locator,
    base_timeout_secs: f64,
    wanted: Visibility,
) -> HarnessResult<WaitOutcome> {
    let waiter = session.waiter(base_timeout_secs);
    let mut fatal = None;
    let outcome = waiter.poll(|| match session.visibility(locator) {
        Ok(Visibility::Shown) => wanted == Visibility::Shown,
        Ok(Visibility::Hidden | Visibility::Absent) => wanted != Visibility::Shown,
        Err(HarnessError::StaleElement { .. }) => {
            debug!(locator = %locator, "element went stale, looking it up again");
            false
        }
        Err(err) => {
            fatal = Some(err);
            true
        }
    });

    if let Some(err) = fatal {
        warn!(
            actor = session.actor().name(),
            locator = %locator,
            error = %err,
            "element visibility wait failed"
        );
        return Err(err);
    }

    if matches!(outcome, WaitOutcome::TimedOut { .. }) {
        warn!(
            actor = session.actor().name(),
            locator = %locator,
            timeout_ms = waiter.options().timeout_ms,
            shown = wanted == Visibility::Shown,
            "element visibility wait timed out"
        );
    }
    Ok(outcome)
}

// =============================================================================
// TESTS
// =============================================================================
