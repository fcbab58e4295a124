//! Scenario controller and runner.
//!
//! The [`ScenarioController`] is the explicit context every step receives:
//! the actor sessions, the current actor and the per-actor scope registry.
//! The [`ScenarioRunner`] builds a fresh controller (or any other world) per
//! scenario, so nothing a scenario records can reach the next one.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::scope::{ActorAware, ScopeRegistry};
use crate::session::{ActorSession, BrowserSession};
use crate::wait::CancellationToken;

/// Lifecycle hook run before the first step of every scenario
pub trait ScenarioHook {
    /// Reset per-scenario state
    fn before_scenario(&mut self);
}

impl ScenarioHook for ScopeRegistry {
    fn before_scenario(&mut self) {
        self.reset_all_scopes();
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Per-scenario context passed by reference into every step
pub struct ScenarioController<S> {
    config: HarnessConfig,
    scopes: ScopeRegistry,
    sessions: HashMap<String, ActorSession<S>>,
    current: Option<String>,
    listeners: Vec<Box<dyn ActorAware + Send>>,
    hooks: Vec<Box<dyn ScenarioHook + Send>>,
}

impl<S> fmt::Debug for ScenarioController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioController")
            .field("config", &self.config)
            .field("scopes", &self.scopes)
            .field("actors", &self.sessions.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<S: BrowserSession> ScenarioController<S> {
    /// Create a controller with no actors
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            scopes: ScopeRegistry::new(),
            sessions: HashMap::new(),
            current: None,
            listeners: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Harness configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Register an actor session; replaces a session with the same name
    pub fn add_actor(&mut self, session: ActorSession<S>) {
        let name = session.actor().name().to_string();
        let _ = self.sessions.insert(name, session);
    }

    /// Register `session` for the actor `name`, configured from
    /// [`HarnessConfig`]
    pub fn add_session(&mut self, name: &str, session: S) {
        let session = ActorSession::new(self.config.actor(name), session)
            .with_poll_interval(self.config.poll_interval());
        self.add_actor(session);
    }

    /// Make `name` the current actor and notify every listener
    pub fn switch_actor(&mut self, name: &str) -> HarnessResult<()> {
        let actor = self
            .sessions
            .get(name)
            .map(|session| session.actor().clone())
            .ok_or_else(|| HarnessError::UnknownActor {
                name: name.to_string(),
            })?;

        self.scopes.set_current_actor(&actor);
        for listener in &mut self.listeners {
            listener.set_current_actor(&actor);
        }
        self.current = Some(name.to_string());
        info!(actor = name, "switched actor");
        Ok(())
    }

    /// Session of the current actor
    pub fn actor(&self) -> HarnessResult<&ActorSession<S>> {
        let name = self.current.as_deref().ok_or(HarnessError::NoCurrentActor)?;
        self.sessions
            .get(name)
            .ok_or_else(|| HarnessError::UnknownActor {
                name: name.to_string(),
            })
    }

    /// Name of the current actor
    #[must_use]
    pub fn current_actor_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Scope in effect for the current actor (`None` is the document root)
    #[must_use]
    pub const fn current_scope(&self) -> Option<&Locator> {
        self.scopes.current_scope()
    }

    /// Scope registry
    #[must_use]
    pub const fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Record the scope of the current actor and apply it to the next steps
    pub fn set_scope_for_current_actor(&mut self, scope: Option<Locator>) -> HarnessResult<()> {
        let actor = self.actor()?.actor().clone();
        self.scopes.set_scope_for_actor(scope, &actor);
        self.scopes.set_current_actor(&actor);
        Ok(())
    }

    /// Register a step group that tracks the current actor.
    ///
    /// The controller owns the listener and never hands it back, so a step
    /// group that needs to read what it recorded keeps that state behind a
    /// shared handle (an `Arc<Mutex<_>>` cloned before registering).
    pub fn register_listener(&mut self, listener: Box<dyn ActorAware + Send>) {
        self.listeners.push(listener);
    }

    /// Register a hook run by [`ScenarioHook::before_scenario`]
    pub fn register_hook(&mut self, hook: Box<dyn ScenarioHook + Send>) {
        self.hooks.push(hook);
    }
}

impl<S: BrowserSession> ScenarioHook for ScenarioController<S> {
    fn before_scenario(&mut self) {
        self.scopes.before_scenario();
        self.current = None;
        for hook in &mut self.hooks {
            hook.before_scenario();
        }
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// A single step over the world `W`
pub type Step<W> = Box<dyn Fn(&mut W) -> HarnessResult<()> + Send + Sync>;

/// One independent test case: ordered, named steps
pub struct Scenario<W> {
    name: String,
    steps: Vec<(String, Step<W>)>,
}

impl<W> fmt::Debug for Scenario<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|(text, _)| text).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<W> Scenario<W> {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step<F>(mut self, text: impl Into<String>, step: F) -> Self
    where
        F: Fn(&mut W) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.steps.push((text.into(), Box::new(step)));
        self
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether every step passed
    pub passed: bool,
    /// Text of the step that failed
    pub failed_step: Option<String>,
    /// Error message if failed
    pub error: Option<String>,
    /// Whether the failure was a test failure rather than a harness error
    pub test_failure: bool,
    /// Scenario duration
    pub duration: Duration,
}

impl ScenarioResult {
    fn pass(name: &str, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            failed_step: None,
            error: None,
            test_failure: false,
            duration,
        }
    }

    fn fail(name: &str, step: Option<&str>, error: &HarnessError, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            failed_step: step.map(ToString::to_string),
            error: Some(error.to_string()),
            test_failure: error.is_test_failure(),
            duration,
        }
    }
}

/// Results from a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Per-scenario results, in declaration order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl RunSummary {
    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs scenarios in declaration order, each against a fresh world
pub struct ScenarioRunner<W> {
    factory: Box<dyn Fn() -> HarnessResult<W>>,
    cancellation: Option<CancellationToken>,
}

impl<W> fmt::Debug for ScenarioRunner<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl<W: ScenarioHook> ScenarioRunner<W> {
    /// Create a runner building each scenario's world with `factory`
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> HarnessResult<W> + 'static,
    {
        Self {
            factory: Box::new(factory),
            cancellation: None,
        }
    }

    /// Report the remaining scenarios as cancelled once `token` fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run every scenario; a failure never stops the run
    pub fn run(&self, scenarios: &[Scenario<W>]) -> RunSummary {
        let start = Instant::now();
        let results = scenarios
            .iter()
            .map(|scenario| self.run_scenario(scenario))
            .collect();
        RunSummary {
            results,
            duration: start.elapsed(),
        }
    }

    /// Run one scenario, stopping at its first failing step.
    ///
    /// A step that panics fails its scenario with
    /// [`HarnessError::Panicked`] and the run goes on with the next one.
    pub fn run_scenario(&self, scenario: &Scenario<W>) -> ScenarioResult {
        let start = Instant::now();
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            warn!(scenario = %scenario.name, "skipped: run cancelled");
            return ScenarioResult::fail(
                &scenario.name,
                None,
                &HarnessError::Cancelled,
                start.elapsed(),
            );
        }

        info!(scenario = %scenario.name, steps = scenario.len(), "scenario started");
        let built = panic::catch_unwind(AssertUnwindSafe(|| (self.factory)()))
            .unwrap_or_else(|payload| Err(panicked(payload.as_ref())));
        let mut world = match built {
            Ok(world) => world,
            Err(err) => {
                warn!(scenario = %scenario.name, error = %err, "scenario setup failed");
                return ScenarioResult::fail(&scenario.name, None, &err, start.elapsed());
            }
        };
        world.before_scenario();

        for (text, step) in &scenario.steps {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| step(&mut world)))
                .unwrap_or_else(|payload| Err(panicked(payload.as_ref())));
            if let Err(err) = outcome {
                warn!(scenario = %scenario.name, step = %text, error = %err, "scenario failed");
                return ScenarioResult::fail(&scenario.name, Some(text.as_str()), &err, start.elapsed());
            }
        }

        info!(scenario = %scenario.name, elapsed = ?start.elapsed(), "scenario passed");
        ScenarioResult::pass(&scenario.name, start.elapsed())
    }
}

/// Turn a caught panic payload into [`HarnessError::Panicked`]
fn panicked(payload: &(dyn Any + Send)) -> HarnessError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    HarnessError::Panicked { message }
}
