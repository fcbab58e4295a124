//! Acceptance Kit: UI acceptance-testing core
//!
//! Human-readable scenario steps ("I create a new folder named Reports")
//! drive a browser session and assert on the resulting DOM. The kit provides
//! the two pieces such steps stand on: composable, self-describing
//! [`Locator`]s and a bounded polling engine ([`Waiter`]) that tolerates
//! asynchronous rendering while still failing with a readable message.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  ACCEPTANCE KIT Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Scenario   │    │ Actor      │            │
//! │   │ Runner     │───►│ Controller │───►│ Session    │──► browser │
//! │   │            │    │ (scopes)   │    │ (find/wait)│            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │                            │                 ▲                   │
//! │                            ▼                 │                   │
//! │                     ┌────────────┐    ┌────────────┐            │
//! │                     │ Step       │───►│ Locator    │            │
//! │                     │ catalogue  │    │ + query    │            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use acceptance_kit::mock::MockSession;
//! use acceptance_kit::prelude::*;
//!
//! let dom = MockSession::new();
//! let controls = dom.append(dom.root(), "div").id("controls").build();
//! let _ = dom.append(controls, "a").class("button").class("new").build();
//!
//! let mut controller = ScenarioController::new(HarnessConfig::default());
//! controller.add_session("admin", dom);
//! controller.switch_actor("admin").unwrap();
//!
//! let button = acceptance_kit::file_list::create_menu_button(controller.current_scope());
//! let handle = controller.actor().unwrap().find(&button, Some(1.0)).unwrap();
//! assert_eq!(handle.describe(), "Create menu button in file list");
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod actor;
#[allow(clippy::missing_errors_doc)]
mod assertion;
#[allow(clippy::missing_errors_doc)]
mod config;
/// File list locator catalogue and step definitions
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod file_list;
mod locator;
#[allow(clippy::missing_errors_doc)]
mod logging;
/// In-memory DOM for running steps without a browser
#[allow(
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::option_if_let_else
)]
pub mod mock;
/// Escaping expression builders
pub mod query;
mod result;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
mod scenario;
mod scope;
#[allow(clippy::missing_errors_doc)]
mod session;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
mod wait;

pub use actor::Actor;
pub use assertion::{
    assert_equals, assert_false, assert_not_null, assert_true, fail, AssertionResult,
};
pub use config::{HarnessConfig, ENV_FIND_TIMEOUT_MULTIPLIER, ENV_POLL_INTERVAL_MS};
pub use file_list::FileListSteps;
pub use locator::{Locator, MatchPolicy, Selector, SelectorKind};
pub use logging::{init_logging, init_test_logging, Verbosity};
pub use result::{HarnessError, HarnessResult};
pub use scenario::{
    RunSummary, Scenario, ScenarioController, ScenarioHook, ScenarioResult, ScenarioRunner, Step,
};
pub use scope::{ActorAware, ScopeRegistry};
pub use session::{ActorSession, BrowserSession, ElementHandle, ElementRef, Visibility};
pub use wait::{
    element_eventually_not_shown, element_eventually_shown, wait_until, CancellationToken,
    FnCondition, WaitCondition, WaitOptions, WaitOutcome, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS, MIN_POLL_INTERVAL,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::actor::*;
    pub use super::assertion::*;
    pub use super::config::*;
    pub use super::file_list::FileListSteps;
    pub use super::locator::*;
    pub use super::logging::*;
    pub use super::result::*;
    pub use super::scenario::*;
    pub use super::scope::*;
    pub use super::session::*;
    pub use super::wait::*;
}
