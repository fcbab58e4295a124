//! Browser session abstraction.
//!
//! [`BrowserSession`] is the seam to whatever drives the browser (WebDriver,
//! CDP, or the in-memory [`MockSession`](crate::mock::MockSession)). It only
//! knows how to resolve a locator against the live DOM and how to act on an
//! element. Waiting, timeout scaling and the ambiguity policy live in
//! [`ActorSession`], which binds one session to one [`Actor`].
//!
//! # Resolution contract
//!
//! `resolve` walks [`Locator::chain`] from the outermost ancestor to the
//! leaf. Each step is evaluated with every match of the previous step as the
//! context node and keeps only strict descendants of it; XPath expressions
//! of scoped steps are relative to the context node (`//x` means "any `x`
//! below the context node"). Matches are returned once each, in document
//! order.

use std::time::Duration;

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{CancellationToken, WaitOptions, WaitOutcome, Waiter, DEFAULT_POLL_INTERVAL_MS};

/// Opaque reference to a live element, valid for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub u64);

/// Observed visibility of the element a locator designates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Matched and rendered
    Shown,
    /// Matched but not rendered
    Hidden,
    /// Nothing matched
    Absent,
}

/// Abstract browser session for one actor.
///
/// Implementations are independent per actor; the harness never shares a
/// session between actors. Methods take `&self`, so implementations keep
/// their connection state behind interior mutability.
pub trait BrowserSession: Send + Sync {
    /// All live elements matching `locator`, in document order
    fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementRef>>;

    /// Click the element
    fn click(&self, element: ElementRef) -> HarnessResult<()>;

    /// Replace the element's value with `value`, typed as keystrokes
    /// (a trailing `\r` submits)
    fn set_value(&self, element: ElementRef, value: &str) -> HarnessResult<()>;

    /// Whether the element is rendered
    fn is_visible(&self, element: ElementRef) -> HarnessResult<bool>;

    /// Text content of the element
    fn text(&self, element: ElementRef) -> HarnessResult<String>;
}

/// A browser session bound to the actor driving it
#[derive(Debug)]
pub struct ActorSession<S> {
    actor: Actor,
    session: S,
    poll_interval: Duration,
    cancellation: Option<CancellationToken>,
}

impl<S: BrowserSession> ActorSession<S> {
    /// Bind `session` to `actor`
    #[must_use]
    pub fn new(actor: Actor, session: S) -> Self {
        Self {
            actor,
            session,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            cancellation: None,
        }
    }

    /// Set the interval between retries of `find` and element waits
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Abort `find` and element waits when the token fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The actor driving this session
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The underlying browser session
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Interval between retries
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Waiter for `base_timeout_secs` stretched by the actor's multiplier
    #[must_use]
    pub fn waiter(&self, base_timeout_secs: f64) -> Waiter {
        let options = WaitOptions::new()
            .with_poll_interval(u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX))
            .scaled_for(&self.actor, base_timeout_secs);
        let waiter = Waiter::with_options(options);
        match &self.cancellation {
            Some(token) => waiter.with_cancellation(token.clone()),
            None => waiter,
        }
    }

    /// Resolve `locator` once and apply its match policy
    pub fn try_find(&self, locator: &Locator) -> HarnessResult<Option<ElementRef>> {
        locator.validate()?;
        let matches = self.session.resolve(locator)?;
        debug!(
            actor = self.actor.name(),
            locator = %locator,
            matches = matches.len(),
            "resolved locator"
        );
        locator
            .match_policy()
            .pick(matches, &locator.description())
    }

    /// Find the element designated by `locator`.
    ///
    /// With `timeout_secs` of `None` a single attempt is made. Otherwise the
    /// lookup is retried for `timeout_secs` stretched by the actor's
    /// multiplier. Ambiguity and invalid selectors fail at once; a stale
    /// element seen mid-resolution is retried.
    pub fn find(
        &self,
        locator: &Locator,
        timeout_secs: Option<f64>,
    ) -> HarnessResult<ElementHandle<'_, S>> {
        let waiter = self.waiter(timeout_secs.unwrap_or(0.0));
        let mut found = None;
        let mut fatal = None;

        let outcome = waiter.poll(|| match self.try_find(locator) {
            Ok(Some(element)) => {
                found = Some(element);
                true
            }
            Ok(None) | Err(HarnessError::StaleElement { .. }) => false,
            Err(err) => {
                fatal = Some(err);
                true
            }
        });

        if let Some(err) = fatal {
            warn!(actor = self.actor.name(), locator = %locator, error = %err, "lookup failed");
            return Err(err);
        }
        match (outcome, found) {
            (WaitOutcome::Succeeded { .. }, Some(element)) => Ok(ElementHandle {
                session: self,
                element,
                description: locator.description(),
            }),
            (WaitOutcome::Cancelled, _) => Err(HarnessError::Cancelled),
            _ => Err(HarnessError::ElementNotFound {
                description: locator.description(),
                timeout_ms: waiter.options().timeout_ms,
            }),
        }
    }

    /// Current visibility of the element designated by `locator`
    pub fn visibility(&self, locator: &Locator) -> HarnessResult<Visibility> {
        match self.try_find(locator)? {
            None => Ok(Visibility::Absent),
            Some(element) => {
                if self.session.is_visible(element)? {
                    Ok(Visibility::Shown)
                } else {
                    Ok(Visibility::Hidden)
                }
            }
        }
    }
}

/// A found element, tied to the session and locator that found it
#[derive(Debug)]
pub struct ElementHandle<'a, S> {
    session: &'a ActorSession<S>,
    element: ElementRef,
    description: String,
}

impl<S: BrowserSession> ElementHandle<'_, S> {
    /// Click the element
    pub fn click(&self) -> HarnessResult<()> {
        debug!(actor = self.session.actor.name(), element = %self.description, "click");
        self.session
            .session
            .click(self.element)
            .map_err(|err| self.contextualize(err))
    }

    /// Set the element's value
    pub fn set_value(&self, value: &str) -> HarnessResult<()> {
        debug!(actor = self.session.actor.name(), element = %self.description, "set value");
        self.session
            .session
            .set_value(self.element, value)
            .map_err(|err| self.contextualize(err))
    }

    /// Whether the element is rendered
    pub fn is_visible(&self) -> HarnessResult<bool> {
        self.session
            .session
            .is_visible(self.element)
            .map_err(|err| self.contextualize(err))
    }

    /// Text content of the element
    pub fn text(&self) -> HarnessResult<String> {
        self.session
            .session
            .text(self.element)
            .map_err(|err| self.contextualize(err))
    }

    /// Raw element reference
    #[must_use]
    pub const fn element(&self) -> ElementRef {
        self.element
    }

    /// Description of the locator that found this element
    #[must_use]
    pub fn describe(&self) -> &str {
        &self.description
    }

    fn contextualize(&self, err: HarnessError) -> HarnessError {
        match err {
            HarnessError::StaleElement { .. } => HarnessError::StaleElement {
                description: self.description.clone(),
            },
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::MockSession;
    use std::time::Instant;

    fn session_with_button() -> (ActorSession<MockSession>, MockSession) {
        let dom = MockSession::new();
        let body = dom.root();
        let controls = dom.append(body, "div").id("controls").build();
        let _ = dom.append(controls, "a").class("button").class("new").build();
        let session = ActorSession::new(Actor::new("admin"), dom.clone())
            .with_poll_interval(Duration::from_millis(10));
        (session, dom)
    }

    mod find_tests {
        use super::*;

        #[test]
        fn test_find_existing_element() {
            let (session, _) = session_with_button();
            let locator = Locator::for_css("#controls .button.new").described_as("Create menu button");
            let handle = session.find(&locator, Some(1.0)).unwrap();
            assert_eq!(handle.describe(), "Create menu button");
        }

        #[test]
        fn test_find_without_timeout_is_single_attempt() {
            let (session, _) = session_with_button();
            let start = Instant::now();
            let err = session.find(&Locator::for_css(".missing"), None).unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotFound { timeout_ms: 0, .. }));
            assert!(start.elapsed() < Duration::from_millis(100));
        }

        #[test]
        fn test_find_timeout_scaled_by_multiplier() {
            let dom = MockSession::new();
            let session = ActorSession::new(
                Actor::new("ci").with_find_timeout_multiplier(2.0),
                dom,
            )
            .with_poll_interval(Duration::from_millis(10));
            let locator = Locator::for_css(".missing").described_as("Missing thing");

            let start = Instant::now();
            let err = session.find(&locator, Some(0.05)).unwrap_err();
            assert!(start.elapsed() >= Duration::from_millis(100));
            match err {
                HarnessError::ElementNotFound {
                    description,
                    timeout_ms,
                } => {
                    assert_eq!(description, "Missing thing");
                    assert_eq!(timeout_ms, 100);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_find_waits_for_late_element() {
            let (session, dom) = session_with_button();
            let remote = dom.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(40));
                let _ = remote.append(remote.root(), "span").class("late").build();
            });
            assert!(session.find(&Locator::for_css(".late"), Some(2.0)).is_ok());
        }

        #[test]
        fn test_strict_ambiguity_fails_fast() {
            let (session, dom) = session_with_button();
            let _ = dom.append(dom.root(), "a").class("button").class("new").build();
            let start = Instant::now();
            let err = session.find(&Locator::for_css(".button.new"), Some(5.0)).unwrap_err();
            assert!(matches!(err, HarnessError::AmbiguousLocator { count: 2, .. }));
            assert!(start.elapsed() < Duration::from_secs(1));
        }

        #[test]
        fn test_first_match_policy_takes_document_order() {
            let (session, dom) = session_with_button();
            let second = dom.append(dom.root(), "a").class("button").class("new").build();
            let handle = session
                .find(&Locator::for_css(".button.new").first_match(), None)
                .unwrap();
            assert_ne!(handle.element(), second);
        }

        #[test]
        fn test_invalid_selector_fails_fast() {
            let (session, _) = session_with_button();
            let err = session.find(&Locator::for_css(""), Some(5.0)).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidSelector { .. }));
        }

        #[test]
        fn test_cancelled_find() {
            let token = CancellationToken::new();
            token.cancel();
            let session = ActorSession::new(Actor::new("a"), MockSession::new())
                .with_cancellation(token);
            let err = session.find(&Locator::for_css("div"), Some(1.0)).unwrap_err();
            assert!(matches!(err, HarnessError::Cancelled));
        }
    }

    mod handle_tests {
        use super::*;

        #[test]
        fn test_click_is_recorded() {
            let (session, dom) = session_with_button();
            session
                .find(&Locator::for_css(".button.new"), None)
                .unwrap()
                .click()
                .unwrap();
            assert!(dom.was_called("click"));
        }

        #[test]
        fn test_stale_handle_reports_locator_description() {
            let (session, dom) = session_with_button();
            let locator = Locator::for_css(".button.new").described_as("Create menu button");
            let handle = session.find(&locator, None).unwrap();
            dom.remove(handle.element());

            match handle.click().unwrap_err() {
                HarnessError::StaleElement { description } => {
                    assert_eq!(description, "Create menu button");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_visibility_states() {
            let (session, dom) = session_with_button();
            let button = Locator::for_css(".button.new");
            assert_eq!(session.visibility(&button).unwrap(), Visibility::Shown);

            let element = session.try_find(&button).unwrap().unwrap();
            dom.set_visible(element, false);
            assert_eq!(session.visibility(&button).unwrap(), Visibility::Hidden);

            dom.remove(element);
            assert_eq!(session.visibility(&button).unwrap(), Visibility::Absent);
        }
    }
}
