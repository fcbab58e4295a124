//! Per-actor scope registry.
//!
//! Steps that work on a file list do not know which file list they target:
//! the Files app, a public share page and a details sidebar all embed one.
//! Whichever step opened the page records the container locator for the
//! actor, and every later lookup for that actor is scoped under it.
//!
//! The registry is a plain value owned by the scenario controller. A fresh
//! one is built for every scenario, which keeps scenarios isolated without
//! any synchronisation.

use std::collections::HashMap;

use tracing::debug;

use crate::actor::Actor;
use crate::locator::Locator;

/// Capability of being told which actor performs the next steps.
///
/// Step groups that keep per-actor state implement this and are registered
/// explicitly with the scenario controller.
pub trait ActorAware {
    /// Receive the actor that is now current
    fn set_current_actor(&mut self, actor: &Actor);
}

/// Scope locators recorded per actor name
#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    by_actor: HashMap<String, Option<Locator>>,
    current_actor: Option<String>,
    current_scope: Option<Locator>,
}

impl ScopeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the scope for `actor`; `None` means the document root.
    ///
    /// Does not change the current actor. The current scope only follows
    /// when the actor is switched to again.
    pub fn set_scope_for_actor(&mut self, scope: Option<Locator>, actor: &Actor) {
        debug!(
            actor = actor.name(),
            scope = %scope.as_ref().map_or_else(|| "document root".to_string(), Locator::description),
            "recording scope"
        );
        let _ = self.by_actor.insert(actor.name().to_string(), scope);
    }

    /// Forget every recorded scope and the current actor
    pub fn reset_all_scopes(&mut self) {
        self.by_actor.clear();
        self.current_actor = None;
        self.current_scope = None;
    }

    /// Scope in effect for the current actor
    #[must_use]
    pub const fn current_scope(&self) -> Option<&Locator> {
        self.current_scope.as_ref()
    }

    /// Name of the current actor, if one was set
    #[must_use]
    pub fn current_actor(&self) -> Option<&str> {
        self.current_actor.as_deref()
    }

    /// Scope recorded for the actor called `name`
    #[must_use]
    pub fn scope_for(&self, name: &str) -> Option<&Locator> {
        self.by_actor.get(name).and_then(Option::as_ref)
    }

    /// Number of actors with a recorded entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_actor.len()
    }

    /// Whether no actor has a recorded entry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_actor.is_empty()
    }
}

impl ActorAware for ScopeRegistry {
    /// Switch actors, restoring that actor's own scope. Reads only.
    fn set_current_actor(&mut self, actor: &Actor) {
        self.current_scope = self.scope_for(actor.name()).cloned();
        self.current_actor = Some(actor.name().to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn files_app() -> Locator {
        Locator::for_css("#app-content-files").described_as("Files app")
    }

    fn public_share() -> Locator {
        Locator::for_css("#preview").described_as("Public share")
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_new_registry_is_root() {
            let registry = ScopeRegistry::new();
            assert!(registry.current_scope().is_none());
            assert!(registry.current_actor().is_none());
            assert!(registry.is_empty());
        }

        #[test]
        fn test_switching_restores_each_actors_scope() {
            let alice = Actor::new("alice");
            let bob = Actor::new("bob");
            let mut registry = ScopeRegistry::new();

            registry.set_scope_for_actor(Some(files_app()), &alice);
            registry.set_scope_for_actor(Some(public_share()), &bob);

            registry.set_current_actor(&alice);
            assert_eq!(registry.current_scope(), Some(&files_app()));
            registry.set_current_actor(&bob);
            assert_eq!(registry.current_scope(), Some(&public_share()));
            registry.set_current_actor(&alice);
            assert_eq!(registry.current_scope(), Some(&files_app()));
        }

        #[test]
        fn test_unknown_actor_defaults_to_root() {
            let mut registry = ScopeRegistry::new();
            registry.set_scope_for_actor(Some(files_app()), &Actor::new("alice"));
            registry.set_current_actor(&Actor::new("carol"));
            assert!(registry.current_scope().is_none());
            assert_eq!(registry.current_actor(), Some("carol"));
        }

        #[test]
        fn test_setting_scope_does_not_switch_actor() {
            let alice = Actor::new("alice");
            let bob = Actor::new("bob");
            let mut registry = ScopeRegistry::new();
            registry.set_current_actor(&alice);

            registry.set_scope_for_actor(Some(public_share()), &bob);
            assert_eq!(registry.current_actor(), Some("alice"));
            assert!(registry.current_scope().is_none());
        }

        #[test]
        fn test_scope_applies_on_next_switch() {
            let alice = Actor::new("alice");
            let mut registry = ScopeRegistry::new();
            registry.set_current_actor(&alice);
            registry.set_scope_for_actor(Some(files_app()), &alice);
            assert!(registry.current_scope().is_none());

            registry.set_current_actor(&alice);
            assert_eq!(registry.current_scope(), Some(&files_app()));
        }

        #[test]
        fn test_switch_does_not_mutate_entries() {
            let mut registry = ScopeRegistry::new();
            registry.set_scope_for_actor(None, &Actor::new("alice"));
            registry.set_current_actor(&Actor::new("bob"));
            assert_eq!(registry.len(), 1);
            assert!(registry.scope_for("bob").is_none());
        }

        #[test]
        fn test_reset_clears_everything() {
            let alice = Actor::new("alice");
            let mut registry = ScopeRegistry::new();
            registry.set_scope_for_actor(Some(files_app()), &alice);
            registry.set_current_actor(&alice);

            registry.reset_all_scopes();
            assert!(registry.is_empty());
            assert!(registry.current_scope().is_none());

            registry.set_current_actor(&alice);
            assert!(registry.current_scope().is_none());
        }

        #[test]
        fn test_explicit_none_overrides_previous_scope() {
            let alice = Actor::new("alice");
            let mut registry = ScopeRegistry::new();
            registry.set_scope_for_actor(Some(files_app()), &alice);
            registry.set_scope_for_actor(None, &alice);
            registry.set_current_actor(&alice);
            assert!(registry.current_scope().is_none());
        }
    }

    mod property_tests {
        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Set { actor: usize, scope: Option<usize> },
            Switch { actor: usize },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..3, proptest::option::of(0usize..4))
                    .prop_map(|(actor, scope)| Op::Set { actor, scope }),
                (0usize..3).prop_map(|actor| Op::Switch { actor }),
            ]
        }

        proptest! {
            #[test]
            fn prop_switch_restores_last_set_scope(ops in proptest::collection::vec(op(), 0..40)) {
                let actors: Vec<Actor> = (0..3).map(|i| Actor::new(format!("user{i}"))).collect();
                let scopes: Vec<Locator> = (0..4).map(|i| Locator::for_css(format!("#scope-{i}"))).collect();
                let mut registry = ScopeRegistry::new();
                let mut model: HashMap<usize, Option<usize>> = HashMap::new();

                for op in ops {
                    match op {
                        Op::Set { actor, scope } => {
                            registry.set_scope_for_actor(scope.map(|s| scopes[s].clone()), &actors[actor]);
                            let _ = model.insert(actor, scope);
                        }
                        Op::Switch { actor } => {
                            registry.set_current_actor(&actors[actor]);
                            let expected = model.get(&actor).copied().flatten().map(|s| &scopes[s]);
                            prop_assert_eq!(registry.current_scope(), expected);
                        }
                    }
                }
            }
        }
    }
}
