//! Registry of available actions and the identifier index derived from it.

use crate::command::{ActionKey, ActionRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type IdentifierIndex = HashMap<String, ActionRef>;

/// Set of actions (by identity) with a case-insensitive identifier index.
///
/// Mutations invalidate the index; it is rebuilt on the next lookup and published as a
/// whole, so concurrent lookups either see the previous complete index or a new complete
/// one. When two actions share an identifier, the one added last wins.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<ActionRef>,
    index: RwLock<Option<Arc<IdentifierIndex>>>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: impl IntoIterator<Item = ActionRef>) -> Self {
        let mut registry = Self::new();
        registry.add_all(actions);
        registry
    }

    /// Adds `action` unless this very instance is already registered.
    pub fn add(&mut self, action: ActionRef) -> bool {
        if self.contains(&action) {
            return false;
        }
        self.actions.push(action);
        self.invalidate();
        true
    }

    pub fn add_all(&mut self, actions: impl IntoIterator<Item = ActionRef>) -> bool {
        let mut changed = false;
        for action in actions {
            changed |= self.add(action);
        }
        changed
    }

    pub fn remove(&mut self, action: &ActionRef) -> bool {
        let key = ActionKey::of(action);
        let before = self.actions.len();
        self.actions.retain(|a| ActionKey::of(a) != key);
        let removed = self.actions.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }

    pub fn remove_all<'a>(&mut self, actions: impl IntoIterator<Item = &'a ActionRef>) -> bool {
        let mut changed = false;
        for action in actions {
            changed |= self.remove(action);
        }
        changed
    }

    /// Keeps only the actions also present in `actions`.
    pub fn retain_all<'a>(&mut self, actions: impl IntoIterator<Item = &'a ActionRef>) -> bool {
        let keep: Vec<ActionKey> = actions.into_iter().map(ActionKey::of).collect();
        let before = self.actions.len();
        self.actions.retain(|a| keep.contains(&ActionKey::of(a)));
        let changed = self.actions.len() != before;
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn contains(&self, action: &ActionRef) -> bool {
        let key = ActionKey::of(action);
        self.actions.iter().any(|a| ActionKey::of(a) == key)
    }

    pub fn contains_all<'a>(&self, actions: impl IntoIterator<Item = &'a ActionRef>) -> bool {
        actions.into_iter().all(|a| self.contains(a))
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.invalidate();
    }

    /// Registered actions in insertion order.
    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }

    /// Looks up the action answering to `identifier`, ignoring case.
    pub fn action_for(&self, identifier: &str) -> Option<ActionRef> {
        self.index().get(&identifier.to_uppercase()).cloned()
    }

    /// Every registered identifier, upper-cased and sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.index().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn invalidate(&mut self) {
        *self.index.get_mut() = None;
    }

    fn index(&self) -> Arc<IdentifierIndex> {
        if let Some(index) = self.index.read().as_ref() {
            return Arc::clone(index);
        }

        let built = Arc::new(self.build_index());
        *self.index.write() = Some(Arc::clone(&built));
        built
    }

    fn build_index(&self) -> IdentifierIndex {
        let mut index = IdentifierIndex::new();
        for action in &self.actions {
            for identifier in action.identifiers() {
                index.insert(identifier.to_uppercase(), Arc::clone(action));
            }
        }
        trace!(actions = self.actions.len(), identifiers = index.len(), "rebuilt identifier index");
        index
    }
}

impl Clone for ActionRegistry {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            index: RwLock::new(None),
        }
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<Option<String>> =
            self.actions.iter().map(|a| a.default_identifier()).collect();
        f.debug_struct("ActionRegistry").field("actions", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ActionRegistry;
    use crate::command::{Action, ActionRef, Status};
    use crate::dispatcher::Context;
    use std::sync::Arc;

    struct Named(Vec<&'static str>);

    impl Action for Named {
        fn identifiers(&self) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }

        fn brief_help(&self) -> String {
            "test action".to_string()
        }

        fn run(&self, _ctx: &Context<'_>, _args: &[String]) -> Status {
            Status::Success
        }
    }

    fn action(ids: Vec<&'static str>) -> ActionRef {
        Arc::new(Named(ids))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let foo = action(vec!["FOO", "BAR"]);
        let registry = ActionRegistry::with_actions([foo.clone()]);

        assert!(Arc::ptr_eq(&registry.action_for("foo").unwrap(), &foo));
        assert!(Arc::ptr_eq(&registry.action_for("BAR").unwrap(), &foo));
        assert!(Arc::ptr_eq(&registry.action_for("Bar").unwrap(), &foo));
        assert!(registry.action_for("baz").is_none());
    }

    #[test]
    fn test_remove_invalidates_index() {
        let foo = action(vec!["FOO", "BAR"]);
        let mut registry = ActionRegistry::new();
        registry.add(foo.clone());
        assert!(registry.action_for("foo").is_some());

        assert!(registry.remove(&foo));
        assert!(registry.action_for("foo").is_none());
        assert!(registry.action_for("bar").is_none());
        assert!(!registry.remove(&foo));
    }

    #[test]
    fn test_same_instance_is_added_once() {
        let foo = action(vec!["foo"]);
        let mut registry = ActionRegistry::new();
        assert!(registry.add(foo.clone()));
        assert!(!registry.add(foo.clone()));
        assert_eq!(registry.len(), 1);

        // another instance with the same identifiers is a distinct member
        assert!(registry.add(action(vec!["foo"])));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_last_added_wins_identifier_collision() {
        let first = action(vec!["run"]);
        let second = action(vec!["RUN", "go"]);
        let registry = ActionRegistry::with_actions([first.clone(), second.clone()]);

        assert!(Arc::ptr_eq(&registry.action_for("run").unwrap(), &second));
    }

    #[test]
    fn test_set_operations() {
        let a = action(vec!["a"]);
        let b = action(vec!["b"]);
        let c = action(vec!["c"]);
        let mut registry = ActionRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.add_all([a.clone(), b.clone(), c.clone()]));
        assert!(registry.contains_all([&a, &b]));
        assert!(registry.action_for("c").is_some());

        assert!(registry.retain_all([&a, &b]));
        assert!(!registry.contains(&c));
        assert!(registry.action_for("c").is_none());

        assert!(registry.remove_all([&a]));
        assert_eq!(registry.identifiers(), ["B"]);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.action_for("b").is_none());
    }

    #[test]
    fn test_concurrent_lookups_agree() {
        let foo = action(vec!["foo"]);
        let registry = Arc::new(ActionRegistry::with_actions([foo.clone()]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.action_for("FOO").is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
