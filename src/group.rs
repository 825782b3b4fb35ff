//! Single-selection coordination for mutually exclusive switches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that carries an on/off selection flag.
pub trait Selectable: Send + Sync {
    fn is_selected(&self) -> bool;
    fn set_selected(&self, selected: bool);
}

/// Plain selection flag, the state behind a switch action.
#[derive(Debug, Default)]
pub struct SwitchState {
    selected: AtomicBool,
}

impl SwitchState {
    pub fn new(selected: bool) -> Self {
        Self {
            selected: AtomicBool::new(selected),
        }
    }
}

impl Selectable for SwitchState {
    fn is_selected(&self) -> bool {
        self.selected.load(Ordering::SeqCst)
    }

    fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::SeqCst);
    }
}

/// Radio-style group: at most one member is selected, and a member is selected in the
/// group exactly when it is the group's selection.
///
/// The selection only changes by selecting another member or by [`ActionGroup::clear_selection`];
/// `set_selected(a, false)` does nothing.
pub struct ActionGroup<T: ?Sized + Selectable = SwitchState> {
    members: Vec<Arc<T>>,
    selection: Option<Arc<T>>,
}

impl<T: ?Sized + Selectable> ActionGroup<T> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            selection: None,
        }
    }

    /// Joins `member` to the group. It keeps its selection only if the group had none.
    ///
    /// Returns false, leaving everything untouched, when `member` already belongs here.
    pub fn add(&mut self, member: Arc<T>) -> bool {
        if self.contains(&member) {
            return false;
        }
        if self.selection.is_none() && member.is_selected() {
            self.selection = Some(Arc::clone(&member));
        } else {
            member.set_selected(false);
        }
        self.members.push(member);
        true
    }

    pub fn contains(&self, member: &Arc<T>) -> bool {
        self.members.iter().any(|m| Arc::ptr_eq(m, member))
    }

    pub fn remove(&mut self, member: &Arc<T>) -> bool {
        let before = self.members.len();
        self.members.retain(|m| !Arc::ptr_eq(m, member));
        if self.is_selected(member) {
            self.selection = None;
        }
        self.members.len() != before
    }

    pub fn clear_selection(&mut self) {
        if let Some(previous) = self.selection.take() {
            previous.set_selected(false);
        }
    }

    pub fn set_selected(&mut self, member: &Arc<T>, selected: bool) {
        if !selected || self.is_selected(member) {
            return;
        }
        if let Some(previous) = self.selection.replace(Arc::clone(member)) {
            previous.set_selected(false);
        }
        member.set_selected(true);
    }

    pub fn is_selected(&self, member: &Arc<T>) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selection| Arc::ptr_eq(selection, member))
    }

    pub fn selection(&self) -> Option<&Arc<T>> {
        self.selection.as_ref()
    }

    pub fn members(&self) -> &[Arc<T>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T: ?Sized + Selectable> Default for ActionGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(selected: bool) -> Arc<SwitchState> {
        Arc::new(SwitchState::new(selected))
    }

    #[test]
    fn test_empty_group() {
        let mut group: ActionGroup = ActionGroup::new();
        group.clear_selection();
        assert!(group.is_empty());
        assert!(group.selection().is_none());
    }

    #[test]
    fn test_first_selected_member_becomes_selection() {
        let a = state(true);
        let b = state(true);
        let mut group = ActionGroup::new();
        group.add(a.clone());
        group.add(b.clone());

        assert!(group.is_selected(&a));
        assert!(a.is_selected());
        assert!(!b.is_selected(), "second selected member is forced off");
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_selecting_moves_the_selection() {
        let a = state(false);
        let b = state(false);
        let mut group = ActionGroup::new();
        group.add(a.clone());
        group.add(b.clone());

        group.set_selected(&a, true);
        assert!(a.is_selected());

        group.set_selected(&b, true);
        assert!(!a.is_selected());
        assert!(b.is_selected());
        assert!(group.is_selected(&b));
        assert!(!group.is_selected(&a));
    }

    #[test]
    fn test_deselecting_is_a_no_op() {
        let a = state(false);
        let mut group = ActionGroup::new();
        group.add(a.clone());
        group.set_selected(&a, true);

        group.set_selected(&a, false);
        assert!(group.is_selected(&a));
        assert!(a.is_selected());
    }

    #[test]
    fn test_clear_selection() {
        let a = state(true);
        let mut group = ActionGroup::new();
        group.add(a.clone());

        group.clear_selection();
        assert!(!a.is_selected());
        assert!(group.selection().is_none());
    }

    #[test]
    fn test_adding_a_member_twice_keeps_the_selection() {
        let a = state(true);
        let mut group = ActionGroup::new();
        assert!(group.add(a.clone()));

        assert!(!group.add(a.clone()));
        assert_eq!(group.len(), 1);
        assert!(a.is_selected());
        assert!(group.is_selected(&a));
    }

    #[test]
    fn test_remove_selected_member() {
        let a = state(true);
        let mut group = ActionGroup::new();
        group.add(a.clone());

        assert!(group.remove(&a));
        assert!(group.selection().is_none());
        assert!(!group.remove(&a));
    }
}
