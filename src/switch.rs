//! On/off actions: `mode on`, `mode off`, or just `mode` to toggle.

use crate::command::{Action, IdentifiersLabel, Status, render_arguments};
use crate::dispatcher::Context;
use crate::group::{ActionGroup, Selectable, SwitchState};
use crate::level::PublicationLevel;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub const ON_ARGUMENTS: [&str; 4] = ["1", "TRUE", "Y", "ON"];
pub const OFF_ARGUMENTS: [&str; 4] = ["0", "FALSE", "N", "OFF"];

/// Domain side of a switch action.
pub trait Switch: Send + Sync {
    fn identifiers(&self) -> Vec<String>;

    fn brief_help(&self) -> String;

    /// Turns the underlying feature on or off. Returning false refuses the change and the
    /// switch keeps its previous state.
    fn apply(&self, ctx: &Context<'_>, on: bool) -> bool;

    /// State of the underlying feature when it can change behind the action's back.
    /// Toggling starts from this value; `None` falls back to the action's own flag.
    fn current(&self, _ctx: &Context<'_>) -> Option<bool> {
        None
    }

    /// Upper-case values accepted as "on".
    fn on_arguments(&self) -> &[&str] {
        &ON_ARGUMENTS
    }

    /// Upper-case values accepted as "off".
    fn off_arguments(&self) -> &[&str] {
        &OFF_ARGUMENTS
    }
}

/// Shared radio group of switch states.
pub type SwitchGroup = Arc<Mutex<ActionGroup<SwitchState>>>;

/// Action adapter turning a [`Switch`] into a command taking an optional on/off argument.
pub struct SwitchAction<S> {
    switch: S,
    state: Arc<SwitchState>,
    group: Option<SwitchGroup>,
    label: IdentifiersLabel,
}

impl<S: Switch> SwitchAction<S> {
    pub fn new(switch: S, selected: bool) -> Self {
        Self {
            switch,
            state: Arc::new(SwitchState::new(selected)),
            group: None,
            label: IdentifiersLabel::new(),
        }
    }

    /// Switch joining `group`; it starts selected only if `selected` and the group has no
    /// selection yet.
    pub fn in_group(switch: S, selected: bool, group: &SwitchGroup) -> Self {
        let state = Arc::new(SwitchState::new(selected));
        group.lock().add(Arc::clone(&state));
        Self {
            switch,
            state,
            group: Some(Arc::clone(group)),
            label: IdentifiersLabel::new(),
        }
    }

    pub fn switch(&self) -> &S {
        &self.switch
    }

    pub fn is_selected(&self) -> bool {
        self.state.is_selected()
    }

    pub fn state(&self) -> &Arc<SwitchState> {
        &self.state
    }

    fn parse(&self, argument: &str) -> Option<bool> {
        let argument = argument.trim().to_uppercase();
        if self.switch.on_arguments().contains(&argument.as_str()) {
            Some(true)
        } else if self.switch.off_arguments().contains(&argument.as_str()) {
            Some(false)
        } else {
            None
        }
    }

    fn set_selected(&self, on: bool) {
        match &self.group {
            Some(group) => {
                let mut group = group.lock();
                if on {
                    group.set_selected(&self.state, true);
                } else if group.is_selected(&self.state) {
                    group.clear_selection();
                } else {
                    self.state.set_selected(false);
                }
            }
            None => self.state.set_selected(on),
        }
    }

    fn usage(&self) -> String {
        let ids = self.identifiers_display();
        format!(
            "{}\n\t{ids}\n\nYou can switch mode as follow:\n\t{ids} {}\n\t{ids} {}",
            self.brief_help(),
            render_arguments(self.switch.on_arguments()),
            render_arguments(self.switch.off_arguments()),
        )
    }
}

impl<S: Switch> Action for SwitchAction<S> {
    fn identifiers(&self) -> Vec<String> {
        self.switch.identifiers()
    }

    fn identifiers_display(&self) -> String {
        self.label
            .get_or_render(|| self.switch.identifiers())
            .to_string()
    }

    fn brief_help(&self) -> String {
        self.switch.brief_help()
    }

    fn help(&self, _ctx: &Context<'_>) -> String {
        self.usage()
    }

    fn run(&self, ctx: &Context<'_>, args: &[String]) -> Status {
        let on = match args {
            [] | [_] => !self.switch.current(ctx).unwrap_or_else(|| self.is_selected()),
            [_, value] => match self.parse(value) {
                Some(on) => on,
                None => {
                    ctx.publish(
                        PublicationLevel::Warning,
                        format!("{} is not a valid value", value.trim().to_uppercase()),
                    );
                    ctx.publish(PublicationLevel::Warning, self.usage());
                    return Status::Error;
                }
            },
            _ => {
                ctx.publish(PublicationLevel::Warning, self.usage());
                return Status::Error;
            }
        };

        if !self.switch.apply(ctx, on) {
            debug!(on, "switch refused the change");
            return Status::Error;
        }
        self.set_selected(on);
        Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ActionRef;
    use crate::config::ShellConfig;
    use crate::dispatcher::Dispatcher;
    use crate::registry::ActionRegistry;
    use crate::view::RecordingView;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flag {
        id: &'static str,
        value: Arc<AtomicBool>,
        accept: bool,
    }

    impl Flag {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                value: Arc::new(AtomicBool::new(false)),
                accept: true,
            }
        }
    }

    impl Switch for Flag {
        fn identifiers(&self) -> Vec<String> {
            vec![self.id.to_string()]
        }

        fn brief_help(&self) -> String {
            format!("Switch {}", self.id)
        }

        fn apply(&self, _ctx: &Context<'_>, on: bool) -> bool {
            if self.accept {
                self.value.store(on, Ordering::SeqCst);
            }
            self.accept
        }
    }

    fn dispatcher(actions: Vec<ActionRef>) -> (Dispatcher, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new());
        let dispatcher = Dispatcher::new(
            view.clone(),
            ActionRegistry::with_actions(actions),
            &ShellConfig::default(),
        );
        (dispatcher, view)
    }

    #[test]
    fn test_explicit_values() {
        let flag = Flag::new("bell");
        let value = flag.value.clone();
        let action = Arc::new(SwitchAction::new(flag, false));
        let (dispatcher, _) = dispatcher(vec![action.clone()]);

        assert_eq!(dispatcher.interpret("bell on"), Status::Success);
        assert!(action.is_selected());
        assert!(value.load(Ordering::SeqCst));

        assert_eq!(dispatcher.interpret("bell \" false \""), Status::Success);
        assert!(!action.is_selected());

        assert_eq!(dispatcher.interpret("bell y"), Status::Success);
        assert!(action.is_selected());
    }

    #[test]
    fn test_no_argument_toggles() {
        let action = Arc::new(SwitchAction::new(Flag::new("bell"), true));
        let (dispatcher, _) = dispatcher(vec![action.clone()]);

        dispatcher.interpret("bell");
        assert!(!action.is_selected());
        dispatcher.interpret("bell");
        assert!(action.is_selected());
    }

    #[test]
    fn test_invalid_value_warns_with_help() {
        let action = Arc::new(SwitchAction::new(Flag::new("bell"), false));
        let (dispatcher, view) = dispatcher(vec![action.clone()]);

        assert_eq!(dispatcher.interpret("bell maybe"), Status::Error);
        let messages = view.messages();
        assert_eq!(messages[0], "MAYBE is not a valid value");
        assert_eq!(
            messages[1],
            "Switch bell\n\t{ bell }\n\nYou can switch mode as follow:\n\
             \t{ bell } [ 1 | TRUE | Y | ON ]\n\t{ bell } [ 0 | FALSE | N | OFF ]"
        );
        assert!(!action.is_selected());
    }

    #[test]
    fn test_extra_arguments_are_rejected() {
        let action = Arc::new(SwitchAction::new(Flag::new("bell"), false));
        let (dispatcher, view) = dispatcher(vec![action.clone()]);

        assert_eq!(dispatcher.interpret("bell on off"), Status::Error);
        assert_eq!(view.messages().len(), 1);
        assert!(!action.is_selected());
    }

    #[test]
    fn test_refused_change_keeps_state() {
        let mut flag = Flag::new("bell");
        flag.accept = false;
        let action = Arc::new(SwitchAction::new(flag, false));
        let (dispatcher, _) = dispatcher(vec![action.clone()]);

        assert_eq!(dispatcher.interpret("bell on"), Status::Error);
        assert!(!action.is_selected());
    }

    #[test]
    fn test_group_is_radio() {
        let group = SwitchGroup::default();
        let left = Arc::new(SwitchAction::in_group(Flag::new("left"), true, &group));
        let right = Arc::new(SwitchAction::in_group(Flag::new("right"), true, &group));
        let (dispatcher, _) = dispatcher(vec![left.clone(), right.clone()]);

        assert!(left.is_selected());
        assert!(!right.is_selected());

        dispatcher.interpret("right on");
        assert!(!left.is_selected());
        assert!(right.is_selected());
        assert!(group.lock().is_selected(right.state()));

        dispatcher.interpret("right off");
        assert!(!right.is_selected());
        assert!(group.lock().selection().is_none());
    }
}
