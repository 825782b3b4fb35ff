//! Actions choosing one value out of a fixed set: `mode fast`, `mode slow`.

use crate::command::{Action, ActionRef, IdentifiersLabel, Status, render_arguments};
use crate::dispatcher::Context;
use crate::group::{ActionGroup, Selectable, SwitchState};
use crate::level::PublicationLevel;
use crate::switch::{Switch, SwitchAction};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Domain side of a combo action.
pub trait Choice: Send + Sync + 'static {
    type Value: Clone + PartialEq + fmt::Display + Send + Sync + 'static;

    fn identifiers(&self) -> Vec<String>;

    fn brief_help(&self) -> String;

    /// Every selectable value, in the order help lists them.
    fn values(&self) -> Vec<Self::Value>;

    /// Arguments selecting `value`. Matching is case-insensitive.
    fn arguments(&self, value: &Self::Value) -> Vec<String> {
        vec![value.to_string()]
    }

    /// Makes `value` effective. Returning false refuses it and the selection stays put.
    fn apply(&self, ctx: &Context<'_>, value: &Self::Value) -> bool;

    /// Value in effect when it can change behind the action's back.
    fn current(&self, _ctx: &Context<'_>) -> Option<Self::Value> {
        None
    }
}

/// Action adapter turning a [`Choice`] into a command taking one value argument.
///
/// Without an argument it publishes the value in effect. Each value is backed by a
/// [`SwitchState`] in a private radio group, which [`ComboAction::element_actions`] exposes
/// as one on/off command per value.
pub struct ComboAction<C: Choice> {
    choice: C,
    values: Vec<C::Value>,
    states: Vec<Arc<SwitchState>>,
    group: Mutex<ActionGroup<SwitchState>>,
    by_argument: HashMap<String, usize>,
    label: IdentifiersLabel,
}

impl<C: Choice> ComboAction<C> {
    pub fn new(choice: C, selected: Option<&C::Value>) -> Self {
        let values = choice.values();
        let mut group = ActionGroup::new();
        let states: Vec<Arc<SwitchState>> = values
            .iter()
            .map(|value| {
                let state = Arc::new(SwitchState::new(selected == Some(value)));
                group.add(Arc::clone(&state));
                state
            })
            .collect();

        let mut by_argument = HashMap::new();
        for (index, value) in values.iter().enumerate() {
            for argument in choice.arguments(value) {
                by_argument
                    .entry(argument.trim().to_uppercase())
                    .or_insert(index);
            }
        }

        Self {
            choice,
            values,
            states,
            group: Mutex::new(group),
            by_argument,
            label: IdentifiersLabel::new(),
        }
    }

    pub fn choice(&self) -> &C {
        &self.choice
    }

    pub fn values(&self) -> &[C::Value] {
        &self.values
    }

    /// Value selected through this action, if any.
    pub fn selected(&self) -> Option<C::Value> {
        self.selected_index().map(|index| self.values[index].clone())
    }

    fn selected_index(&self) -> Option<usize> {
        let group = self.group.lock();
        let selection = group.selection()?;
        self.states.iter().position(|state| Arc::ptr_eq(state, selection))
    }

    fn current_index(&self, ctx: &Context<'_>) -> Option<usize> {
        match self.choice.current(ctx) {
            Some(value) => self.values.iter().position(|v| *v == value),
            None => self.selected_index(),
        }
    }

    fn lookup(&self, argument: &str) -> Option<usize> {
        self.by_argument.get(argument).copied()
    }

    fn select(&self, ctx: &Context<'_>, index: usize) -> bool {
        let value = &self.values[index];
        if !self.choice.apply(ctx, value) {
            debug!(%value, "choice refused the value");
            return false;
        }
        self.group.lock().set_selected(&self.states[index], true);
        true
    }

    fn usage(&self) -> String {
        let ids = self.identifiers_display();
        let mut usage = format!(
            "{}\n\t{ids}\n\nYou can set the value as follow:",
            self.brief_help()
        );
        for value in &self.values {
            usage.push_str(&format!(
                "\n\t{ids} {}",
                render_arguments(self.choice.arguments(value))
            ));
        }
        usage
    }

    /// One switch command per value, named `<identifier>_<value>` after each identifier of
    /// this action. Turning one on selects its value; turning it off is refused.
    pub fn element_actions(self: &Arc<Self>) -> Vec<ActionRef> {
        (0..self.values.len())
            .map(|index| {
                let selected = self.states[index].is_selected();
                let element = ComboElement {
                    combo: Arc::clone(self),
                    index,
                };
                Arc::new(SwitchAction::new(element, selected)) as ActionRef
            })
            .collect()
    }
}

impl<C: Choice> Action for ComboAction<C> {
    fn identifiers(&self) -> Vec<String> {
        self.choice.identifiers()
    }

    fn identifiers_display(&self) -> String {
        self.label
            .get_or_render(|| self.choice.identifiers())
            .to_string()
    }

    fn brief_help(&self) -> String {
        self.choice.brief_help()
    }

    fn help(&self, _ctx: &Context<'_>) -> String {
        self.usage()
    }

    fn run(&self, ctx: &Context<'_>, args: &[String]) -> Status {
        match args {
            [] | [_] => match self.current_index(ctx) {
                Some(index) => {
                    ctx.publish(PublicationLevel::Success, self.values[index].to_string());
                    Status::Success
                }
                None => {
                    ctx.publish(PublicationLevel::Warning, self.usage());
                    Status::Error
                }
            },
            [_, argument] => {
                let argument = argument.trim().to_uppercase();
                let Some(index) = self.lookup(&argument) else {
                    ctx.publish(
                        PublicationLevel::Warning,
                        format!("\"{argument}\" is not a valid value."),
                    );
                    return Status::Error;
                };
                if self.select(ctx, index) {
                    Status::Success
                } else {
                    Status::Error
                }
            }
            _ => {
                ctx.publish(PublicationLevel::Warning, self.usage());
                Status::Error
            }
        }
    }
}

/// Switch standing for one value of a [`ComboAction`].
pub struct ComboElement<C: Choice> {
    combo: Arc<ComboAction<C>>,
    index: usize,
}

impl<C: Choice> ComboElement<C> {
    pub fn value(&self) -> &C::Value {
        &self.combo.values[self.index]
    }
}

impl<C: Choice> Switch for ComboElement<C> {
    fn identifiers(&self) -> Vec<String> {
        let value = self.value();
        self.combo
            .identifiers()
            .into_iter()
            .map(|id| format!("{id}_{value}"))
            .collect()
    }

    fn brief_help(&self) -> String {
        let parent = self.combo.default_identifier().unwrap_or_default();
        format!("Set {parent} to {}", self.value())
    }

    fn apply(&self, ctx: &Context<'_>, on: bool) -> bool {
        on && self.combo.select(ctx, self.index)
    }

    fn current(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(self.combo.current_index(ctx) == Some(self.index))
    }
}
