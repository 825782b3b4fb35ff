use crate::dispatcher::Context;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Shared handle on an action. Registries, groups and dispatchers only ever hold these;
/// the same action may be registered with several dispatchers at once.
pub type ActionRef = Arc<dyn Action>;

/// Outcome of interpreting one command line.
///
/// The numeric codes are stable: `SUCCESS = 0`, `ERROR = 1`, `IN_PROGRESS = 2`,
/// `NOT_FOUND = 4`, `EMPTY = 8`. Actions may return any other code through [`Status::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Error,
    InProgress,
    NotFound,
    Empty,
    Other(u32),
}

impl Status {
    pub fn code(self) -> u32 {
        match self {
            Status::Success => 0,
            Status::Error => 1,
            Status::InProgress => 2,
            Status::NotFound => 4,
            Status::Empty => 8,
            Status::Other(code) => code,
        }
    }

    /// Exit code for a process whose last interpreted line ended with this status.
    ///
    /// Domain codes above 255 saturate to 255 so they never read as success once the OS
    /// truncates them to a byte.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Status::Success | Status::Empty | Status::InProgress => 0,
            Status::Error => 1,
            Status::NotFound => 127,
            Status::Other(code) => ExitCode::from(code.min(255) as u8),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A registrable unit of shell behavior, addressed by one or more case-insensitive
/// identifiers.
///
/// `run` receives the whole argument vector: `args[0]` is the identifier the user typed.
/// Long-running actions start their work through [`Context::spawn`] and return
/// [`Status::InProgress`] without blocking.
pub trait Action: Send + Sync {
    /// Identifiers this action answers to, the first one being the default.
    fn identifiers(&self) -> Vec<String>;

    fn default_identifier(&self) -> Option<String> {
        self.identifiers().into_iter().next()
    }

    /// Identifiers rendered as `{ a | b }`.
    fn identifiers_display(&self) -> String {
        render_identifiers(&self.identifiers())
    }

    /// One-line description.
    fn brief_help(&self) -> String;

    /// Full help text shown by `help <command>`.
    fn help(&self, _ctx: &Context<'_>) -> String {
        format!("{}\n\t{}", self.brief_help(), self.identifiers_display())
    }

    fn run(&self, ctx: &Context<'_>, args: &[String]) -> Status;
}

/// Identity of an action instance, usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ActionKey(usize);

impl ActionKey {
    pub(crate) fn of(action: &ActionRef) -> Self {
        ActionKey(Arc::as_ptr(action) as *const () as usize)
    }
}

pub fn render_identifiers(identifiers: &[String]) -> String {
    format!("{{ {} }}", identifiers.join(" | "))
}

/// Per-instance memo of [`Action::identifiers_display`].
///
/// Actions whose identifiers never change keep one of these as a field and return
/// [`IdentifiersLabel::get_or_render`] from `identifiers_display`.
#[derive(Debug, Default)]
pub struct IdentifiersLabel {
    label: OnceLock<String>,
}

impl IdentifiersLabel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_render(&self, identifiers: impl FnOnce() -> Vec<String>) -> &str {
        self.label.get_or_init(|| render_identifiers(&identifiers()))
    }
}

/// Renders a list of accepted argument values as `[ a | b ]`.
pub fn render_arguments<I, S>(arguments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined: Vec<String> = arguments
        .into_iter()
        .map(|a| a.as_ref().to_string())
        .collect();
    format!("[ {} ]", joined.join(" | "))
}
