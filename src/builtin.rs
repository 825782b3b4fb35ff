use crate::combo::{Choice, ComboAction};
use crate::command::{Action, ActionRef, IdentifiersLabel, Status};
use crate::config::ShellConfig;
use crate::dispatcher::Context;
use crate::level::PublicationLevel;
use crate::switch::{Switch, SwitchAction};
use argh::{EarlyExit, FromArgs};
use regex::RegexBuilder;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Actions shipped with the interpreter.
///
/// Builtins are parsed with [`argh`] (`FromArgs`) from the arguments following the command
/// identifier, and run in-process against the calling dispatcher.
pub trait BuiltinCommand: Sized + FromArgs {
    /// Canonical identifier, e.g. "echo".
    fn name() -> &'static str;

    /// Further identifiers the command answers to.
    fn aliases() -> &'static [&'static str] {
        &[]
    }

    fn brief() -> &'static str;

    fn execute(self, ctx: &Context<'_>) -> Status;
}

/// [`Action`] adapter for a [`BuiltinCommand`].
pub struct Builtin<T> {
    label: IdentifiersLabel,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            label: IdentifiersLabel::new(),
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> Builtin<T> {
    pub fn action() -> ActionRef {
        Arc::new(Self::default())
    }
}

impl<T: BuiltinCommand> Action for Builtin<T> {
    fn identifiers(&self) -> Vec<String> {
        std::iter::once(T::name())
            .chain(T::aliases().iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn identifiers_display(&self) -> String {
        self.label.get_or_render(|| self.identifiers()).to_string()
    }

    fn brief_help(&self) -> String {
        T::brief().to_string()
    }

    fn help(&self, _ctx: &Context<'_>) -> String {
        match T::from_args(&[T::name()], &["--help"]) {
            Err(EarlyExit { output, .. }) => output.trim_end().to_string(),
            Ok(_) => self.brief_help(),
        }
    }

    fn run(&self, ctx: &Context<'_>, args: &[String]) -> Status {
        let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
        match T::from_args(&[T::name()], &rest) {
            Ok(cmd) => cmd.execute(ctx),
            Err(EarlyExit { output, status }) => {
                let output = output.trim_end();
                if status.is_ok() {
                    ctx.publish(PublicationLevel::Success, output);
                    Status::Success
                } else {
                    debug!(command = T::name(), "invalid builtin arguments");
                    ctx.publish(PublicationLevel::Warning, output);
                    Status::Error
                }
            }
        }
    }
}

/// The stock action set.
pub fn default_actions(config: &ShellConfig) -> Vec<ActionRef> {
    vec![
        Builtin::<Echo>::action(),
        Builtin::<Help>::action(),
        Builtin::<History>::action(),
        Arc::new(ComboAction::new(LevelChoice, Some(&config.level))),
        Builtin::<Sleep>::action(),
        Builtin::<Cancel>::action(),
        Builtin::<Exit>::action(),
        Arc::new(SwitchAction::new(
            HistoryDuplicates,
            config.history.allow_duplicates,
        )),
    ]
}

#[derive(FromArgs)]
/// Publish the arguments, separated by spaces.
pub struct Echo {
    #[argh(option, short = 'l', default = "PublicationLevel::Success")]
    /// publication level of the message (default SUCCESS).
    pub level: PublicationLevel,

    #[argh(positional, greedy)]
    /// values to publish as-is.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn brief() -> &'static str {
        "Display a line of text"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        ctx.publish(self.level, self.args.join(" "));
        Status::Success
    }
}

#[derive(FromArgs)]
/// List the available commands, or show the help of one command.
pub struct Help {
    #[argh(positional)]
    /// command to describe.
    pub command: Option<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn brief() -> &'static str {
        "Display help about commands"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        let dispatcher = ctx.dispatcher();
        match self.command {
            Some(identifier) => match dispatcher.action_for(&identifier) {
                Some(action) => {
                    ctx.publish(PublicationLevel::Success, action.help(ctx));
                    Status::Success
                }
                None => {
                    ctx.publish(
                        PublicationLevel::Warning,
                        format!("Command not found: {identifier}"),
                    );
                    Status::Error
                }
            },
            None => {
                let mut entries: Vec<(String, String)> = dispatcher
                    .registry()
                    .actions()
                    .iter()
                    .map(|action| (action.identifiers_display(), action.brief_help()))
                    .collect();
                entries.sort();
                let width = entries.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0);
                let listing: Vec<String> = entries
                    .iter()
                    .map(|(ids, brief)| format!("{ids:<width$}  {brief}"))
                    .collect();
                ctx.publish(PublicationLevel::Success, listing.join("\n"));
                Status::Success
            }
        }
    }
}

#[derive(FromArgs)]
/// Show the command history, optionally filtered by a regular expression.
pub struct History {
    #[argh(switch, short = 'c')]
    /// forget every remembered line.
    pub clear: bool,

    #[argh(positional)]
    /// case-insensitive regular expression selecting the lines to show.
    pub pattern: Option<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn brief() -> &'static str {
        "Display or clear the command history"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        let dispatcher = ctx.dispatcher();
        if self.clear {
            dispatcher.with_history_mut(|history| history.clear());
            return Status::Success;
        }

        let filter = match self.pattern.as_deref().map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
        }) {
            Some(Ok(regex)) => Some(regex),
            Some(Err(err)) => {
                ctx.publish(PublicationLevel::Warning, format!("history: {err}"));
                return Status::Error;
            }
            None => None,
        };

        let history = dispatcher.history();
        let lines: Vec<String> = history
            .entries()
            .enumerate()
            .filter(|(_, line)| filter.as_ref().is_none_or(|regex| regex.is_match(line)))
            .map(|(n, line)| format!("{:>5}  {line}", n + 1))
            .collect();
        if !lines.is_empty() {
            ctx.publish(PublicationLevel::Success, lines.join("\n"));
        }
        Status::Success
    }
}

/// Publication level as a combo: `level` shows it, `level info` changes it.
pub struct LevelChoice;

impl Choice for LevelChoice {
    type Value = PublicationLevel;

    fn identifiers(&self) -> Vec<String> {
        vec!["level".to_string()]
    }

    fn brief_help(&self) -> String {
        "Display or change the publication level".to_string()
    }

    fn values(&self) -> Vec<PublicationLevel> {
        PublicationLevel::ALL.to_vec()
    }

    fn apply(&self, ctx: &Context<'_>, value: &PublicationLevel) -> bool {
        ctx.dispatcher().set_level(*value);
        true
    }

    fn current(&self, ctx: &Context<'_>) -> Option<PublicationLevel> {
        Some(ctx.level())
    }
}

#[derive(FromArgs)]
/// Wait in the background for the given number of seconds.
pub struct Sleep {
    #[argh(positional)]
    /// duration in seconds, fractions allowed.
    pub seconds: f64,
}

const SLEEP_SLICE: Duration = Duration::from_millis(20);

impl BuiltinCommand for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn brief() -> &'static str {
        "Wait in the background"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        let Ok(duration) = Duration::try_from_secs_f64(self.seconds) else {
            ctx.publish(
                PublicationLevel::Warning,
                format!("sleep: invalid duration {}", self.seconds),
            );
            return Status::Error;
        };

        let spawned = ctx.spawn(move |worker| {
            let deadline = Instant::now() + duration;
            loop {
                if worker.is_cancelled() {
                    debug!(task = %worker.id(), "sleep cancelled");
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(SLEEP_SLICE.min(deadline - now));
            }
            worker.publish(PublicationLevel::Info, format!("Slept {}s", duration.as_secs_f64()));
        });

        match spawned {
            Ok(_) => Status::InProgress,
            Err(err) => {
                ctx.publish(PublicationLevel::Error, format!("sleep: {err}"));
                Status::Error
            }
        }
    }
}

#[derive(FromArgs)]
/// Stop the background work of a command.
pub struct Cancel {
    #[argh(positional)]
    /// command whose background work should stop.
    pub command: String,
}

impl BuiltinCommand for Cancel {
    fn name() -> &'static str {
        "cancel"
    }

    fn brief() -> &'static str {
        "Cancel a command running in the background"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        let dispatcher = ctx.dispatcher();
        let Some(action) = dispatcher.action_for(&self.command) else {
            ctx.publish(
                PublicationLevel::Warning,
                format!("Command not found: {}", self.command),
            );
            return Status::Error;
        };
        if !dispatcher.cancel(&action) {
            ctx.publish(
                PublicationLevel::Info,
                format!("Nothing to cancel: {}", self.command),
            );
        }
        Status::Success
    }
}

#[derive(FromArgs)]
/// Leave the interpreter.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn aliases() -> &'static [&'static str] {
        &["quit"]
    }

    fn brief() -> &'static str {
        "Leave the interpreter"
    }

    fn execute(self, ctx: &Context<'_>) -> Status {
        ctx.dispatcher().request_exit();
        Status::Success
    }
}

/// Switch allowing or forbidding duplicate lines in the history.
pub struct HistoryDuplicates;

impl Switch for HistoryDuplicates {
    fn identifiers(&self) -> Vec<String> {
        vec!["duplicates".to_string()]
    }

    fn brief_help(&self) -> String {
        "Allow or forbid duplicate lines in the history".to_string()
    }

    fn apply(&self, ctx: &Context<'_>, on: bool) -> bool {
        ctx.dispatcher()
            .with_history_mut(|history| history.set_allow_duplicates(on));
        true
    }

    fn current(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(ctx.dispatcher().history().config().allow_duplicates)
    }
}
