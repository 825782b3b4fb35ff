//! An embeddable core for line-oriented command shells.
//!
//! A raw input line is split into a command identifier and arguments with shell-like
//! quoting rules, the identifier is resolved against a registry of pluggable [`Action`]s,
//! and the action runs against a [`Dispatcher`] that reports to a [`View`]. Actions that
//! cannot finish synchronously start background units through [`Context::spawn`]; the
//! dispatcher keeps input locked until they are done or cancelled. Entered lines are kept
//! in a bounded, navigable [`HistoryBuffer`].
//!
//! [`Interpreter`] wires the stock builtins to a console view and drives them from a line
//! editor or from standard input.

pub mod builtin;
pub mod combo;
pub mod command;
pub mod config;
mod dispatcher;
pub mod error;
pub mod group;
pub mod history;
mod interpreter;
pub mod level;
pub mod lexer;
pub mod registry;
pub mod switch;
pub mod task;
pub mod view;

pub use combo::{Choice, ComboAction};
pub use command::{Action, ActionRef, ExitCode, Status};
pub use config::{HistoryConfig, ShellConfig};
pub use dispatcher::{Context, Dispatcher};
pub use error::{Result, ShellError};
pub use group::ActionGroup;
pub use history::HistoryBuffer;
/// Just a convenient re-export of the console front end.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use level::PublicationLevel;
pub use registry::ActionRegistry;
pub use switch::{Switch, SwitchAction};
pub use task::{Executor, ThreadExecutor, Worker};
pub use view::{ConsoleView, SharedBuffer, View};
