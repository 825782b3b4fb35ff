use crate::builtin::default_actions;
use crate::command::{ActionRef, ExitCode, Status};
use crate::config::ShellConfig;
use crate::dispatcher::Dispatcher;
use crate::history::HistoryBuffer;
use crate::registry::ActionRegistry;
use crate::view::ConsoleView;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Line-driven front end: feeds lines to a [`Dispatcher`] that reports to a
/// [`ConsoleView`], waiting for background commands before reading the next line.
///
/// Example
/// ```
/// use line_interpreter::{Interpreter, SharedBuffer, ShellConfig, Status};
/// let out = SharedBuffer::new();
/// let interpreter = Interpreter::new(ShellConfig::default(), out.clone(), false);
/// assert_eq!(interpreter.run_line("echo hello world"), Status::Success);
/// assert_eq!(out.contents(), "hello world\n");
/// ```
pub struct Interpreter<W: Write + Send + 'static> {
    dispatcher: Dispatcher,
    view: Arc<ConsoleView<W>>,
}

impl<W: Write + Send + 'static> Interpreter<W> {
    /// Interpreter with the stock actions, writing to `out`.
    pub fn new(config: ShellConfig, out: W, echo_prompt: bool) -> Self {
        let actions = default_actions(&config);
        Self::with_actions(config, out, echo_prompt, actions)
    }

    pub fn with_actions(
        config: ShellConfig,
        out: W,
        echo_prompt: bool,
        actions: impl IntoIterator<Item = ActionRef>,
    ) -> Self {
        let view = Arc::new(ConsoleView::new(out, config.prompt.clone(), echo_prompt));
        let dispatcher = Dispatcher::new(
            view.clone(),
            ActionRegistry::with_actions(actions),
            &config,
        );
        Self { dispatcher, view }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Interprets `line` and blocks until the console is ready for the next one, that is
    /// until the command, background part included, has finished or been cancelled.
    pub fn run_line(&self, line: &str) -> Status {
        let status = self.dispatcher.interpret(line);
        self.view.wait_until_ready();
        status
    }

    /// Interprets every line of `input` until it ends or `exit` is entered.
    ///
    /// Returns the exit code of the last non-blank line.
    pub fn run_batch(&self, input: impl BufRead) -> anyhow::Result<ExitCode> {
        let mut code = 0;
        for line in input.lines() {
            let line = line.context("failed to read input line")?;
            if line.trim().is_empty() {
                continue;
            }
            code = self.run_line(&line).exit_code();
            if self.dispatcher.exit_requested() {
                debug!("exit requested");
                break;
            }
        }
        self.dispatcher.wait_until_idle();
        Ok(code)
    }

    /// Interactive Read-Eval-Print Loop on a line editor.
    pub fn repl(&self) -> anyhow::Result<ExitCode> {
        let mut rl = DefaultEditor::new().context("failed to start line editor")?;
        let mut code = 0;

        loop {
            let readline = rl.readline(self.view.prompt());
            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    code = self.run_line(&line).exit_code();
                    mirror_history(rl.history_mut(), &self.dispatcher.history())
                        .context("failed to update editor history")?;
                    if self.dispatcher.exit_requested() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    info!("interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    debug!("end of input");
                    break;
                }
                Err(err) => return Err(err).context("failed to read line"),
            }
        }

        self.dispatcher.wait_until_idle();
        Ok(code)
    }
}

/// Makes the editor's recall list match `history`, so the arrow keys walk the same lines
/// the `history` builtin shows, under the same size and duplicate policy.
fn mirror_history(editor: &mut impl History, history: &HistoryBuffer) -> rustyline::Result<()> {
    editor.ignore_dups(false)?;
    editor.clear()?;
    editor.set_max_len(history.len().max(1))?;
    for line in history.entries() {
        editor.add(line)?;
    }
    Ok(())
}
