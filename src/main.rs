use anyhow::Context;
use argh::FromArgs;
use line_interpreter::{HistoryConfig, Interpreter, PublicationLevel, ShellConfig};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Line-oriented command interpreter.
struct Args {
    #[argh(option, default = "PublicationLevel::Warning")]
    /// publication threshold: SUCCESS, FATAL_ERROR, ERROR, WARNING, INFO, DEBUG or TRACE.
    level: PublicationLevel,

    #[argh(option, default = "HistoryConfig::DEFAULT_MAX_SIZE")]
    /// number of remembered lines; 0 disables the history.
    history_size: usize,

    #[argh(switch)]
    /// re-entering a remembered line moves it instead of duplicating it.
    no_duplicates: bool,

    #[argh(switch)]
    /// enforce --history-size (by default it only matters when 0).
    bounded_history: bool,

    #[argh(option)]
    /// prompt shown before each line.
    prompt: Option<String>,

    #[argh(switch)]
    /// read lines from standard input even when it is a terminal.
    batch: bool,

    #[argh(option, short = 'c')]
    /// interpret this single line and exit.
    command: Option<String>,
}

impl Args {
    fn config(&self) -> ShellConfig {
        let defaults = ShellConfig::default();
        ShellConfig {
            history: HistoryConfig {
                max_size: self.history_size,
                allow_duplicates: !self.no_duplicates,
                unlimited: !self.bounded_history,
            },
            level: self.level,
            prompt: self.prompt.clone().unwrap_or(defaults.prompt),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Args = argh::from_env();
    let interactive = !args.batch && args.command.is_none() && std::io::stdin().is_terminal();
    let interpreter = Interpreter::new(args.config(), std::io::stdout(), false);

    let code = match &args.command {
        Some(line) => interpreter.run_line(line).exit_code(),
        None if interactive => interpreter.repl()?,
        None => interpreter
            .run_batch(std::io::stdin().lock())
            .context("batch input failed")?,
    };
    std::process::exit(code)
}
