/// Errors raised by the library outside of the normal interpretation loop.
///
/// User-input problems (an empty line, an unknown command) are never errors: they are
/// reported through [`crate::Status`] and a published message so the loop can always resume.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("unknown publication level: {0}")]
    UnknownLevel(String),

    #[error("failed to start background worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
