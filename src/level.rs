use crate::error::ShellError;
use std::fmt;
use std::str::FromStr;

/// Severity of a published message, from most to least severe.
///
/// The ordering is the declaration order: a message passes a threshold when its level
/// compares less than or equal to it, so `SUCCESS` and `FATAL_ERROR` are shown at every
/// threshold while `TRACE` is shown only at `TRACE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PublicationLevel {
    Success,
    FatalError,
    Error,
    #[default]
    Warning,
    Info,
    Debug,
    Trace,
}

impl PublicationLevel {
    /// Every level, most severe first.
    pub const ALL: [PublicationLevel; 7] = [
        PublicationLevel::Success,
        PublicationLevel::FatalError,
        PublicationLevel::Error,
        PublicationLevel::Warning,
        PublicationLevel::Info,
        PublicationLevel::Debug,
        PublicationLevel::Trace,
    ];

    /// Canonical upper-case name, e.g. `FATAL_ERROR`.
    pub fn name(self) -> &'static str {
        match self {
            PublicationLevel::Success => "SUCCESS",
            PublicationLevel::FatalError => "FATAL_ERROR",
            PublicationLevel::Error => "ERROR",
            PublicationLevel::Warning => "WARNING",
            PublicationLevel::Info => "INFO",
            PublicationLevel::Debug => "DEBUG",
            PublicationLevel::Trace => "TRACE",
        }
    }

    /// Whether a message at this level is surfaced under `threshold`.
    pub fn passes(self, threshold: PublicationLevel) -> bool {
        self <= threshold
    }
}

impl fmt::Display for PublicationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PublicationLevel {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        PublicationLevel::ALL
            .into_iter()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| ShellError::UnknownLevel(s.to_string()))
    }
}
