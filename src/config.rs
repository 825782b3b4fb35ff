use crate::level::PublicationLevel;

/// Prompt shown before each command line.
pub const DEFAULT_PROMPT: &str = "> ";

/// Bounds and deduplication policy of the command history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of remembered lines; 0 disables the history entirely.
    pub max_size: usize,
    /// When false, re-entering a remembered line moves it to the most recent position.
    pub allow_duplicates: bool,
    /// When true, `max_size` is ignored (but 0 still disables the history).
    pub unlimited: bool,
}

impl HistoryConfig {
    pub const DEFAULT_MAX_SIZE: usize = 50;
    pub const DEFAULT_ALLOW_DUPLICATES: bool = true;
    pub const DEFAULT_UNLIMITED: bool = true;

    /// Bounded history keeping at most `max_size` lines, duplicates allowed.
    pub fn bounded(max_size: usize) -> Self {
        Self {
            max_size,
            allow_duplicates: true,
            unlimited: false,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: Self::DEFAULT_MAX_SIZE,
            allow_duplicates: Self::DEFAULT_ALLOW_DUPLICATES,
            unlimited: Self::DEFAULT_UNLIMITED,
        }
    }
}

/// Settings of one interpreter instance.
///
/// The binary fills this from its command-line flags; embedders build it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub history: HistoryConfig,
    /// Publication threshold: messages less severe than this are not shown.
    pub level: PublicationLevel,
    pub prompt: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            level: PublicationLevel::default(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}
