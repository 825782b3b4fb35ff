//! In-memory history of entered command lines with a navigation cursor.

use crate::config::HistoryConfig;
use std::collections::VecDeque;
use tracing::trace;

/// Bounded, optionally deduplicating history of command lines.
///
/// Entries are always kept in insertion order. When duplicates are disallowed, entering a
/// line that is already remembered moves it to the most recent position. The cursor sits
/// "past the last entry" after every successful [`HistoryBuffer::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    // None until navigation starts: resolves to `entries.len()`
    position: Option<usize>,
    config: HistoryConfig,
}

impl HistoryBuffer {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            position: None,
            config,
        }
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remembered lines, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Records `line` as the most recent entry.
    ///
    /// Returns false when the history is disabled (`max_size == 0`).
    pub fn add(&mut self, line: impl Into<String>) -> bool {
        if self.config.max_size == 0 {
            return false;
        }
        let line = line.into();

        if !self.config.allow_duplicates {
            self.entries.retain(|entry| *entry != line);
        }
        if !self.config.unlimited {
            while self.entries.len() >= self.config.max_size {
                self.entries.pop_front();
            }
        }

        trace!(line = %line, size = self.entries.len() + 1, "history entry added");
        self.entries.push_back(line);
        self.position = None;
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = None;
    }

    /// Restores the default bounds and policy, keeping the most recent entries that fit.
    pub fn reset(&mut self) {
        self.config = HistoryConfig::default();
        self.rebuild();
    }

    pub fn set_allow_duplicates(&mut self, allow_duplicates: bool) {
        if self.config.allow_duplicates != allow_duplicates {
            self.config.allow_duplicates = allow_duplicates;
            self.rebuild();
        }
    }

    pub fn set_unlimited(&mut self, unlimited: bool) {
        if self.config.unlimited != unlimited {
            self.config.unlimited = unlimited;
            self.rebuild();
        }
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        if self.config.max_size != max_size {
            self.config.max_size = max_size;
            self.rebuild();
        }
    }

    /// Cursor position; `len()` means "past the last entry".
    pub fn position(&self) -> usize {
        self.position.unwrap_or(self.entries.len())
    }

    /// Entry under the cursor, if the cursor is on one.
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.position()).map(String::as_str)
    }

    /// Moves the cursor one entry back (it stops on the oldest entry).
    pub fn previous(&mut self) -> Option<String> {
        let position = self.position();
        self.position = Some(position.saturating_sub(1));
        self.current().map(str::to_string)
    }

    /// Moves the cursor one entry forward (it stops past the last entry).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        let position = self.position();
        self.position = Some(if position < self.entries.len() {
            position + 1
        } else {
            position
        });
        self.current().map(str::to_string)
    }

    fn rebuild(&mut self) {
        if self.config.max_size == 0 {
            self.entries.clear();
        } else {
            if !self.config.allow_duplicates {
                let mut kept: VecDeque<String> = VecDeque::with_capacity(self.entries.len());
                // walk newest first so the most recent occurrence survives
                for entry in self.entries.drain(..).rev() {
                    if !kept.contains(&entry) {
                        kept.push_front(entry);
                    }
                }
                self.entries = kept;
            }
            if !self.config.unlimited {
                while self.entries.len() > self.config.max_size {
                    self.entries.pop_front();
                }
            }
        }
        self.position = None;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryBuffer;
    use crate::config::HistoryConfig;
    use pretty_assertions::assert_eq;

    fn lines(history: &HistoryBuffer) -> Vec<&str> {
        history.entries().collect()
    }

    #[test]
    fn test_bounded_history_evicts_oldest() {
        let mut history = HistoryBuffer::new(HistoryConfig::bounded(3));
        for line in ["a", "b", "c", "d"] {
            assert!(history.add(line));
        }
        assert_eq!(lines(&history), ["b", "c", "d"]);
        assert_eq!(history.position(), 3);
        assert_eq!(history.current(), None);
    }

    #[test]
    fn test_navigation() {
        let mut history = HistoryBuffer::default();
        history.add("a");
        history.add("b");

        assert_eq!(history.previous().as_deref(), Some("b"));
        assert_eq!(history.previous().as_deref(), Some("a"));
        assert_eq!(history.previous().as_deref(), Some("a"));
        assert_eq!(history.next().as_deref(), Some("b"));
        assert_eq!(history.next(), None);
        assert_eq!(history.next(), None);
        assert_eq!(history.previous().as_deref(), Some("b"));
    }

    #[test]
    fn test_add_resets_cursor() {
        let mut history = HistoryBuffer::default();
        history.add("a");
        history.add("b");
        history.previous();
        history.previous();
        assert_eq!(history.position(), 0);

        history.add("c");
        assert_eq!(history.position(), 3);
        assert_eq!(history.previous().as_deref(), Some("c"));
    }

    #[test]
    fn test_navigation_on_empty_history() {
        let mut history = HistoryBuffer::default();
        assert_eq!(history.previous(), None);
        assert_eq!(history.next(), None);
        assert_eq!(history.position(), 0);
    }

    #[test]
    fn test_zero_capacity_disables_history() {
        let mut history = HistoryBuffer::new(HistoryConfig::bounded(0));
        assert!(!history.add("a"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_unlimited_ignores_max_size() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            max_size: 2,
            allow_duplicates: true,
            unlimited: true,
        });
        for line in ["a", "b", "c"] {
            history.add(line);
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_duplicates_move_to_end_when_disallowed() {
        let mut history = HistoryBuffer::new(HistoryConfig {
            max_size: 3,
            allow_duplicates: false,
            unlimited: false,
        });
        for line in ["a", "b", "c", "a"] {
            assert!(history.add(line));
        }
        assert_eq!(lines(&history), ["b", "c", "a"]);

        history.add("d");
        assert_eq!(lines(&history), ["c", "a", "d"]);
    }

    #[test]
    fn test_policy_change_keeps_most_recent_entries() {
        let mut history = HistoryBuffer::default();
        for line in ["a", "b", "a", "c", "b"] {
            history.add(line);
        }

        history.set_allow_duplicates(false);
        assert_eq!(lines(&history), ["a", "c", "b"]);

        history.set_max_size(2);
        assert_eq!(history.len(), 3, "unlimited history ignores the bound");

        history.set_unlimited(false);
        assert_eq!(lines(&history), ["c", "b"]);

        history.set_max_size(0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut history = HistoryBuffer::new(HistoryConfig::bounded(1));
        history.add("a");
        history.reset();
        assert_eq!(history.config(), HistoryConfig::default());
        assert_eq!(lines(&history), ["a"]);

        history.clear();
        assert!(history.is_empty());
    }
}
