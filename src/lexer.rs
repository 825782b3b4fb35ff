//! Splitting of a raw command line into a command identifier and its arguments.
//!
//! Quoting follows the native `argv` splitting rules: double quotes group words, a
//! backslash only escapes when it precedes a double quote, and an even run of backslashes
//! before a quote is halved while the quote still toggles quoting.

use tracing::trace;

/// Separator between the command identifier and its arguments.
pub const ARGUMENT_SEPARATOR: char = ' ';

/// Character enclosing an argument that contains separators.
pub const ARGUMENT_ENCLOSURE: char = '"';

const ESCAPE: char = '\\';

/// Finite state machine walking the part of the line that follows the identifier.
struct ArgumentFSM {
    input: Vec<char>,
    pos: usize,
    pending_backslashes: usize,
    quoted: bool,
    current: String,
    arguments: Vec<String>,
}

impl ArgumentFSM {
    fn new(arguments: Vec<String>, rest: &str) -> Self {
        ArgumentFSM {
            input: rest.chars().collect(),
            pos: 0,
            pending_backslashes: 0,
            quoted: false,
            current: String::new(),
            arguments,
        }
    }

    fn make_arguments(mut self) -> Vec<String> {
        while let Some(ch) = self.read_char() {
            match ch {
                ESCAPE => self.pending_backslashes += 1,
                ARGUMENT_ENCLOSURE => self.handle_quote(),
                ' ' | '\t' => self.handle_whitespace(ch),
                c => self.push_char(c),
            }
        }

        self.flush_backslashes();
        self.finish_argument();
        self.arguments
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_quote(&mut self) {
        if self.pending_backslashes % 2 == 0 {
            self.pending_backslashes /= 2;
            self.flush_backslashes();
            if !self.quoted {
                self.quoted = true;
            } else if self.peek_char() == Some(ARGUMENT_ENCLOSURE) {
                // `""` inside a quoted part is a literal quote and keeps the part open
                self.read_char();
                self.current.push(ARGUMENT_ENCLOSURE);
            } else {
                self.quoted = false;
            }
        } else {
            self.pending_backslashes = (self.pending_backslashes - 1) / 2;
            self.push_char(ARGUMENT_ENCLOSURE);
        }
    }

    fn handle_whitespace(&mut self, ch: char) {
        self.flush_backslashes();
        if self.quoted {
            self.current.push(ch);
        } else {
            self.finish_argument();
        }
    }

    fn push_char(&mut self, ch: char) {
        self.flush_backslashes();
        self.current.push(ch);
    }

    fn flush_backslashes(&mut self) {
        for _ in 0..self.pending_backslashes {
            self.current.push(ESCAPE);
        }
        self.pending_backslashes = 0;
    }

    fn finish_argument(&mut self) {
        if !self.current.is_empty() {
            self.arguments.push(std::mem::take(&mut self.current));
        }
    }
}

fn strip_enclosure(word: &str) -> &str {
    if word.len() >= 2 && word.starts_with(ARGUMENT_ENCLOSURE) && word.ends_with(ARGUMENT_ENCLOSURE)
    {
        &word[1..word.len() - 1]
    } else {
        word
    }
}

/// Splits `line` into its command identifier (index 0) and arguments.
///
/// Returns `None` when the line is empty or made only of whitespace. The identifier may be
/// enclosed in double quotes (`"my cmd" arg`), in which case it ends at the closing quote.
///
/// ```
/// use line_interpreter::lexer::split_into_arguments;
/// let argv = split_into_arguments(r#"copy "my file" dest"#).unwrap();
/// assert_eq!(argv, ["copy", "my file", "dest"]);
/// ```
pub fn split_into_arguments(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(separator) = trimmed.find(ARGUMENT_SEPARATOR) else {
        return Some(vec![strip_enclosure(trimmed).to_string()]);
    };

    let closing_quote = if trimmed.starts_with(ARGUMENT_ENCLOSURE) {
        trimmed[1..].find(ARGUMENT_ENCLOSURE).map(|i| i + 1)
    } else {
        None
    };
    let (identifier, rest) = match closing_quote {
        Some(end) => (&trimmed[1..end], &trimmed[end + 1..]),
        None => (&trimmed[..separator], &trimmed[separator + 1..]),
    };

    let mut arguments = Vec::with_capacity(trimmed.len() / 2);
    if !identifier.is_empty() {
        arguments.push(identifier.to_string());
    }
    let arguments = ArgumentFSM::new(arguments, rest).make_arguments();
    trace!(line = %trimmed, ?arguments, "split command line");
    Some(arguments)
}

#[cfg(test)]
mod tests {
    use super::split_into_arguments;
    use pretty_assertions::assert_eq;

    fn split(line: &str) -> Vec<String> {
        split_into_arguments(line).expect("line should produce arguments")
    }

    #[test]
    fn test_empty_line_has_no_arguments() {
        assert_eq!(split_into_arguments(""), None);
        assert_eq!(split_into_arguments("   \t "), None);
    }

    #[test]
    fn test_single_word_is_the_identifier() {
        assert_eq!(split("  help  "), ["help"]);
        assert_eq!(split("\"help\""), ["help"]);
    }

    #[test]
    fn test_single_quote_char_is_kept() {
        assert_eq!(split("\""), ["\""]);
    }

    #[test]
    fn test_quoted_argument_keeps_spaces() {
        assert_eq!(split(r#"cmd "a b" c"#), ["cmd", "a b", "c"]);
    }

    #[test]
    fn test_odd_backslashes_escape_the_quote() {
        assert_eq!(split(r#"cmd a\"b"#), ["cmd", r#"a"b"#]);
        assert_eq!(split(r#"cmd a\\\"b"#), ["cmd", r#"a\"b"#]);
    }

    #[test]
    fn test_even_backslashes_are_halved_and_toggle_quoting() {
        assert_eq!(split(r#"cmd a\\"b c""#), ["cmd", r"a\b c"]);
    }

    #[test]
    fn test_backslashes_without_quote_are_literal() {
        assert_eq!(split(r"cd C:\dir\sub\\"), ["cd", r"C:\dir\sub\\"]);
    }

    #[test]
    fn test_doubled_quote_inside_quotes_is_literal() {
        assert_eq!(split(r#"say "a""b" c"#), ["say", r#"a"b"#, "c"]);
    }

    #[test]
    fn test_tabs_and_repeated_spaces_separate_arguments() {
        assert_eq!(split("cmd  a\t\tb   c"), ["cmd", "a", "b", "c"]);
        assert_eq!(split("cmd \"a\tb\""), ["cmd", "a\tb"]);
    }

    #[test]
    fn test_quoted_identifier() {
        assert_eq!(split(r#""my command" arg"#), ["my command", "arg"]);
        assert_eq!(split(r#""" arg"#), ["arg"]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_line() {
        assert_eq!(split(r#"cmd "a b"#), ["cmd", "a b"]);
    }

    #[test]
    fn test_plain_words_survive_join_and_split() {
        let samples: [&[&str]; 4] = [
            &["echo"],
            &["echo", "hi"],
            &["set", "level", "debug"],
            &["a", "b-c", "d/e", "f=g", "h.i"],
        ];
        for words in samples {
            let line = words.join(" ");
            assert_eq!(split(&line), words);
        }
    }
}
