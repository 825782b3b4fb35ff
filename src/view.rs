use parking_lot::{Condvar, Mutex};
use std::io::{Result as IoResult, Write};
use std::sync::Arc;
use tracing::warn;

/// Presentation side of the interpreter.
///
/// The dispatcher locks input when a line is submitted, unlocks it and asks for a fresh
/// prompt once the command has finished (synchronously or in the background), and appends
/// every published message that passes the threshold. Calls may arrive from worker
/// threads; implementations must not call back into the dispatcher.
pub trait View: Send + Sync {
    fn lock_input(&self);
    fn unlock_input(&self);
    fn show_prompt(&self);
    fn append_message(&self, text: &str);
}

/// View writing messages (and optionally prompts) to any writer.
///
/// Input locking is tracked so a driver can wait for a background command to finish
/// before reading the next line.
pub struct ConsoleView<W: Write + Send> {
    out: Mutex<W>,
    prompt: String,
    echo_prompt: bool,
    input: Mutex<InputState>,
    ready: Condvar,
}

#[derive(Debug, Default)]
struct InputState {
    locked: bool,
    // set by lock_input, cleared once the prompt following the unlock is shown
    awaiting_prompt: bool,
}

impl InputState {
    fn is_ready(&self) -> bool {
        !self.locked && !self.awaiting_prompt
    }
}

impl<W: Write + Send> ConsoleView<W> {
    /// `echo_prompt` controls whether `show_prompt` writes the prompt itself; an
    /// interactive line editor draws its own.
    pub fn new(out: W, prompt: impl Into<String>, echo_prompt: bool) -> Self {
        Self {
            out: Mutex::new(out),
            prompt: prompt.into(),
            echo_prompt,
            input: Mutex::new(InputState::default()),
            ready: Condvar::new(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Blocks until input is unlocked and the prompt that follows has been shown.
    pub fn wait_until_ready(&self) {
        let mut input = self.input.lock();
        while !input.is_ready() {
            self.ready.wait(&mut input);
        }
    }

    fn write(&self, text: &str, newline: bool) {
        let mut out = self.out.lock();
        let written = if newline {
            writeln!(out, "{text}")
        } else {
            write!(out, "{text}")
        };
        if let Err(err) = written.and_then(|_| out.flush()) {
            warn!(error = %err, "console view write failed");
        }
    }
}

impl<W: Write + Send> View for ConsoleView<W> {
    fn lock_input(&self) {
        let mut input = self.input.lock();
        input.locked = true;
        input.awaiting_prompt = true;
    }

    fn unlock_input(&self) {
        self.input.lock().locked = false;
    }

    fn show_prompt(&self) {
        if self.echo_prompt {
            self.write(&self.prompt, false);
        }
        let mut input = self.input.lock();
        input.awaiting_prompt = false;
        if input.is_ready() {
            self.ready.notify_all();
        }
    }

    fn append_message(&self, text: &str) {
        self.write(text, true);
    }
}

/// Thread-safe in-memory writer; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

/// Something a [`RecordingView`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Locked,
    Unlocked,
    Prompt,
    Message(String),
}

/// View remembering every call it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }

    /// Published messages only.
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Message(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &ViewEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == wanted).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl View for RecordingView {
    fn lock_input(&self) {
        self.events.lock().push(ViewEvent::Locked);
    }

    fn unlock_input(&self) {
        self.events.lock().push(ViewEvent::Unlocked);
    }

    fn show_prompt(&self) {
        self.events.lock().push(ViewEvent::Prompt);
    }

    fn append_message(&self, text: &str) {
        self.events.lock().push(ViewEvent::Message(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_messages_and_prompt_are_written() {
        let buffer = SharedBuffer::new();
        let view = ConsoleView::new(buffer.clone(), "> ", true);

        view.append_message("hello");
        view.show_prompt();
        assert_eq!(buffer.contents(), "hello\n> ");
    }

    #[test]
    fn test_prompt_is_not_echoed_for_line_editor() {
        let buffer = SharedBuffer::new();
        let view = ConsoleView::new(buffer.clone(), "> ", false);

        view.show_prompt();
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_wait_until_ready_sees_the_prompt() {
        let buffer = SharedBuffer::new();
        let view = Arc::new(ConsoleView::new(buffer.clone(), "> ", true));
        view.wait_until_ready();
        view.lock_input();

        let unlocker = Arc::clone(&view);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            unlocker.append_message("done");
            unlocker.unlock_input();
            thread::sleep(Duration::from_millis(20));
            unlocker.show_prompt();
        });

        view.wait_until_ready();
        assert_eq!(buffer.contents(), "done\n> ");
        handle.join().unwrap();
    }

    #[test]
    fn test_recording_view_keeps_order() {
        let view = RecordingView::new();
        view.lock_input();
        view.append_message("hi");
        view.unlock_input();
        view.show_prompt();

        assert_eq!(
            view.events(),
            [
                ViewEvent::Locked,
                ViewEvent::Message("hi".to_string()),
                ViewEvent::Unlocked,
                ViewEvent::Prompt,
            ]
        );
        assert_eq!(view.messages(), ["hi"]);
        assert_eq!(view.count(&ViewEvent::Prompt), 1);
    }
}
