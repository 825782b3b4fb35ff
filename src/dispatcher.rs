//! Resolution and execution of command lines, and tracking of actions that finish in the
//! background.

use crate::command::{ActionKey, ActionRef, Status};
use crate::config::ShellConfig;
use crate::error::{Result, ShellError};
use crate::history::HistoryBuffer;
use crate::level::PublicationLevel;
use crate::lexer::split_into_arguments;
use crate::registry::ActionRegistry;
use crate::task::{CancelToken, CompletionGuard, Executor, Job, TaskId, ThreadExecutor, Worker};
use crate::view::View;
use parking_lot::{Condvar, Mutex, ReentrantMutex, RwLock, RwLockReadGuard};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

struct Unit {
    action: ActionKey,
    token: CancelToken,
}

// Everything completion callbacks and the submission path both touch.
struct State {
    level: PublicationLevel,
    current: Option<ActionRef>,
    in_progress: Vec<ActionRef>,
    units: HashMap<TaskId, Unit>,
}

impl State {
    fn has_live_units(&self, key: ActionKey) -> bool {
        self.units.values().any(|unit| unit.action == key)
    }

    fn is_current(&self, key: ActionKey) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| ActionKey::of(current) == key)
    }

    fn remove_in_progress(&mut self, key: ActionKey) -> bool {
        let before = self.in_progress.len();
        self.in_progress.retain(|action| ActionKey::of(action) != key);
        self.in_progress.len() != before
    }
}

struct Inner {
    view: Arc<dyn View>,
    registry: RwLock<ActionRegistry>,
    history: Mutex<HistoryBuffer>,
    executor: Arc<dyn Executor>,
    // one line at a time per dispatcher; re-entered by actions interpreting nested lines,
    // the cell counts the nesting depth
    submission: ReentrantMutex<Cell<usize>>,
    state: Mutex<State>,
    idle: Condvar,
    next_task: AtomicU64,
    exit_requested: AtomicBool,
}

/// Interprets command lines against a registry of actions and reports to a [`View`].
///
/// A `Dispatcher` is a cheap handle: clones share the same registry, history and
/// in-progress bookkeeping, so one can be moved into background work while another keeps
/// serving the prompt. Independent interpreters are built with independent `Dispatcher::new`
/// calls and share nothing but the action instances registered with both.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Dispatcher running background work on [`ThreadExecutor`].
    pub fn new(view: Arc<dyn View>, registry: ActionRegistry, config: &ShellConfig) -> Self {
        Self::with_executor(view, registry, config, Arc::new(ThreadExecutor))
    }

    pub fn with_executor(
        view: Arc<dyn View>,
        registry: ActionRegistry,
        config: &ShellConfig,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                view,
                registry: RwLock::new(registry),
                history: Mutex::new(HistoryBuffer::new(config.history)),
                executor,
                submission: ReentrantMutex::new(Cell::new(0)),
                state: Mutex::new(State {
                    level: config.level,
                    current: None,
                    in_progress: Vec::new(),
                    units: HashMap::new(),
                }),
                idle: Condvar::new(),
                next_task: AtomicU64::new(1),
                exit_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Interprets `line` and records it in the history.
    pub fn interpret(&self, line: &str) -> Status {
        self.interpret_with(line, true)
    }

    /// Interprets one command line.
    ///
    /// Input is locked for the duration of the command. It is unlocked and a new prompt is
    /// shown as soon as the command finishes: right away for every status but
    /// [`Status::InProgress`], or once the last background unit the action started ends.
    ///
    /// An action may interpret further lines through [`Context::dispatcher`] while it runs.
    /// Such nested lines leave the view alone; the outermost line owns locking and prompting.
    pub fn interpret_with(&self, line: &str, add_to_history: bool) -> Status {
        let submission = self.inner.submission.lock();
        let depth = submission.get();
        if depth > 0 {
            submission.set(depth + 1);
            let status = self.interpret_nested(line, add_to_history);
            submission.set(depth);
            return status;
        }

        submission.set(1);
        self.inner.view.lock_input();
        let (status, dispatched) = self.interpret_command(line, add_to_history);
        match (status, dispatched) {
            (Status::InProgress, Some((action, spawned))) => self.track(action, spawned, true),
            _ => {
                self.inner.state.lock().current = None;
                self.ready();
            }
        }
        submission.set(0);
        status
    }

    fn interpret_nested(&self, line: &str, add_to_history: bool) -> Status {
        let outer = self.current_action();
        let (status, dispatched) = self.interpret_command(line, add_to_history);
        if let (Status::InProgress, Some((action, spawned))) = (status, dispatched) {
            self.track(action, spawned, false);
        }
        self.inner.state.lock().current = outer;
        status
    }

    fn interpret_command(
        &self,
        line: &str,
        add_to_history: bool,
    ) -> (Status, Option<(ActionRef, usize)>) {
        let (status, dispatched) = self.dispatch(line, add_to_history);
        debug!(line, %status, "command line interpreted");
        self.publish(PublicationLevel::Debug, format!("Return status: {status}"));
        (status, dispatched)
    }

    fn dispatch(&self, line: &str, add_to_history: bool) -> (Status, Option<(ActionRef, usize)>) {
        if line.trim().is_empty() {
            self.publish(PublicationLevel::Error, "Empty command");
            return (Status::Empty, None);
        }

        let arguments = match split_into_arguments(line) {
            Some(arguments) if !arguments.is_empty() => arguments,
            _ => {
                self.publish(
                    PublicationLevel::Error,
                    format!("No command and/or arguments found: {line}"),
                );
                return (Status::Empty, None);
            }
        };

        if add_to_history {
            self.inner.history.lock().add(line);
        }

        let identifier = &arguments[0];
        let found = self.inner.registry.read().action_for(identifier);
        let Some(action) = found else {
            self.publish(
                PublicationLevel::Error,
                format!("Command not found: {identifier}"),
            );
            return (Status::NotFound, None);
        };

        self.inner.state.lock().current = Some(Arc::clone(&action));
        let ctx = Context {
            dispatcher: self,
            action: &action,
            spawned: Cell::new(0),
        };
        let status = action.run(&ctx, &arguments);
        let spawned = ctx.spawned.get();
        (status, Some((action, spawned)))
    }

    fn track(&self, action: ActionRef, spawned: usize, owns_view: bool) {
        let key = ActionKey::of(&action);
        let mut state = self.inner.state.lock();
        if state.has_live_units(key) {
            if !state.in_progress.iter().any(|a| ActionKey::of(a) == key) {
                state.in_progress.push(action);
            }
            debug!(spawned, in_progress = state.in_progress.len(), "action running in background");
            return;
        }

        if spawned == 0 {
            let name = action.default_identifier().unwrap_or_default();
            warn!(action = %name, "action returned IN_PROGRESS without starting background work");
        }
        if state.is_current(key) {
            state.current = None;
        }
        drop(state);
        if owns_view {
            self.ready();
        }
    }

    fn ready(&self) {
        self.inner.view.unlock_input();
        self.inner.view.show_prompt();
    }

    /// Sends `message` to the view if `level` passes the current threshold.
    ///
    /// Safe to call from any thread; returns whether the message was shown.
    pub fn publish(&self, level: PublicationLevel, message: impl AsRef<str>) -> bool {
        let state = self.inner.state.lock();
        if !level.passes(state.level) {
            trace!(%level, threshold = %state.level, "message filtered");
            return false;
        }
        self.inner.view.append_message(message.as_ref());
        true
    }

    pub(crate) fn complete(&self, id: TaskId) {
        let mut state = self.inner.state.lock();
        let Some(unit) = state.units.remove(&id) else {
            trace!(task = %id, "completion of a cancelled unit ignored");
            return;
        };
        if state.has_live_units(unit.action) {
            return;
        }
        // still inside run, `track` finishes the job
        if !state.remove_in_progress(unit.action) {
            return;
        }
        if state.is_current(unit.action) {
            state.current = None;
        }
        info!(task = %id, in_progress = state.in_progress.len(), "background action completed");
        // idle waiters wake up to a prompt that is already shown
        self.ready();
        self.inner.idle.notify_all();
    }

    /// Stops every unit `action` started on this dispatcher and forgets the action.
    ///
    /// Returns false when there was nothing to cancel.
    pub fn cancel(&self, action: &ActionRef) -> bool {
        let key = ActionKey::of(action);
        let mut state = self.inner.state.lock();

        let ids: Vec<TaskId> = state
            .units
            .iter()
            .filter(|(_, unit)| unit.action == key)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(unit) = state.units.remove(id) {
                unit.token.cancel();
            }
        }

        let was_in_progress = state.remove_in_progress(key);
        let was_current = was_in_progress && state.is_current(key);
        if was_current {
            state.current = None;
        }
        self.inner.idle.notify_all();
        drop(state);

        if ids.is_empty() && !was_in_progress {
            debug!("nothing to cancel");
            return false;
        }

        let name = action.default_identifier().unwrap_or_default();
        info!(action = %name, units = ids.len(), "action cancelled");
        self.publish(PublicationLevel::Info, format!("Cancelled: {name}"));
        if was_current {
            self.ready();
        }
        true
    }

    fn spawn_unit<F>(&self, action: &ActionRef, job: F) -> Result<TaskId>
    where
        F: FnOnce(&Worker) + Send + 'static,
    {
        let id = TaskId(self.inner.next_task.fetch_add(1, Ordering::SeqCst));
        let token = CancelToken::new();
        self.inner.state.lock().units.insert(
            id,
            Unit {
                action: ActionKey::of(action),
                token: token.clone(),
            },
        );

        let worker = Worker::new(id, token, self.clone());
        let guard = CompletionGuard {
            id,
            dispatcher: self.clone(),
        };
        let name = format!("{}-{}", action.default_identifier().unwrap_or_default(), id.0);
        let wrapped: Job = Box::new(move || {
            let _guard = guard;
            job(&worker);
        });

        if let Err(err) = self.inner.executor.execute(name, wrapped) {
            self.inner.state.lock().units.remove(&id);
            warn!(task = %id, error = %err, "failed to start background unit");
            return Err(ShellError::Spawn(err));
        }
        debug!(task = %id, "background unit started");
        Ok(id)
    }

    pub fn level(&self) -> PublicationLevel {
        self.inner.state.lock().level
    }

    pub fn set_level(&self, level: PublicationLevel) {
        self.inner.state.lock().level = level;
    }

    /// Most recently dispatched action, until it finishes.
    pub fn current_action(&self) -> Option<ActionRef> {
        self.inner.state.lock().current.clone()
    }

    pub fn actions_in_progress(&self) -> Vec<ActionRef> {
        self.inner.state.lock().in_progress.clone()
    }

    pub fn is_in_progress(&self, action: &ActionRef) -> bool {
        let key = ActionKey::of(action);
        self.inner
            .state
            .lock()
            .in_progress
            .iter()
            .any(|a| ActionKey::of(a) == key)
    }

    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().in_progress.is_empty()
    }

    /// Blocks until no action is running in the background.
    pub fn wait_until_idle(&self) {
        let mut state = self.inner.state.lock();
        while !state.in_progress.is_empty() {
            self.inner.idle.wait(&mut state);
        }
    }

    /// Like [`Dispatcher::wait_until_idle`], giving up after `timeout`. Returns whether the
    /// dispatcher is idle.
    pub fn wait_until_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !state.in_progress.is_empty() {
            if self.inner.idle.wait_until(&mut state, deadline).timed_out() {
                return state.in_progress.is_empty();
            }
        }
        true
    }

    /// Snapshot of the history.
    pub fn history(&self) -> HistoryBuffer {
        self.inner.history.lock().clone()
    }

    pub fn with_history_mut<R>(&self, f: impl FnOnce(&mut HistoryBuffer) -> R) -> R {
        f(&mut self.inner.history.lock())
    }

    pub fn previous_line(&self) -> Option<String> {
        self.inner.history.lock().previous()
    }

    pub fn next_line(&self) -> Option<String> {
        self.inner.history.lock().next()
    }

    /// Read access to the registry. Do not hold the guard across `interpret`.
    pub fn registry(&self) -> RwLockReadGuard<'_, ActionRegistry> {
        self.inner.registry.read()
    }

    pub fn with_registry_mut<R>(&self, f: impl FnOnce(&mut ActionRegistry) -> R) -> R {
        f(&mut self.inner.registry.write())
    }

    pub fn register(&self, action: ActionRef) -> bool {
        self.inner.registry.write().add(action)
    }

    pub fn action_for(&self, identifier: &str) -> Option<ActionRef> {
        self.inner.registry.read().action_for(identifier)
    }

    pub fn view(&self) -> &Arc<dyn View> {
        &self.inner.view
    }

    /// Asks the driving loop to stop after the current line.
    pub fn request_exit(&self) {
        self.inner.exit_requested.store(true, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.inner.exit_requested.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Dispatcher")
            .field("level", &state.level)
            .field("in_progress", &state.in_progress.len())
            .field("units", &state.units.len())
            .finish()
    }
}

/// What an action sees while it runs: the dispatcher that called it and the means to start
/// background work attributed to it.
pub struct Context<'a> {
    dispatcher: &'a Dispatcher,
    action: &'a ActionRef,
    spawned: Cell<usize>,
}

impl<'a> Context<'a> {
    pub fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    /// The running action.
    pub fn action(&self) -> &'a ActionRef {
        self.action
    }

    pub fn publish(&self, level: PublicationLevel, message: impl AsRef<str>) -> bool {
        self.dispatcher.publish(level, message)
    }

    pub fn level(&self) -> PublicationLevel {
        self.dispatcher.level()
    }

    /// Starts `job` on the dispatcher's executor as a unit of the running action.
    ///
    /// The action should return [`Status::InProgress`] once its units are started; input
    /// stays locked until the last of them returns or the action is cancelled.
    pub fn spawn<F>(&self, job: F) -> Result<TaskId>
    where
        F: FnOnce(&Worker) + Send + 'static,
    {
        let id = self.dispatcher.spawn_unit(self.action, job)?;
        self.spawned.set(self.spawned.get() + 1);
        Ok(id)
    }
}
