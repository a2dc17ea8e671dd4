//! Debounced live checker

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sqlcheck_core::{CheckOptions, CheckerResult, LiveOptions};
use sqlcheck_sql::SqlCheck;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Latest published check outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveResult {
    /// Text the result was computed from
    pub source: String,

    pub result: CheckerResult,

    /// True while an edit is waiting for its check to run
    pub is_checking: bool,
}

impl Default for LiveResult {
    fn default() -> Self {
        Self {
            source: String::new(),
            result: CheckerResult::empty(),
            is_checking: false,
        }
    }
}

/// Where a live checker is in its edit/check cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    /// Nothing has been checked yet
    Idle,
    /// An edit is waiting for the debounce delay
    Dirty,
    /// A check is running
    Checking,
    /// The last check finished and nothing is pending
    Settled,
}

/// Debounced checker for one piece of editable text
///
/// Every [`set_input`](Self::set_input) restarts the debounce timer, so a
/// burst of edits collapses into a single check that runs `debounce_ms`
/// after the last one. The check reads the input as it is when the timer
/// fires. Dropping the checker (or calling [`detach`](Self::detach)) cancels
/// the pending check and nothing is published afterwards.
pub struct LiveChecker {
    shared: Arc<Shared>,
    runtime: Handle,
}

struct Shared {
    checker: Arc<dyn SqlCheck>,
    state: Mutex<LiveState>,
    updates: watch::Sender<LiveResult>,
}

struct LiveState {
    /// Current text, updated on every edit
    input: String,

    /// Text handed to the most recent check
    last_dispatched: String,

    /// Number of checks dispatched so far
    dispatched: u64,

    options: LiveOptions,
    pending: Option<JoinHandle<()>>,

    /// Bumped on every scheduled check; a timer only fires for its own generation
    generation: u64,

    checking: bool,
    detached: bool,
}

impl LiveChecker {
    /// Create a live checker on the current Tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(checker: Arc<dyn SqlCheck>, options: LiveOptions) -> Self {
        Self::with_handle(checker, options, Handle::current())
    }

    /// Create a live checker that schedules its checks on `runtime`
    pub fn with_handle(checker: Arc<dyn SqlCheck>, options: LiveOptions, runtime: Handle) -> Self {
        let (updates, _) = watch::channel(LiveResult::default());

        Self {
            shared: Arc::new(Shared {
                checker,
                state: Mutex::new(LiveState {
                    input: String::new(),
                    last_dispatched: String::new(),
                    dispatched: 0,
                    options,
                    pending: None,
                    generation: 0,
                    checking: false,
                    detached: false,
                }),
                updates,
            }),
            runtime,
        }
    }

    /// Record an edit and (re)start the debounce timer
    ///
    /// Input equal to the text of the last dispatched check schedules
    /// nothing.
    pub fn set_input(&self, input: impl Into<String>) {
        let input = input.into();
        let mut state = self.shared.lock();

        if state.detached {
            return;
        }

        state.input.clone_from(&input);

        if input == state.last_dispatched {
            tracing::trace!("input unchanged since last dispatch");
            return;
        }

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        state.generation += 1;
        let generation = state.generation;

        if !input.trim().is_empty() {
            self.shared.updates.send_modify(|live| live.is_checking = true);
        }

        let options = state.options.check.clone();
        let delay = state.options.debounce();
        let shared = Arc::clone(&self.shared);

        state.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire(generation, &options);
        }));
    }

    /// Replace the options used by checks scheduled from now on
    pub fn set_options(&self, options: LiveOptions) {
        self.shared.lock().options = options;
    }

    /// Current text
    pub fn input(&self) -> String {
        self.shared.lock().input.clone()
    }

    /// Text handed to the most recent check
    pub fn last_dispatched(&self) -> String {
        self.shared.lock().last_dispatched.clone()
    }

    pub fn phase(&self) -> LivePhase {
        let state = self.shared.lock();

        if state.checking {
            LivePhase::Checking
        } else if state.pending.is_some() {
            LivePhase::Dirty
        } else if state.dispatched > 0 {
            LivePhase::Settled
        } else {
            LivePhase::Idle
        }
    }

    /// Latest published result
    pub fn snapshot(&self) -> LiveResult {
        self.shared.updates.borrow().clone()
    }

    /// Receiver notified whenever the published result changes
    pub fn subscribe(&self) -> watch::Receiver<LiveResult> {
        self.shared.updates.subscribe()
    }

    /// Check `sql` right away with the current options
    ///
    /// Bypasses the debounce and leaves the published result alone.
    pub fn check_now(&self, sql: &str) -> CheckerResult {
        let options = self.shared.lock().options.check.clone();
        self.shared.checker.check(sql, &options)
    }

    /// Stop checking; a pending check is cancelled
    pub fn detach(self) {
        // Drop does the work.
    }
}

impl Drop for LiveChecker {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.detached = true;

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }
}

impl std::fmt::Debug for LiveChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveChecker")
            .field("phase", &self.phase())
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the check scheduled for `generation`
    fn fire(&self, generation: u64, options: &CheckOptions) {
        let sql = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.detached || state.generation != generation {
                return;
            }

            state.pending = None;
            state.checking = true;
            state.dispatched += 1;
            state.last_dispatched.clone_from(&state.input);
            state.input.clone()
        };

        let result = self.checker.check(&sql, options);

        let mut state = self.lock();
        state.checking = false;

        // A newer edit scheduled its own check while this one ran.
        if state.detached || state.generation != generation {
            tracing::trace!(generation, "dropping superseded live result");
            return;
        }

        tracing::debug!(
            generation,
            valid = result.is_valid,
            warnings = result.warnings.len(),
            "live check settled"
        );

        self.updates.send_replace(LiveResult {
            source: sql,
            result,
            is_checking: false,
        });
    }
}
