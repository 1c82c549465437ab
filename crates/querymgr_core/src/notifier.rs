//! Hooks run off of query state changes.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::execution::{QueryExecution, QueryState};
use crate::stats::QueryManagerStats;

/// Listeners fire outside the state lock, so events from racing transitions
/// can arrive out of order. A running event seen after a terminal one is
/// ignored.
#[derive(Debug, Default)]
struct StartStop {
    started: bool,
    stopped: bool,
    done: bool,
}

impl StartStop {
    fn observe_started(&mut self, state: QueryState, stats: &QueryManagerStats) {
        if state.is_done() {
            self.done = true;
        }
        if state == QueryState::Running && !self.started && !self.done {
            self.started = true;
            stats.query_started();
        }
    }

    fn observe_stopped(&mut self, state: QueryState, stats: &QueryManagerStats) {
        if !state.is_done() {
            return;
        }
        self.done = true;
        if self.started && !self.stopped {
            self.stopped = true;
            stats.query_stopped();
        }
    }
}

/// Count the query as started the first time it's seen running, and as
/// stopped the first time it's seen done after having started.
pub fn add_stats_listener(execution: &dyn QueryExecution, stats: &Arc<QueryManagerStats>) {
    let flags = Arc::new(Mutex::new(StartStop::default()));

    let (f, s) = (flags.clone(), stats.clone());
    execution.add_state_change_listener(Arc::new(move |state| {
        f.lock().observe_started(state, &s);
    }));
    // State may have changed before the listener was added.
    flags.lock().observe_started(execution.state(), stats);

    let (f, s) = (flags.clone(), stats.clone());
    execution.add_state_change_listener(Arc::new(move |state| {
        f.lock().observe_stopped(state, &s);
    }));
    flags.lock().observe_stopped(execution.state(), stats);
}

/// Run `callback` once when the query reaches a terminal state.
///
/// Runs immediately if the query is already done.
pub fn add_completion_callback<F>(execution: &dyn QueryExecution, callback: F)
where
    F: Fn() + Sync + Send + 'static,
{
    let executed = Arc::new(AtomicBool::new(false));
    let callback = Arc::new(callback);

    let (e, c) = (executed.clone(), callback.clone());
    execution.add_state_change_listener(Arc::new(move |state| {
        if state.is_done()
            && e.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            c();
        }
    }));

    if execution.state().is_done()
        && executed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    {
        callback();
    }
}
