use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use querymgr_error::QueryError;
use tracing::debug;

use super::info::{QueryInfo, QueryStats, StageInfo};
use super::{QueryState, StateChangeListener};
use crate::clock::{Clock, elapsed_between};
use crate::query_id::QueryId;
use crate::session::Session;

/// Lifecycle state for a query.
///
/// Executions embed this to get the transition rules, timestamps, listener
/// notifications, and waiting for free.
///
/// Allowed transitions are `Queued -> Running -> Finishing -> Finished`, and
/// from any non-terminal state to `Failed` or `Canceled`. Terminal states
/// never change.
#[derive(Debug)]
pub struct QueryStateMachine {
    query_id: QueryId,
    query: String,
    session: Session,
    clock: Arc<dyn Clock>,
    inner: Mutex<StateInner>,
    state_changed: Condvar,
}

struct StateInner {
    state: QueryState,
    create_time: DateTime<Utc>,
    execution_start_time: Option<DateTime<Utc>>,
    last_heartbeat: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    failure: Option<QueryError>,
    resource_group: Option<String>,
    output_stage: Option<StageInfo>,
    pruned: bool,
    listeners: Vec<StateChangeListener>,
}

impl std::fmt::Debug for StateInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateInner")
            .field("state", &self.state)
            .field("create_time", &self.create_time)
            .field("end_time", &self.end_time)
            .field("failure", &self.failure)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl QueryStateMachine {
    pub fn new(query_id: QueryId, query: String, session: Session, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        QueryStateMachine {
            query_id,
            query,
            session,
            clock,
            inner: Mutex::new(StateInner {
                state: QueryState::Queued,
                create_time: now,
                execution_start_time: None,
                last_heartbeat: now,
                end_time: None,
                failure: None,
                resource_group: None,
                output_stage: None,
                pruned: false,
                listeners: Vec::new(),
            }),
            state_changed: Condvar::new(),
        }
    }

    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> QueryState {
        self.inner.lock().state
    }

    pub fn failure(&self) -> Option<QueryError> {
        self.inner.lock().failure.clone()
    }

    pub fn resource_group(&self) -> Option<String> {
        self.inner.lock().resource_group.clone()
    }

    pub fn set_resource_group(&self, group: impl Into<String>) {
        self.inner.lock().resource_group = Some(group.into());
    }

    /// Replace the output stage detail. Ignored once the query has been
    /// pruned.
    pub fn set_output_stage(&self, stage: StageInfo) {
        let mut inner = self.inner.lock();
        if !inner.pruned {
            inner.output_stage = Some(stage);
        }
    }

    pub fn record_heartbeat(&self) {
        let now = self.clock.now();
        self.inner.lock().last_heartbeat = now;
    }

    pub fn transition_to_running(&self) -> bool {
        self.transition(QueryState::Running, None, |s| s == QueryState::Queued)
    }

    pub fn transition_to_finishing(&self) -> bool {
        self.transition(QueryState::Finishing, None, |s| s == QueryState::Running)
    }

    pub fn transition_to_finished(&self) -> bool {
        self.transition(QueryState::Finished, None, |s| s == QueryState::Finishing)
    }

    pub fn transition_to_failed(&self, error: QueryError) -> bool {
        self.transition(QueryState::Failed, Some(error), |s| !s.is_done())
    }

    pub fn transition_to_canceled(&self) -> bool {
        self.transition(
            QueryState::Canceled,
            Some(QueryError::user_canceled()),
            |s| !s.is_done(),
        )
    }

    /// Drop task and sub stage detail. Only applies to terminal queries.
    pub fn prune(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_done() || inner.pruned {
            return;
        }
        inner.output_stage = inner.output_stage.as_ref().map(|s| s.pruned());
        inner.pruned = true;
    }

    pub fn query_info(&self) -> QueryInfo {
        let now = self.clock.now();
        let inner = self.inner.lock();

        let elapsed = elapsed_between(inner.create_time, inner.end_time.unwrap_or(now));

        QueryInfo {
            query_id: self.query_id.clone(),
            session: self.session.clone(),
            state: inner.state,
            query: self.query.clone(),
            query_stats: QueryStats {
                create_time: inner.create_time,
                execution_start_time: inner.execution_start_time,
                last_heartbeat: inner.last_heartbeat,
                end_time: inner.end_time,
                elapsed,
            },
            resource_group: inner.resource_group.clone(),
            failure: inner.failure.clone(),
            output_stage: inner.output_stage.clone(),
            final_query_info: inner.state.is_done(),
            pruned: inner.pruned,
        }
    }

    /// Register a listener. Listeners on a terminal state machine are called
    /// immediately and not retained.
    pub fn add_state_change_listener(&self, listener: StateChangeListener) {
        let state = {
            let mut inner = self.inner.lock();
            if !inner.state.is_done() {
                inner.listeners.push(listener);
                return;
            }
            inner.state
        };
        listener(state);
    }

    /// Block until the state is no longer `current` or `max_wait` elapses.
    /// Returns the unused part of `max_wait`.
    ///
    /// A `max_wait` too large to be represented as a deadline waits without
    /// one.
    pub fn wait_for_state_change(&self, current: QueryState, max_wait: Duration) -> Duration {
        let start = Instant::now();
        let deadline = start.checked_add(max_wait);
        let mut inner = self.inner.lock();
        while inner.state == current && !inner.state.is_done() {
            match deadline {
                Some(deadline) => {
                    if self
                        .state_changed
                        .wait_until(&mut inner, deadline)
                        .timed_out()
                    {
                        return Duration::ZERO;
                    }
                }
                None => self.state_changed.wait(&mut inner),
            }
        }
        max_wait.saturating_sub(start.elapsed())
    }

    fn transition<F>(&self, new_state: QueryState, failure: Option<QueryError>, allowed: F) -> bool
    where
        F: FnOnce(QueryState) -> bool,
    {
        let now = self.clock.now();
        let listeners = {
            let mut inner = self.inner.lock();
            if !allowed(inner.state) {
                return false;
            }

            inner.state = new_state;
            match new_state {
                QueryState::Running => inner.execution_start_time = Some(now),
                s if s.is_done() => {
                    inner.end_time = Some(now);
                    if inner.execution_start_time.is_none() {
                        inner.execution_start_time = Some(now);
                    }
                }
                _ => (),
            }
            if failure.is_some() {
                inner.failure = failure;
            }

            self.state_changed.notify_all();

            // Terminal states never change again, nothing left to notify
            // after this.
            if new_state.is_done() {
                std::mem::take(&mut inner.listeners)
            } else {
                inner.listeners.clone()
            }
        };

        debug!(query_id = %self.query_id, state = %new_state, "query state changed");

        for listener in listeners {
            listener(new_state);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use querymgr_error::ErrorCode;

    use super::*;
    use crate::clock::ManualClock;
    use crate::execution::info::{StageState, TaskInfo};
    use crate::query_id::StageId;
    use crate::session::Identity;

    fn state_machine() -> (Arc<ManualClock>, QueryStateMachine) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let query_id: QueryId = "20240301_120000_00000_abcde".parse().unwrap();
        let session = Session::new(query_id.clone(), Identity::new("alice"), clock.now());
        let sm = QueryStateMachine::new(query_id, "SELECT 1".to_string(), session, clock.clone());
        (clock, sm)
    }

    #[test]
    fn normal_lifecycle() {
        let (clock, sm) = state_machine();
        assert_eq!(QueryState::Queued, sm.state());

        assert!(sm.transition_to_running());
        clock.advance(Duration::from_secs(3));
        assert!(sm.transition_to_finishing());
        assert!(sm.transition_to_finished());

        let info = sm.query_info();
        assert_eq!(QueryState::Finished, info.state);
        assert!(info.final_query_info);
        assert_eq!(Duration::from_secs(3), info.query_stats.elapsed);
        assert!(info.failure.is_none());
    }

    #[test]
    fn invalid_transitions_rejected() {
        let (_, sm) = state_machine();
        assert!(!sm.transition_to_finishing());
        assert!(!sm.transition_to_finished());
        assert!(sm.transition_to_running());
        assert!(!sm.transition_to_running());
    }

    #[test]
    fn fail_is_idempotent() {
        let (clock, sm) = state_machine();
        assert!(sm.transition_to_failed(QueryError::syntax("first")));
        let first = sm.query_info();

        clock.advance(Duration::from_secs(10));
        assert!(!sm.transition_to_failed(QueryError::internal("second")));
        assert!(!sm.transition_to_canceled());
        assert!(!sm.transition_to_running());

        let second = sm.query_info();
        assert_eq!(first.state, second.state);
        assert_eq!(first.failure, second.failure);
        assert_eq!(first.query_stats.end_time, second.query_stats.end_time);
        assert_eq!(Some(ErrorCode::SyntaxError), second.error_code());
    }

    #[test]
    fn cancel_sets_user_canceled() {
        let (_, sm) = state_machine();
        sm.transition_to_running();
        assert!(sm.transition_to_canceled());
        assert_eq!(QueryState::Canceled, sm.state());
        assert_eq!(Some(ErrorCode::UserCanceled), sm.query_info().error_code());
    }

    #[test]
    fn listeners_fire_per_transition() {
        let (_, sm) = state_machine();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        sm.add_state_change_listener(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        sm.transition_to_running();
        sm.transition_to_failed(QueryError::internal("boom"));
        sm.transition_to_canceled();
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn listener_on_terminal_fires_immediately() {
        let (_, sm) = state_machine();
        sm.transition_to_failed(QueryError::internal("boom"));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        sm.add_state_change_listener(Arc::new(move |state| s.lock().push(state)));
        assert_eq!(vec![QueryState::Failed], *seen.lock());
    }

    #[test]
    fn prune_keeps_state_drops_detail() {
        let (_, sm) = state_machine();
        let stage_id = StageId::new(sm.query_id().clone(), 0);
        sm.set_output_stage(StageInfo {
            stage_id: stage_id.clone(),
            state: StageState::Finished,
            tasks: vec![TaskInfo {
                task_id: format!("{stage_id}.0"),
                state: StageState::Finished,
            }],
            sub_stages: Vec::new(),
        });

        // Not terminal yet.
        sm.prune();
        assert!(!sm.query_info().pruned);

        sm.transition_to_failed(QueryError::internal("boom"));
        let before = sm.query_info();
        sm.prune();
        sm.prune();
        let after = sm.query_info();

        assert!(after.pruned);
        assert_eq!(before.state, after.state);
        assert_eq!(before.failure, after.failure);
        assert_eq!(before.query_stats, after.query_stats);
        assert!(after.output_stage.unwrap().tasks.is_empty());
    }

    #[test]
    fn wait_returns_on_change() {
        let (_, sm) = state_machine();
        let sm = Arc::new(sm);

        let sm2 = sm.clone();
        let handle = std::thread::spawn(move || {
            sm2.wait_for_state_change(QueryState::Queued, Duration::from_secs(30))
        });
        std::thread::sleep(Duration::from_millis(50));
        sm.transition_to_running();

        let remaining = handle.join().unwrap();
        assert!(remaining > Duration::ZERO);
    }

    #[test]
    fn wait_times_out() {
        let (_, sm) = state_machine();
        let remaining = sm.wait_for_state_change(QueryState::Queued, Duration::from_millis(20));
        assert_eq!(Duration::ZERO, remaining);
    }

    #[test]
    fn wait_with_unbounded_max_wait() {
        let (_, sm) = state_machine();
        sm.transition_to_running();
        let remaining = sm.wait_for_state_change(QueryState::Queued, Duration::MAX);
        assert!(remaining > Duration::from_secs(u64::MAX / 2));

        let sm = Arc::new(sm);
        let sm2 = sm.clone();
        let handle = std::thread::spawn(move || {
            sm2.wait_for_state_change(QueryState::Running, Duration::MAX)
        });
        std::thread::sleep(Duration::from_millis(50));
        sm.transition_to_failed(QueryError::internal("boom"));

        let remaining = handle.join().unwrap();
        assert!(remaining > Duration::from_secs(u64::MAX / 2));
    }

    #[test]
    fn wait_returns_immediately_if_state_differs() {
        let (_, sm) = state_machine();
        sm.transition_to_running();
        let remaining = sm.wait_for_state_change(QueryState::Queued, Duration::from_secs(30));
        assert!(remaining > Duration::from_secs(29));
    }
}
