//! Periodic enforcement and retention.
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use querymgr_error::QueryError;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::clock::{add_duration, sub_duration};
use crate::duration::format_duration;
use crate::errors::{ManagerError, Result};
use crate::execution::{QueryExecution, QueryState};
use crate::manager::ManagerState;

/// Run maintenance ticks until the manager goes away. The next tick is
/// scheduled a full `interval` after the previous one completes.
pub(crate) async fn maintenance_loop(state: Weak<ManagerState>, interval: Duration) {
    let mut interval = interval_with_delayed_ticks(interval);
    loop {
        interval.tick().await;
        match state.upgrade() {
            Some(state) => state.run_maintenance_tick(),
            None => {
                debug!("query manager dropped, exiting maintenance loop");
                return;
            }
        }
        interval.reset();
    }
}

/// Create an interval that waits a full period after a slow tick instead of
/// bursting to catch up.
fn interval_with_delayed_ticks(dur: Duration) -> Interval {
    let mut interval = tokio::time::interval(dur);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run one sweep, logging instead of propagating errors and panics.
fn run_sweep<F>(name: &'static str, sweep: F)
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(sweep)) {
        Ok(Ok(())) => (),
        Ok(Err(e)) => warn!(sweep = name, %e, "error running maintenance sweep"),
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(sweep = name, panic = %msg, "maintenance sweep panicked");
        }
    }
}

/// Keeps the first error seen while continuing past it.
#[derive(Debug, Default)]
struct FirstError(Option<ManagerError>);

impl FirstError {
    fn record(&mut self, err: impl Into<ManagerError>) {
        if self.0.is_none() {
            self.0 = Some(err.into());
        }
    }

    fn into_result(self) -> Result<()> {
        match self.0 {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ManagerState {
    pub(crate) fn run_maintenance_tick(&self) {
        trace!("running maintenance tick");
        run_sweep("fail_abandoned_queries", || self.fail_abandoned_queries());
        run_sweep("enforce_memory_limits", || self.enforce_memory_limits());
        run_sweep("enforce_query_max_run_time_limits", || {
            self.enforce_query_max_run_time_limits()
        });
        run_sweep("prune_expired_queries", || self.prune_expired_queries());
        run_sweep("remove_expired_queries", || self.remove_expired_queries());
    }

    /// Fail queries nobody has asked about within the client timeout.
    fn fail_abandoned_queries(&self) -> Result<()> {
        let now = self.clock.now();
        let oldest_allowed_heartbeat = sub_duration(now, self.config.client_timeout);
        let mut first_error = FirstError::default();

        for execution in self.registry.snapshot() {
            let info = match execution.query_info() {
                Ok(info) => info,
                Err(e) => {
                    first_error.record(e);
                    continue;
                }
            };
            if info.state.is_done() {
                continue;
            }

            let last_heartbeat = info.query_stats.last_heartbeat;
            if last_heartbeat < oldest_allowed_heartbeat {
                info!(query_id = %info.query_id, %last_heartbeat, "failing abandoned query");
                execution.fail(QueryError::abandoned(format!(
                    "Query {} has not been accessed since {}: currentTime {}",
                    info.query_id, last_heartbeat, now
                )));
            }
        }

        first_error.into_result()
    }

    /// Hand every running query to the memory manager.
    fn enforce_memory_limits(&self) -> Result<()> {
        let running: Vec<Arc<dyn QueryExecution>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|q| q.state() == QueryState::Running)
            .collect();
        self.memory_manager.process(&running)?;
        Ok(())
    }

    /// Fail queries that have been around longer than their session allows.
    fn enforce_query_max_run_time_limits(&self) -> Result<()> {
        let now = self.clock.now();
        let mut first_error = FirstError::default();

        for execution in self.registry.snapshot() {
            if execution.state().is_done() {
                continue;
            }
            let max_run_time = execution.session().properties.query_max_run_time;
            let create_time = match execution.query_info() {
                Ok(info) => info.query_stats.create_time,
                Err(e) => {
                    first_error.record(e);
                    continue;
                }
            };

            if add_duration(create_time, max_run_time) < now {
                info!(query_id = %execution.query_id(), "failing query exceeding max run time");
                execution.fail(QueryError::exceeded_time_limit(format!(
                    "Query exceeded maximum time limit of {}",
                    format_duration(max_run_time)
                )));
            }
        }

        first_error.into_result()
    }

    /// Drop detail from the oldest finished queries beyond the history limit.
    fn prune_expired_queries(&self) -> Result<()> {
        let max_history = self.config.max_query_history;
        let queued = self.expiration.snapshot();
        let excess = queued.len().saturating_sub(max_history);

        for execution in queued.iter().take(excess) {
            execution.prune_info();
        }

        Ok(())
    }

    /// Remove the oldest finished queries beyond the history limit that
    /// finished long enough ago.
    ///
    /// Stops at the first query that's too young. The queue is in completion
    /// order so nothing after it can be older.
    fn remove_expired_queries(&self) -> Result<()> {
        let max_history = self.config.max_query_history;
        let horizon = sub_duration(self.clock.now(), self.config.min_query_expire_age);

        while self.expiration.len() > max_history {
            let Some(oldest) = self.expiration.peek() else {
                break;
            };

            match oldest.query_info() {
                Ok(info) => match info.query_stats.end_time {
                    Some(end_time) if end_time <= horizon => (),
                    _ => return Ok(()),
                },
                Err(e) => {
                    // Can't age it, and it would block everything behind it.
                    warn!(query_id = %oldest.query_id(), %e, "removing query with unreadable info");
                }
            }

            let query_id = oldest.query_id().clone();
            debug!(%query_id, "removing expired query");
            self.registry.remove(&query_id);
            self.expiration.pop_front_if(&query_id);
        }

        Ok(())
    }
}
