use std::sync::atomic::{AtomicU64, Ordering};

use querymgr_error::{ErrorCode, ErrorType};
use serde::Serialize;

use crate::execution::QueryState;
use crate::execution::info::QueryInfo;

/// Counters across all queries.
#[derive(Debug, Default)]
pub struct QueryManagerStats {
    submitted: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    finished: AtomicU64,
    failed: AtomicU64,
    user_error_failures: AtomicU64,
    internal_failures: AtomicU64,
    external_failures: AtomicU64,
    insufficient_resources_failures: AtomicU64,
    abandoned_queries: AtomicU64,
    canceled_queries: AtomicU64,
}

impl QueryManagerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query was handed off for scheduling.
    pub fn query_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A query started running.
    pub fn query_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// A query that previously started is done.
    pub fn query_stopped(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the final info of a query.
    pub fn query_finished(&self, info: &QueryInfo) {
        self.finished.fetch_add(1, Ordering::Relaxed);

        match info.error_code() {
            Some(ErrorCode::AbandonedQuery) => {
                self.abandoned_queries.fetch_add(1, Ordering::Relaxed);
            }
            Some(ErrorCode::UserCanceled) => {
                self.canceled_queries.fetch_add(1, Ordering::Relaxed);
            }
            _ => (),
        }

        if info.state != QueryState::Failed {
            return;
        }
        self.failed.fetch_add(1, Ordering::Relaxed);

        let Some(failure) = &info.failure else {
            return;
        };
        let counter = match failure.error_type() {
            ErrorType::UserError => &self.user_error_failures,
            ErrorType::InternalError => &self.internal_failures,
            ErrorType::External => &self.external_failures,
            ErrorType::InsufficientResources => &self.insufficient_resources_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueryManagerStatsSnapshot {
        let started = self.started.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        QueryManagerStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            started,
            completed,
            running: started.saturating_sub(completed),
            finished: self.finished.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            user_error_failures: self.user_error_failures.load(Ordering::Relaxed),
            internal_failures: self.internal_failures.load(Ordering::Relaxed),
            external_failures: self.external_failures.load(Ordering::Relaxed),
            insufficient_resources_failures: self
                .insufficient_resources_failures
                .load(Ordering::Relaxed),
            abandoned_queries: self.abandoned_queries.load(Ordering::Relaxed),
            canceled_queries: self.canceled_queries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueryManagerStatsSnapshot {
    pub submitted: u64,
    pub started: u64,
    pub completed: u64,
    pub running: u64,
    pub finished: u64,
    pub failed: u64,
    pub user_error_failures: u64,
    pub internal_failures: u64,
    pub external_failures: u64,
    pub insufficient_resources_failures: u64,
    pub abandoned_queries: u64,
    pub canceled_queries: u64,
}

#[cfg(test)]
mod tests {
    use querymgr_error::QueryError;

    use super::*;
    use crate::testutil::{TestQueryExecution, test_clock};

    #[test]
    fn finished_counts_by_type() {
        let clock = test_clock();
        let stats = QueryManagerStats::new();

        let ok = TestQueryExecution::new_arc("20240301_120000_00000_abcde", clock.clone());
        ok.finish();
        stats.query_finished(&ok.state_machine().query_info());

        let abandoned = TestQueryExecution::new_arc("20240301_120000_00001_abcde", clock.clone());
        abandoned
            .state_machine()
            .transition_to_failed(QueryError::abandoned("gone"));
        stats.query_finished(&abandoned.state_machine().query_info());

        let canceled = TestQueryExecution::new_arc("20240301_120000_00002_abcde", clock.clone());
        canceled.state_machine().transition_to_canceled();
        stats.query_finished(&canceled.state_machine().query_info());

        let internal = TestQueryExecution::new_arc("20240301_120000_00003_abcde", clock.clone());
        internal
            .state_machine()
            .transition_to_failed(QueryError::internal("boom"));
        stats.query_finished(&internal.state_machine().query_info());

        let snapshot = stats.snapshot();
        assert_eq!(4, snapshot.finished);
        assert_eq!(2, snapshot.failed);
        assert_eq!(1, snapshot.user_error_failures);
        assert_eq!(1, snapshot.internal_failures);
        assert_eq!(1, snapshot.abandoned_queries);
        assert_eq!(1, snapshot.canceled_queries);
    }

    #[test]
    fn running_gauge() {
        let stats = QueryManagerStats::new();
        stats.query_started();
        stats.query_started();
        stats.query_stopped();

        let snapshot = stats.snapshot();
        assert_eq!(2, snapshot.started);
        assert_eq!(1, snapshot.completed);
        assert_eq!(1, snapshot.running);
    }
}
