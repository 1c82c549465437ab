use std::sync::Arc;
use std::time::Duration;

use querymgr_error::QueryError;

use super::info::{QueryInfo, QueryPlan};
use super::state_machine::QueryStateMachine;
use super::{QueryExecution, QueryState, StateChangeListener};
use crate::clock::Clock;
use crate::query_id::{QueryId, StageId};
use crate::session::Session;

/// An execution for a query that failed before it could be admitted.
///
/// Terminal from construction. Exists so every issued query id can be looked
/// up and is retired like any other query.
#[derive(Debug)]
pub struct FailedQueryExecution {
    state_machine: QueryStateMachine,
}

impl FailedQueryExecution {
    pub fn new(
        query_id: QueryId,
        query: String,
        session: Session,
        resource_group: Option<String>,
        error: QueryError,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state_machine = QueryStateMachine::new(query_id, query, session, clock);
        if let Some(group) = resource_group {
            state_machine.set_resource_group(group);
        }
        state_machine.transition_to_failed(error);

        FailedQueryExecution { state_machine }
    }

    /// Snapshot of the query. Never fails.
    pub fn info(&self) -> QueryInfo {
        self.state_machine.query_info()
    }
}

impl QueryExecution for FailedQueryExecution {
    fn query_id(&self) -> &QueryId {
        self.state_machine.query_id()
    }

    fn state(&self) -> QueryState {
        self.state_machine.state()
    }

    fn session(&self) -> &Session {
        self.state_machine.session()
    }

    fn query_info(&self) -> Result<QueryInfo, QueryError> {
        Ok(self.info())
    }

    fn resource_group(&self) -> Option<String> {
        self.state_machine.resource_group()
    }

    fn query_plan(&self) -> Option<QueryPlan> {
        None
    }

    fn start(&self) {}

    fn fail(&self, _error: QueryError) {}

    fn cancel_query(&self) {}

    fn cancel_stage(&self, _stage_id: &StageId) {}

    fn record_heartbeat(&self) {
        self.state_machine.record_heartbeat();
    }

    fn prune_info(&self) {
        self.state_machine.prune();
    }

    fn add_state_change_listener(&self, listener: StateChangeListener) {
        self.state_machine.add_state_change_listener(listener);
    }

    fn wait_for_state_change(&self, current: QueryState, max_wait: Duration) -> Duration {
        self.state_machine.wait_for_state_change(current, max_wait)
    }
}
