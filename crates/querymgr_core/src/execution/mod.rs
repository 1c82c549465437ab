pub mod failed;
pub mod info;
pub mod state_machine;

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use querymgr_error::QueryError;
use querymgr_parser::Statement;
use querymgr_parser::ast::Expr;
use serde::Serialize;

use self::info::{QueryInfo, QueryPlan};
use crate::query_id::{QueryId, StageId};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Queued,
    Running,
    Finishing,
    Finished,
    Failed,
    Canceled,
}

impl QueryState {
    /// If this is a terminal state.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Finishing => "FINISHING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

/// Called with the new state after every state change.
pub type StateChangeListener = Arc<dyn Fn(QueryState) + Sync + Send>;

/// The lifecycle of a single query.
///
/// How the query actually runs is up to the implementation. The manager only
/// observes state, reads snapshots, and pushes the query towards a terminal
/// state.
pub trait QueryExecution: Debug + Sync + Send {
    fn query_id(&self) -> &QueryId;

    fn state(&self) -> QueryState;

    fn session(&self) -> &Session;

    /// Get a snapshot of the query.
    fn query_info(&self) -> Result<QueryInfo, QueryError>;

    fn resource_group(&self) -> Option<String>;

    /// Get the plan for the query if one has been produced.
    fn query_plan(&self) -> Option<QueryPlan>;

    /// Begin running the query.
    fn start(&self);

    /// Fail the query. No-op if the query is already done.
    fn fail(&self, error: QueryError);

    fn cancel_query(&self);

    fn cancel_stage(&self, stage_id: &StageId);

    fn record_heartbeat(&self);

    /// Drop bulky detail from the query's info. Must not change the state.
    fn prune_info(&self);

    /// Register a listener for state changes.
    ///
    /// If the query is already done, the listener is called immediately with
    /// the current state.
    fn add_state_change_listener(&self, listener: StateChangeListener);

    /// Block until the state is no longer `current` or `max_wait` elapses.
    ///
    /// Returns the remaining wait budget.
    fn wait_for_state_change(&self, current: QueryState, max_wait: Duration) -> Duration;
}

/// Distinguishes factories that run queries from those that run DDL-like
/// tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKind {
    Query,
    DataDefinition,
}

/// Creates executions for one kind of statement.
pub trait QueryExecutionFactory: Debug + Sync + Send {
    fn kind(&self) -> ExecutionKind;

    fn create_query_execution(
        &self,
        query_id: QueryId,
        query: &str,
        session: &Session,
        statement: &Statement,
        parameters: &[Expr],
    ) -> Result<Arc<dyn QueryExecution>, QueryError>;
}
