use std::fmt::Debug;
use std::sync::Arc;

use querymgr_error::QueryError;
use querymgr_parser::Statement;

use crate::execution::QueryExecution;
use crate::executor::QueryExecutor;

/// Decides when an admitted query starts.
pub trait QueryQueueManager: Debug + Sync + Send {
    /// Hand off an admitted query.
    ///
    /// An error means the query was not accepted (e.g. its resource group is
    /// full) and will be failed by the caller.
    fn submit(
        &self,
        statement: &Statement,
        execution: Arc<dyn QueryExecution>,
        executor: &QueryExecutor,
    ) -> Result<(), QueryError>;
}

/// Starts every query right away on the query executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateQueryQueueManager;

impl QueryQueueManager for ImmediateQueryQueueManager {
    fn submit(
        &self,
        _statement: &Statement,
        execution: Arc<dyn QueryExecution>,
        executor: &QueryExecutor,
    ) -> Result<(), QueryError> {
        let query_id = execution.query_id().clone();
        executor
            .spawn(async move { execution.start() })
            .map_err(|_| {
                QueryError::server_shutting_down(format!(
                    "Server is shutting down. Query {query_id} has been canceled"
                ))
            })
    }
}
