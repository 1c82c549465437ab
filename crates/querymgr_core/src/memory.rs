use std::fmt::Debug;
use std::sync::Arc;

use querymgr_error::QueryError;

use crate::execution::QueryExecution;

/// Enforces cluster wide memory limits.
///
/// Called once per maintenance tick with every running query. Decides on its
/// own which queries to fail.
pub trait ClusterMemoryManager: Debug + Sync + Send {
    fn process(&self, queries: &[Arc<dyn QueryExecution>]) -> Result<(), QueryError>;
}

/// Never fails anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClusterMemoryManager;

impl ClusterMemoryManager for NoopClusterMemoryManager {
    fn process(&self, _queries: &[Arc<dyn QueryExecution>]) -> Result<(), QueryError> {
        Ok(())
    }
}
