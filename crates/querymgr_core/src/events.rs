use std::fmt::Debug;

use querymgr_error::QueryError;
use tracing::info;

use crate::execution::info::QueryInfo;

/// Receives query lifecycle events.
///
/// Errors are logged by the manager and never affect the query.
pub trait QueryMonitor: Debug + Sync + Send {
    /// Called once per query when it's admitted or fails admission.
    fn query_created_event(&self, info: &QueryInfo) -> Result<(), QueryError>;

    /// Called once per query with its final info.
    fn query_completed_event(&self, info: &QueryInfo) -> Result<(), QueryError>;
}

/// Emits an audit record for every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingQueryMonitor;

impl QueryMonitor for TracingQueryMonitor {
    fn query_created_event(&self, info: &QueryInfo) -> Result<(), QueryError> {
        let session = &info.session;
        info!(
            target: "querymgr::audit",
            query_id = %info.query_id,
            state = %info.state,
            user = %session.identity.user,
            source = session.source.as_deref().unwrap_or(""),
            catalog = session.catalog.as_deref().unwrap_or(""),
            schema = session.schema.as_deref().unwrap_or(""),
            create_time = %info.query_stats.create_time,
            query = %info.query,
            "query created",
        );
        Ok(())
    }

    fn query_completed_event(&self, info: &QueryInfo) -> Result<(), QueryError> {
        let session = &info.session;
        let end_time = info
            .query_stats
            .end_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        let error_code = info.error_code().map(|c| c.name()).unwrap_or("");
        info!(
            target: "querymgr::audit",
            query_id = %info.query_id,
            state = %info.state,
            user = %session.identity.user,
            source = session.source.as_deref().unwrap_or(""),
            create_time = %info.query_stats.create_time,
            end_time = %end_time,
            elapsed = ?info.query_stats.elapsed,
            error_code,
            "query completed",
        );
        Ok(())
    }
}
