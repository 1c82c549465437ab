use querymgr_error::{ErrorCode, QueryError};

use crate::query_id::QueryId;

/// Errors returned across the manager's public boundary.
///
/// Query-domain failures are attached to the query itself and are only
/// surfaced here when a caller asks for something the query can't provide.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("query not found: {0}")]
    QueryNotFound(QueryId),

    #[error("query plan unavailable for {0}")]
    PlanUnavailable(QueryId),

    #[error("executor '{0}' has been shut down")]
    ExecutorShutdown(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid session property: {0}")]
    InvalidSessionProperty(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = ManagerError> = std::result::Result<T, E>;

impl From<ManagerError> for QueryError {
    fn from(value: ManagerError) -> Self {
        match value {
            ManagerError::Query(e) => e,
            ManagerError::InvalidSessionProperty(msg) => {
                QueryError::new(ErrorCode::InvalidSessionProperty, msg)
            }
            ManagerError::ExecutorShutdown(name) => QueryError::server_shutting_down(format!(
                "Executor '{name}' is no longer accepting work"
            )),
            other => QueryError::internal(other.to_string()),
        }
    }
}

#[allow(unused_macros)]
macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::ManagerError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_query_error() {
        let err: QueryError = ManagerError::InvalidSessionProperty("bad".to_string()).into();
        assert_eq!(ErrorCode::InvalidSessionProperty, err.code);

        let err: QueryError = internal!("broken {}", 1).into();
        assert_eq!(ErrorCode::GenericInternalError, err.code);
        assert_eq!("internal error: broken 1", err.message);

        let original = QueryError::syntax("oops");
        let err: QueryError = ManagerError::from(original.clone()).into();
        assert_eq!(original, err);
    }
}
