//! Turning query text into a registered execution.
use std::sync::Arc;

use querymgr_error::{ErrorCode, QueryError};
use querymgr_parser::ast::Expr;
use querymgr_parser::{Statement, StatementParser};
use tracing::{debug, warn};

use crate::errors::{ManagerError, Result};
use crate::events::QueryMonitor;
use crate::execution::failed::FailedQueryExecution;
use crate::execution::info::QueryInfo;
use crate::execution::{ExecutionKind, QueryExecution};
use crate::expiration::ExpirationQueue;
use crate::manager::ManagerState;
use crate::notifier::{add_completion_callback, add_stats_listener};
use crate::query_id::QueryId;
use crate::rewrite::{rewrite_statement, validate_parameters};
use crate::session::{Session, SessionSupplier};
use crate::stats::QueryManagerStats;

/// Pushes an execution onto the expiration queue when dropped.
///
/// Every registered execution must end up in the queue exactly once, or it
/// is never removed from the registry.
struct RetireGuard {
    expiration: Arc<ExpirationQueue>,
    execution: Arc<dyn QueryExecution>,
}

impl Drop for RetireGuard {
    fn drop(&mut self) {
        self.expiration.push(self.execution.clone());
    }
}

/// An execution ready to be registered.
struct Admitted {
    statement: Statement,
    execution: Arc<dyn QueryExecution>,
    info: QueryInfo,
}

/// Admission failure, carrying what was known up to that point.
struct Rejected {
    session: Option<Session>,
    query: String,
    error: QueryError,
}

impl ManagerState {
    pub(crate) fn create_query(
        &self,
        session_supplier: &dyn SessionSupplier,
        query: &str,
    ) -> Result<QueryInfo> {
        if query.is_empty() {
            return Err(ManagerError::InvalidArgument(
                "query must not be empty string".to_string(),
            ));
        }

        let query_id = self.id_generator.create_next_query_id();

        match self.admit(session_supplier, &query_id, query) {
            Ok(admitted) => Ok(self.register_admitted(admitted)),
            Err(rejected) => Ok(self.register_rejected(session_supplier, query_id, rejected)),
        }
    }

    fn admit(
        &self,
        session_supplier: &dyn SessionSupplier,
        query_id: &QueryId,
        query: &str,
    ) -> Result<Admitted, Rejected> {
        let session = match session_supplier.create_session(query_id) {
            Ok(session) => session,
            Err(error) => {
                return Err(Rejected {
                    session: None,
                    query: query.to_string(),
                    error,
                });
            }
        };

        let length = query.chars().count();
        let max_length = self.config.max_query_length;
        if length > max_length {
            return Err(Rejected {
                session: Some(session),
                query: query.chars().take(max_length).collect(),
                error: QueryError::query_text_too_large(length, max_length),
            });
        }

        match self.plan_execution(query_id, query, &session) {
            Ok(admitted) => Ok(admitted),
            Err(error) => Err(Rejected {
                session: Some(session),
                query: query.to_string(),
                error,
            }),
        }
    }

    fn plan_execution(
        &self,
        query_id: &QueryId,
        query: &str,
        session: &Session,
    ) -> Result<Admitted, QueryError> {
        let wrapped = self.parser.parse(query, &session.parse_options())?;
        let (statement, parameters) = unwrap_execute(self.parser.as_ref(), session, wrapped)?;

        let statement = rewrite_statement(&statement, &parameters)?;
        validate_parameters(&statement, &parameters)?;

        let kind = statement.kind();
        let factory = self.factories.get(&kind).ok_or_else(|| {
            QueryError::not_supported(format!("Unsupported statement type: {}", kind.name()))
        })?;

        if let Statement::Explain(explain) = &statement {
            if explain.analyze {
                let inner_is_query = self
                    .factories
                    .get(&explain.body.kind())
                    .is_some_and(|f| f.kind() == ExecutionKind::Query);
                if !inner_is_query {
                    return Err(QueryError::not_supported(
                        "EXPLAIN ANALYZE only supported for statements that are queries",
                    ));
                }
            }
        }

        let execution = factory.create_query_execution(
            query_id.clone(),
            query,
            session,
            &statement,
            &parameters,
        )?;
        let info = execution.query_info()?;

        Ok(Admitted {
            statement,
            execution,
            info,
        })
    }

    fn register_admitted(&self, admitted: Admitted) -> QueryInfo {
        let Admitted {
            statement,
            execution,
            info,
        } = admitted;
        let query_id = execution.query_id().clone();

        match self.registry.insert(execution.clone()) {
            Ok(()) => debug!(%query_id, "registered query"),
            Err(e) => warn!(%query_id, %e, "failed to register query"),
        }

        if let Err(e) = self.monitor.query_created_event(&info) {
            warn!(%query_id, %e, "failed to emit query created event");
        }

        let expiration = self.expiration.clone();
        let stats = self.stats.clone();
        let monitor = self.monitor.clone();
        let weak = Arc::downgrade(&execution);
        add_completion_callback(execution.as_ref(), move || {
            if let Some(execution) = weak.upgrade() {
                let _guard = RetireGuard {
                    expiration: expiration.clone(),
                    execution: execution.clone(),
                };
                match execution.query_info() {
                    Ok(info) => record_completion(&stats, monitor.as_ref(), &info),
                    Err(e) => {
                        warn!(query_id = %execution.query_id(), %e, "failed to read final query info")
                    }
                }
            }
        });

        add_stats_listener(execution.as_ref(), &self.stats);
        self.stats.query_submitted();

        if let Err(e) = self
            .queue_manager
            .submit(&statement, execution.clone(), &self.query_executor)
        {
            debug!(%query_id, %e, "query rejected by queue manager");
            execution.fail(e);
        }

        info
    }

    fn register_rejected(
        &self,
        session_supplier: &dyn SessionSupplier,
        query_id: QueryId,
        rejected: Rejected,
    ) -> QueryInfo {
        let Rejected {
            session,
            query,
            error,
        } = rejected;
        debug!(%query_id, %error, "query failed admission");

        let session = session.unwrap_or_else(|| {
            Session::new(
                query_id.clone(),
                session_supplier.identity(),
                self.clock.now(),
            )
        });
        let resource_group = match error.code {
            ErrorCode::QueryQueueFull => error.resource_group.clone(),
            _ => None,
        };

        let failed = Arc::new(FailedQueryExecution::new(
            query_id,
            query,
            session,
            resource_group,
            error,
            self.clock.clone(),
        ));
        let info = failed.info();

        let execution: Arc<dyn QueryExecution> = failed;
        let _guard = RetireGuard {
            expiration: self.expiration.clone(),
            execution: execution.clone(),
        };

        if let Err(e) = self.registry.insert(execution) {
            warn!(query_id = %info.query_id, %e, "failed to register query");
        }
        if let Err(e) = self.monitor.query_created_event(&info) {
            warn!(query_id = %info.query_id, %e, "failed to emit query created event");
        }
        record_completion(&self.stats, self.monitor.as_ref(), &info);

        info
    }
}

fn record_completion(stats: &QueryManagerStats, monitor: &dyn QueryMonitor, info: &QueryInfo) {
    stats.query_finished(info);
    if let Err(e) = monitor.query_completed_event(info) {
        warn!(query_id = %info.query_id, %e, "failed to emit query completed event");
    }
}

/// Resolve `EXECUTE name USING ...` into the prepared statement and its
/// parameters. Other statements pass through with no parameters.
fn unwrap_execute(
    parser: &dyn StatementParser,
    session: &Session,
    statement: Statement,
) -> Result<(Statement, Vec<Expr>), QueryError> {
    match statement {
        Statement::Execute { name, parameters } => {
            let sql = session.prepared_statement(&name.value)?;
            let statement = parser.parse(sql, &session.parse_options())?;
            Ok((statement, parameters))
        }
        other => Ok((other, Vec::new())),
    }
}
