use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use querymgr_error::QueryError;
use querymgr_parser::{StatementKind, StatementParser};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::QueryManagerConfig;
use crate::errors::{ManagerError, Result};
use crate::events::{QueryMonitor, TracingQueryMonitor};
use crate::execution::info::{QueryInfo, QueryPlan};
use crate::execution::{QueryExecutionFactory, QueryState};
use crate::executor::QueryExecutor;
use crate::expiration::ExpirationQueue;
use crate::maintenance::maintenance_loop;
use crate::memory::{ClusterMemoryManager, NoopClusterMemoryManager};
use crate::query_id::{QueryId, QueryIdGenerator, StageId};
use crate::queue::{ImmediateQueryQueueManager, QueryQueueManager};
use crate::registry::QueryRegistry;
use crate::session::SessionSupplier;
use crate::stats::{QueryManagerStats, QueryManagerStatsSnapshot};

/// How long `stop` waits for failed queries to notify their clients before
/// tearing down the executors.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Shared by the manager handle and the maintenance loop.
#[derive(Debug)]
pub(crate) struct ManagerState {
    pub(crate) config: QueryManagerConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) parser: Arc<dyn StatementParser>,
    pub(crate) factories: HashMap<StatementKind, Arc<dyn QueryExecutionFactory>>,
    pub(crate) queue_manager: Arc<dyn QueryQueueManager>,
    pub(crate) memory_manager: Arc<dyn ClusterMemoryManager>,
    pub(crate) monitor: Arc<dyn QueryMonitor>,
    pub(crate) registry: QueryRegistry,
    pub(crate) expiration: Arc<ExpirationQueue>,
    pub(crate) stats: Arc<QueryManagerStats>,
    pub(crate) id_generator: QueryIdGenerator,
    pub(crate) query_executor: QueryExecutor,
    pub(crate) management_executor: QueryExecutor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Started,
    Stopped,
}

/// Admits queries and tracks them from creation until they're retired.
///
/// Every id handed out by [`QueryManager::create_query`] can be looked up
/// until retention removes it, including ids for queries that failed before
/// they could be planned.
#[derive(Debug)]
pub struct QueryManager {
    state: Arc<ManagerState>,
    lifecycle: Mutex<Lifecycle>,
    shutdown_grace: Duration,
}

impl QueryManager {
    /// Start the maintenance loop.
    ///
    /// Calling this more than once is a no-op. Errors if the manager has been
    /// stopped.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Started => return Ok(()),
            Lifecycle::Stopped => {
                return Err(ManagerError::InvalidArgument(
                    "query manager has been stopped".to_string(),
                ));
            }
            Lifecycle::Created => (),
        }

        let weak = Arc::downgrade(&self.state);
        let interval = self.state.config.management_interval;
        self.state
            .management_executor
            .spawn(maintenance_loop(weak, interval))?;

        *lifecycle = Lifecycle::Started;
        debug!(?interval, "started query manager");

        Ok(())
    }

    /// Fail every unfinished query and shut down the executors.
    ///
    /// Waits a short grace period if any query was failed so clients can
    /// observe the failure. Calling this more than once is a no-op.
    pub fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle == Lifecycle::Stopped {
                return;
            }
            *lifecycle = Lifecycle::Stopped;
        }

        let mut canceled_any = false;
        for execution in self.state.registry.snapshot() {
            if execution.state().is_done() {
                continue;
            }
            let query_id = execution.query_id();
            info!(%query_id, "server shutting down, failing query");
            execution.fail(QueryError::server_shutting_down(format!(
                "Server is shutting down. Query {query_id} has been canceled"
            )));
            canceled_any = true;
        }

        if canceled_any {
            std::thread::sleep(self.shutdown_grace);
        }

        self.state.management_executor.shutdown_now();
        self.state.query_executor.shutdown_now();
    }

    /// Admit a query.
    ///
    /// Only errors if `query` is empty. Anything else that goes wrong is
    /// recorded on a failed query that's registered under a fresh id.
    pub fn create_query(
        &self,
        session_supplier: &dyn SessionSupplier,
        query: &str,
    ) -> Result<QueryInfo> {
        self.state.create_query(session_supplier, query)
    }

    pub fn cancel_query(&self, query_id: &QueryId) {
        debug!(%query_id, "cancel query");
        if let Some(execution) = self.state.registry.get(query_id) {
            execution.cancel_query();
        }
    }

    pub fn cancel_stage(&self, stage_id: &StageId) {
        debug!(%stage_id, "cancel stage");
        if let Some(execution) = self.state.registry.get(&stage_id.query_id) {
            execution.cancel_stage(stage_id);
        }
    }

    /// Mark the query as recently accessed. Unknown ids are ignored.
    pub fn record_heartbeat(&self, query_id: &QueryId) {
        if let Some(execution) = self.state.registry.get(query_id) {
            execution.record_heartbeat();
        }
    }

    pub fn get_query_info(&self, query_id: &QueryId) -> Result<QueryInfo> {
        let execution = self
            .state
            .registry
            .get(query_id)
            .ok_or_else(|| ManagerError::QueryNotFound(query_id.clone()))?;
        Ok(execution.query_info()?)
    }

    /// Info for every registered query. Queries whose info can't be read are
    /// skipped.
    pub fn get_all_query_info(&self) -> Vec<QueryInfo> {
        self.state
            .registry
            .snapshot()
            .into_iter()
            .filter_map(|execution| execution.query_info().ok())
            .collect()
    }

    pub fn get_query_state(&self, query_id: &QueryId) -> Option<QueryState> {
        self.state.registry.get(query_id).map(|e| e.state())
    }

    pub fn get_query_resource_group(&self, query_id: &QueryId) -> Option<String> {
        self.state
            .registry
            .get(query_id)
            .and_then(|e| e.resource_group())
    }

    pub fn get_query_plan(&self, query_id: &QueryId) -> Result<QueryPlan> {
        let execution = self
            .state
            .registry
            .get(query_id)
            .ok_or_else(|| ManagerError::QueryNotFound(query_id.clone()))?;
        execution
            .query_plan()
            .ok_or_else(|| ManagerError::PlanUnavailable(query_id.clone()))
    }

    /// Block until the query leaves `current` or `max_wait` elapses,
    /// returning the unused wait.
    ///
    /// Returns `max_wait` immediately for unknown ids.
    pub fn wait_for_state_change(
        &self,
        query_id: &QueryId,
        current: QueryState,
        max_wait: Duration,
    ) -> Duration {
        match self.state.registry.get(query_id) {
            Some(execution) => execution.wait_for_state_change(current, max_wait),
            None => max_wait,
        }
    }

    pub fn stats(&self) -> QueryManagerStatsSnapshot {
        self.state.stats.snapshot()
    }

    pub fn config(&self) -> &QueryManagerConfig {
        &self.state.config
    }

    /// Run one round of maintenance on the calling thread.
    pub fn run_maintenance_tick(&self) {
        self.state.run_maintenance_tick();
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &ManagerState {
        &self.state
    }
}

/// Builds a [`QueryManager`].
///
/// Anything not set explicitly falls back to a default: queries start
/// immediately on the query executor, memory limits aren't enforced, events
/// are logged through `tracing`, and the system clock is used.
#[derive(Debug)]
pub struct QueryManagerBuilder {
    config: QueryManagerConfig,
    parser: Arc<dyn StatementParser>,
    factories: HashMap<StatementKind, Arc<dyn QueryExecutionFactory>>,
    queue_manager: Arc<dyn QueryQueueManager>,
    memory_manager: Arc<dyn ClusterMemoryManager>,
    monitor: Arc<dyn QueryMonitor>,
    clock: Arc<dyn Clock>,
    shutdown_grace: Duration,
}

impl QueryManagerBuilder {
    pub fn new(config: QueryManagerConfig, parser: Arc<dyn StatementParser>) -> Self {
        QueryManagerBuilder {
            config,
            parser,
            factories: HashMap::new(),
            queue_manager: Arc::new(ImmediateQueryQueueManager),
            memory_manager: Arc::new(NoopClusterMemoryManager),
            monitor: Arc::new(TracingQueryMonitor),
            clock: Arc::new(SystemClock),
            shutdown_grace: SHUTDOWN_GRACE_PERIOD,
        }
    }

    /// Register the factory for a kind of statement, replacing any previous
    /// one.
    pub fn with_factory(
        mut self,
        kind: StatementKind,
        factory: Arc<dyn QueryExecutionFactory>,
    ) -> Self {
        self.factories.insert(kind, factory);
        self
    }

    pub fn with_queue_manager(mut self, queue_manager: Arc<dyn QueryQueueManager>) -> Self {
        self.queue_manager = queue_manager;
        self
    }

    pub fn with_memory_manager(mut self, memory_manager: Arc<dyn ClusterMemoryManager>) -> Self {
        self.memory_manager = memory_manager;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn build(self) -> Result<QueryManager> {
        self.config.validate()?;

        let query_executor =
            QueryExecutor::try_new("query-scheduler", self.config.query_executor_pool_size)?;
        let management_executor = QueryExecutor::try_new(
            "query-management",
            self.config.management_executor_pool_size,
        )?;

        let state = ManagerState {
            id_generator: QueryIdGenerator::new(self.clock.clone()),
            config: self.config,
            clock: self.clock,
            parser: self.parser,
            factories: self.factories,
            queue_manager: self.queue_manager,
            memory_manager: self.memory_manager,
            monitor: self.monitor,
            registry: QueryRegistry::new(),
            expiration: Arc::new(ExpirationQueue::new()),
            stats: Arc::new(QueryManagerStats::new()),
            query_executor,
            management_executor,
        };

        Ok(QueryManager {
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle::Created),
            shutdown_grace: self.shutdown_grace,
        })
    }
}
