//! Test doubles shared across the crate's tests.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use querymgr_error::QueryError;
use querymgr_parser::ast::{
    Expr, Insert, Literal, ObjectReference, QueryNode, QueryNodeBody, SelectExpr, SelectNode, Values,
};
use querymgr_parser::{ParseError, ParseOptions, Statement, StatementParser};

use crate::clock::{Clock, ManualClock};
use crate::events::QueryMonitor;
use crate::execution::info::{QueryInfo, QueryPlan, StageInfo, StageState, TaskInfo};
use crate::execution::state_machine::QueryStateMachine;
use crate::execution::{
    ExecutionKind, QueryExecution, QueryExecutionFactory, QueryState, StateChangeListener,
};
use crate::executor::QueryExecutor;
use crate::memory::ClusterMemoryManager;
use crate::query_id::{QueryId, StageId};
use crate::queue::QueryQueueManager;
use crate::session::{Identity, Session, SessionSupplier};

/// Clock fixed at 2024-03-01 12:00:00 UTC.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ))
}

pub fn number(n: usize) -> Expr {
    Expr::Literal(Literal::Number(n.to_string()))
}

/// `SELECT 1`
pub fn select_statement() -> Statement {
    Statement::Query(QueryNode::from_body(QueryNodeBody::Select(Box::new(
        SelectNode {
            distinct: None,
            projections: vec![SelectExpr::Expr(number(1))],
            from: None,
            where_expr: None,
            group_by: None,
            having: None,
        },
    ))))
}

/// `INSERT INTO t VALUES (?, ...)` with a single row of placeholders.
pub fn insert_values_statement(placeholders: usize) -> Statement {
    Statement::Insert(Insert {
        table: ObjectReference::from_strings(["t"]),
        columns: Vec::new(),
        source: QueryNode::from_body(QueryNodeBody::Values(Values {
            rows: vec![(0..placeholders).map(Expr::Parameter).collect()],
        })),
    })
}

/// Execution that only moves when the test moves it.
///
/// `start` moves it to running.
#[derive(Debug)]
pub struct TestQueryExecution {
    state_machine: QueryStateMachine,
    fail_info: AtomicBool,
    canceled_stages: Mutex<Vec<StageId>>,
}

impl TestQueryExecution {
    pub fn new(query_id: QueryId, query: &str, session: Session, clock: Arc<ManualClock>) -> Self {
        let state_machine = QueryStateMachine::new(query_id.clone(), query.to_string(), session, clock);

        let stage_id = StageId::new(query_id, 0);
        state_machine.set_output_stage(StageInfo {
            stage_id: stage_id.clone(),
            state: StageState::Planned,
            tasks: vec![TaskInfo {
                task_id: format!("{stage_id}.0"),
                state: StageState::Planned,
            }],
            sub_stages: Vec::new(),
        });

        TestQueryExecution {
            state_machine,
            fail_info: AtomicBool::new(false),
            canceled_stages: Mutex::new(Vec::new()),
        }
    }

    pub fn new_arc(query_id: &str, clock: Arc<ManualClock>) -> Arc<Self> {
        let query_id: QueryId = query_id.parse().unwrap();
        let session = Session::new(query_id.clone(), Identity::new("alice"), clock.as_ref().now());
        Arc::new(Self::new(query_id, "SELECT 1", session, clock))
    }

    pub fn state_machine(&self) -> &QueryStateMachine {
        &self.state_machine
    }

    /// Run through to finished from wherever the query is.
    pub fn finish(&self) {
        self.state_machine.transition_to_running();
        self.state_machine.transition_to_finishing();
        self.state_machine.transition_to_finished();
    }

    /// Make `query_info` return an error.
    pub fn set_fail_info(&self, fail: bool) {
        self.fail_info.store(fail, Ordering::SeqCst);
    }

    pub fn canceled_stages(&self) -> Vec<StageId> {
        self.canceled_stages.lock().clone()
    }
}

impl QueryExecution for TestQueryExecution {
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
        if self.fail_info.load(Ordering::SeqCst) {
            return Err(QueryError::internal("query info unavailable"));
        }
        Ok(self.state_machine.query_info())
    }

    fn resource_group(&self) -> Option<String> {
        self.state_machine.resource_group()
    }

    fn query_plan(&self) -> Option<QueryPlan> {
        Some(QueryPlan {
            root: format!("Output[{}]", self.state_machine.query()),
        })
    }

    fn start(&self) {
        self.state_machine.transition_to_running();
    }

    fn fail(&self, error: QueryError) {
        self.state_machine.transition_to_failed(error);
    }

    fn cancel_query(&self) {
        self.state_machine.transition_to_canceled();
    }

    fn cancel_stage(&self, stage_id: &StageId) {
        self.canceled_stages.lock().push(stage_id.clone());
    }

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

/// Creates [`TestQueryExecution`]s and keeps a handle to each.
#[derive(Debug)]
pub struct TestExecutionFactory {
    kind: ExecutionKind,
    clock: Arc<ManualClock>,
    fail_with: Option<QueryError>,
    created: Mutex<Vec<Arc<TestQueryExecution>>>,
    received: Mutex<Vec<(Statement, Vec<Expr>)>>,
}

impl TestExecutionFactory {
    pub fn new(kind: ExecutionKind, clock: Arc<ManualClock>) -> Self {
        TestExecutionFactory {
            kind,
            clock,
            fail_with: None,
            created: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ExecutionKind, clock: Arc<ManualClock>, error: QueryError) -> Self {
        TestExecutionFactory {
            fail_with: Some(error),
            ..Self::new(kind, clock)
        }
    }

    pub fn created(&self) -> Vec<Arc<TestQueryExecution>> {
        self.created.lock().clone()
    }

    /// Statements and parameters passed to the factory.
    pub fn received(&self) -> Vec<(Statement, Vec<Expr>)> {
        self.received.lock().clone()
    }
}

impl QueryExecutionFactory for TestExecutionFactory {
    fn kind(&self) -> ExecutionKind {
        self.kind
    }

    fn create_query_execution(
        &self,
        query_id: QueryId,
        query: &str,
        session: &Session,
        statement: &Statement,
        parameters: &[Expr],
    ) -> Result<Arc<dyn QueryExecution>, QueryError> {
        self.received
            .lock()
            .push((statement.clone(), parameters.to_vec()));
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let execution = Arc::new(TestQueryExecution::new(
            query_id,
            query,
            session.clone(),
            self.clock.clone(),
        ));
        self.created.lock().push(execution.clone());
        Ok(execution)
    }
}

/// Parser that knows a fixed set of statements.
#[derive(Debug, Default)]
pub struct FixedStatementParser {
    statements: HashMap<String, Statement>,
    options_seen: Mutex<Vec<ParseOptions>>,
}

impl FixedStatementParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, sql: &str, statement: Statement) -> Self {
        self.statements.insert(sql.to_string(), statement);
        self
    }

    pub fn options_seen(&self) -> Vec<ParseOptions> {
        self.options_seen.lock().clone()
    }
}

impl StatementParser for FixedStatementParser {
    fn parse(&self, sql: &str, options: &ParseOptions) -> Result<Statement, ParseError> {
        self.options_seen.lock().push(*options);
        self.statements
            .get(sql)
            .cloned()
            .ok_or_else(|| ParseError::new(format!("mismatched input '{sql}'"), 1, 1))
    }
}

#[derive(Debug)]
pub struct TestSessionSupplier {
    clock: Arc<ManualClock>,
    fail: bool,
    prepared: HashMap<String, String>,
    properties: Vec<(&'static str, &'static str)>,
}

impl TestSessionSupplier {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        TestSessionSupplier {
            clock,
            fail: false,
            prepared: HashMap::new(),
            properties: Vec::new(),
        }
    }

    pub fn failing(clock: Arc<ManualClock>) -> Self {
        TestSessionSupplier {
            fail: true,
            ..Self::new(clock)
        }
    }

    pub fn with_prepared_statement(mut self, name: &str, sql: &str) -> Self {
        self.prepared.insert(name.to_string(), sql.to_string());
        self
    }

    pub fn with_property(mut self, name: &'static str, value: &'static str) -> Self {
        self.properties.push((name, value));
        self
    }
}

impl SessionSupplier for TestSessionSupplier {
    fn create_session(&self, query_id: &QueryId) -> Result<Session, QueryError> {
        if self.fail {
            return Err(QueryError::new(
                querymgr_error::ErrorCode::InvalidSessionProperty,
                "bad session",
            ));
        }
        let mut session = Session::new(query_id.clone(), self.identity(), self.clock.as_ref().now())
            .with_source("test")
            .with_catalog("memory")
            .with_schema("public");
        for (name, value) in &self.properties {
            session = session.with_property(name, value)?;
        }
        for (name, sql) in &self.prepared {
            session = session.with_prepared_statement(name.clone(), sql.clone());
        }
        Ok(session)
    }

    fn identity(&self) -> Identity {
        Identity::new("alice")
    }
}

#[derive(Debug, Default)]
pub struct RecordingMonitor {
    pub created: Mutex<Vec<QueryInfo>>,
    pub completed: Mutex<Vec<QueryInfo>>,
    fail: AtomicBool,
}

impl RecordingMonitor {
    pub fn failing() -> Self {
        RecordingMonitor {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }
}

impl QueryMonitor for RecordingMonitor {
    fn query_created_event(&self, info: &QueryInfo) -> Result<(), QueryError> {
        self.created.lock().push(info.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueryError::internal("monitor unavailable"));
        }
        Ok(())
    }

    fn query_completed_event(&self, info: &QueryInfo) -> Result<(), QueryError> {
        self.completed.lock().push(info.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueryError::internal("monitor unavailable"));
        }
        Ok(())
    }
}

/// Records the batches it's given, optionally panicking.
#[derive(Debug, Default)]
pub struct RecordingMemoryManager {
    pub batches: Mutex<Vec<Vec<QueryId>>>,
    panic: bool,
}

impl RecordingMemoryManager {
    pub fn panicking() -> Self {
        RecordingMemoryManager {
            panic: true,
            ..Default::default()
        }
    }
}

impl ClusterMemoryManager for RecordingMemoryManager {
    fn process(&self, queries: &[Arc<dyn QueryExecution>]) -> Result<(), QueryError> {
        if self.panic {
            panic!("memory manager exploded");
        }
        self.batches
            .lock()
            .push(queries.iter().map(|q| q.query_id().clone()).collect());
        Ok(())
    }
}

/// Accepts queries without starting them.
#[derive(Debug, Default)]
pub struct HoldingQueueManager;

impl QueryQueueManager for HoldingQueueManager {
    fn submit(
        &self,
        _statement: &Statement,
        _execution: Arc<dyn QueryExecution>,
        _executor: &QueryExecutor,
    ) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Rejects every query as if its resource group were full.
#[derive(Debug, Default)]
pub struct RejectingQueueManager;

impl QueryQueueManager for RejectingQueueManager {
    fn submit(
        &self,
        _statement: &Statement,
        _execution: Arc<dyn QueryExecution>,
        _executor: &QueryExecutor,
    ) -> Result<(), QueryError> {
        Err(QueryError::queue_full(
            "global.adhoc",
            "Too many queued queries for \"global.adhoc\"",
        ))
    }
}
