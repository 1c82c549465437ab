use std::time::Duration;

use chrono::{DateTime, Utc};
use querymgr_error::{ErrorCode, QueryError};
use serde::Serialize;

use super::QueryState;
use crate::query_id::{QueryId, StageId};
use crate::session::Session;

/// Point in time snapshot of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub query_id: QueryId,
    pub session: Session,
    pub state: QueryState,
    pub query: String,
    pub query_stats: QueryStats,
    pub resource_group: Option<String>,
    pub failure: Option<QueryError>,
    pub output_stage: Option<StageInfo>,
    /// Set once the query is terminal and this snapshot won't change, apart
    /// from pruning.
    pub final_query_info: bool,
    /// Set once per-stage detail has been dropped.
    pub pruned: bool,
}

impl QueryInfo {
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.failure.as_ref().map(|f| f.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    pub create_time: DateTime<Utc>,
    pub execution_start_time: Option<DateTime<Utc>>,
    pub last_heartbeat: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageState {
    Planned,
    Running,
    Finished,
    Canceled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub state: StageState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub stage_id: StageId,
    pub state: StageState,
    pub tasks: Vec<TaskInfo>,
    pub sub_stages: Vec<StageInfo>,
}

impl StageInfo {
    /// Drop task and sub stage detail.
    pub fn pruned(&self) -> StageInfo {
        StageInfo {
            stage_id: self.stage_id.clone(),
            state: self.state,
            tasks: Vec::new(),
            sub_stages: Vec::new(),
        }
    }

    /// Find a stage in this tree.
    pub fn find(&self, stage_id: &StageId) -> Option<&StageInfo> {
        if &self.stage_id == stage_id {
            return Some(self);
        }
        self.sub_stages.iter().find_map(|s| s.find(stage_id))
    }
}

/// A physical plan rendering for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub root: String,
}
