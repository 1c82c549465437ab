use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::errors::{Result, internal};
use crate::execution::QueryExecution;
use crate::query_id::QueryId;

/// All queries the manager currently knows about.
///
/// An id is inserted at most once. Entries are only removed by retention.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: DashMap<QueryId, Arc<dyn QueryExecution>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, execution: Arc<dyn QueryExecution>) -> Result<()> {
        match self.queries.entry(execution.query_id().clone()) {
            Entry::Occupied(ent) => Err(internal!("Query {} already registered", ent.key())),
            Entry::Vacant(ent) => {
                ent.insert(execution);
                Ok(())
            }
        }
    }

    pub fn get(&self, query_id: &QueryId) -> Option<Arc<dyn QueryExecution>> {
        self.queries.get(query_id).map(|ent| ent.value().clone())
    }

    pub fn remove(&self, query_id: &QueryId) -> Option<Arc<dyn QueryExecution>> {
        self.queries.remove(query_id).map(|(_, execution)| execution)
    }

    pub fn contains(&self, query_id: &QueryId) -> bool {
        self.queries.contains_key(query_id)
    }

    /// Handles to every registered query.
    ///
    /// Queries registered or removed while the snapshot is taken may or may
    /// not be included.
    pub fn snapshot(&self) -> Vec<Arc<dyn QueryExecution>> {
        self.queries.iter().map(|ent| ent.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
