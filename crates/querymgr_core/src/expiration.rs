use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::execution::QueryExecution;
use crate::query_id::QueryId;

/// Finished queries in the order they finished.
///
/// Each query is pushed exactly once, when its final info is produced.
#[derive(Debug, Default)]
pub struct ExpirationQueue {
    queue: Mutex<VecDeque<Arc<dyn QueryExecution>>>,
}

impl ExpirationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, execution: Arc<dyn QueryExecution>) {
        self.queue.lock().push_back(execution);
    }

    /// Oldest entry.
    pub fn peek(&self) -> Option<Arc<dyn QueryExecution>> {
        self.queue.lock().front().cloned()
    }

    /// Pop the oldest entry if it's for `query_id`.
    pub fn pop_front_if(&self, query_id: &QueryId) -> bool {
        let mut queue = self.queue.lock();
        match queue.front() {
            Some(front) if front.query_id() == query_id => {
                queue.pop_front();
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Entries oldest first.
    pub fn snapshot(&self) -> Vec<Arc<dyn QueryExecution>> {
        self.queue.lock().iter().cloned().collect()
    }
}
