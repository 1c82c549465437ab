use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::errors::{ManagerError, Result};

/// A named pool of worker threads.
///
/// Refuses new work once shut down.
#[derive(Debug)]
pub struct QueryExecutor {
    name: &'static str,
    runtime: Mutex<Option<Runtime>>,
}

impl QueryExecutor {
    pub fn try_new(name: &'static str, threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name_fn(move || {
                static THREAD_ID: AtomicU64 = AtomicU64::new(0);
                let id = THREAD_ID.fetch_add(1, Ordering::Relaxed);
                format!("{name}-{id}")
            })
            .enable_time()
            .build()
            .map_err(|e| ManagerError::Internal(format!("failed to build {name} runtime: {e}")))?;

        Ok(QueryExecutor {
            name,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn spawn<F>(&self, fut: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = self.runtime.lock();
        match runtime.as_ref() {
            Some(runtime) => {
                let _ = runtime.spawn(fut);
                Ok(())
            }
            None => Err(ManagerError::ExecutorShutdown(self.name)),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.runtime.lock().is_none()
    }

    /// Stop accepting work and tear down the threads without waiting for
    /// running tasks.
    pub fn shutdown_now(&self) {
        let runtime = self.runtime.lock().take();
        if let Some(runtime) = runtime {
            debug!(executor = self.name, "shutting down executor");
            runtime.shutdown_background();
        }
    }
}

impl Drop for QueryExecutor {
    fn drop(&mut self) {
        // Dropping a runtime normally blocks, which isn't allowed if we're
        // dropped from one of its own tasks.
        self.shutdown_now();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn spawn_runs_task() {
        let executor = QueryExecutor::try_new("test-executor", 1).unwrap();
        let (tx, rx) = mpsc::channel();
        executor
            .spawn(async move {
                let name = std::thread::current().name().map(|s| s.to_string());
                tx.send(name).unwrap();
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("test-executor-"), "name: {name}");
    }

    #[test]
    fn refuses_work_after_shutdown() {
        let executor = QueryExecutor::try_new("test-executor", 1).unwrap();
        executor.shutdown_now();
        executor.shutdown_now();

        assert!(executor.is_shutdown());
        assert!(matches!(
            executor.spawn(async {}),
            Err(ManagerError::ExecutorShutdown("test-executor"))
        ));
    }
}
