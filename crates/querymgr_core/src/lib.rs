//! Query lifecycle management.
//!
//! The [`QueryManager`] admits query text, tracks every resulting execution
//! in a registry until it is retired, and runs a periodic maintenance loop
//! that fails abandoned and overlong queries, delegates memory enforcement,
//! and bounds the history of finished queries.
pub mod clock;
pub mod config;
pub mod duration;
pub mod errors;
pub mod events;
pub mod execution;
pub mod executor;
pub mod expiration;
pub mod manager;
pub mod memory;
pub mod notifier;
pub mod query_id;
pub mod queue;
pub mod registry;
pub mod rewrite;
pub mod session;
pub mod stats;

mod admission;
mod maintenance;

#[cfg(test)]
mod testutil;

pub use config::QueryManagerConfig;
pub use errors::{ManagerError, Result};
pub use execution::{ExecutionKind, QueryExecution, QueryExecutionFactory, QueryState};
pub use manager::{QueryManager, QueryManagerBuilder};
pub use query_id::{QueryId, StageId};
pub use session::{Identity, Session, SessionSupplier};
