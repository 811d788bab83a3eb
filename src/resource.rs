//! The query resource surface.
//!
//! One resource type with a required `query` attribute and a computed
//! `result` attribute. Create executes the statement; read and delete are
//! idempotent no-ops, since an executed statement leaves nothing for the
//! provider to observe or undo.

use crate::database::{ExecutionOutcome, QueryExecutor, SharedConnection};
use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Declarative state of a query resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// The SQL statement, executed as-is.
    pub query: String,

    /// Captured execution output, or the explicit no-result marker.
    pub result: String,
}

/// A query resource bound to a shared connection.
///
/// The connection handle is shared with whatever other resources the host
/// created; this resource never owns or closes it.
pub struct QueryResource {
    executor: QueryExecutor,
}

impl QueryResource {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            executor: QueryExecutor::new(conn),
        }
    }

    /// Create: execute the statement and capture its output into state.
    pub async fn create(&self, query: &str) -> Result<QueryState, ProviderError> {
        let ExecutionOutcome { result, row_count } = self.executor.execute(query).await?;
        debug!(rows = row_count, "query resource created");

        Ok(QueryState {
            query: query.to_string(),
            result,
        })
    }

    /// Read: nothing to refresh, the prior state stands.
    pub fn read(&self, state: &QueryState) -> QueryState {
        state.clone()
    }

    /// Delete: idempotent absence of work, not an error.
    pub fn delete(&self, _state: &QueryState) {}
}
