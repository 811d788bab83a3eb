//! Database connectivity and statement execution.

pub mod connection;
pub mod query;

pub use connection::{
    ensure_managed_identity, managed_identity_descriptor, open, open_with_timeout,
    sql_auth_descriptor, RawConnection, SharedConnection,
};
pub use query::{ExecutionOutcome, QueryExecutor, NO_RESULT_MARKER};
