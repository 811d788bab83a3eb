//! Statement execution against an opened connection.
//!
//! Statements are executed as-is: no parameterization, no parsing. The
//! outcome is success or failure plus a captured display rendering of the
//! first result set, so the host can expose a computed `result` attribute
//! instead of leaving it unpopulated.

use crate::constants::DEFAULT_QUERY_TIMEOUT;
use crate::database::connection::SharedConnection;
use crate::error::ProviderError;
use futures_util::stream::TryStreamExt;
use std::time::{Duration, Instant};
use tiberius::{ColumnData, QueryItem};
use tokio::time::timeout;
use tracing::debug;

/// Marker returned when a statement produces no result set.
pub const NO_RESULT_MARKER: &str = "(no result)";

/// Captured outcome of one statement execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Rows of the first result set rendered as tab-separated lines, or
    /// [`NO_RESULT_MARKER`] when the statement returned nothing.
    pub result: String,

    /// Number of result rows captured.
    pub row_count: usize,
}

/// Executes opaque statements through a shared connection handle.
///
/// The handle's mutex serializes execution; the executor holds a clone of
/// the `Arc`, not exclusive ownership.
pub struct QueryExecutor {
    conn: SharedConnection,
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Executor with the default statement timeout.
    pub fn new(conn: SharedConnection) -> Self {
        Self::with_timeout(conn, DEFAULT_QUERY_TIMEOUT)
    }

    /// Executor with an explicit statement timeout.
    pub fn with_timeout(conn: SharedConnection, query_timeout: Duration) -> Self {
        Self {
            conn,
            query_timeout,
        }
    }

    /// Execute one statement, bounded by the executor's deadline.
    ///
    /// Driver failures surface as [`ProviderError::StatementExecution`] with
    /// the driver's message attached verbatim; a blown deadline is
    /// [`ProviderError::Timeout`], never an indefinite block.
    pub async fn execute(&self, statement: &str) -> Result<ExecutionOutcome, ProviderError> {
        let start = Instant::now();
        debug!(statement = %truncate_for_log(statement, 200), "executing statement");

        let outcome = timeout(self.query_timeout, self.run(statement))
            .await
            .map_err(|_| ProviderError::timeout(self.query_timeout.as_secs()))??;

        debug!(
            rows = outcome.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "statement completed"
        );
        Ok(outcome)
    }

    async fn run(&self, statement: &str) -> Result<ExecutionOutcome, ProviderError> {
        let mut conn = self.conn.lock().await;

        let mut stream = conn.simple_query(statement).await.map_err(|e| {
            ProviderError::execution_with_source(e.to_string(), e)
        })?;

        let mut lines: Vec<String> = Vec::new();
        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|e| ProviderError::execution_with_source(e.to_string(), e))?
        {
            if let QueryItem::Row(row) = item {
                let cells: Vec<String> = row
                    .cells()
                    .map(|(_, data)| render_column_data(data))
                    .collect();
                lines.push(cells.join("\t"));
            }
        }

        let row_count = lines.len();
        let result = if lines.is_empty() {
            NO_RESULT_MARKER.to_string()
        } else {
            lines.join("\n")
        };

        Ok(ExecutionOutcome { result, row_count })
    }
}

/// Render a single column value for the captured result string.
fn render_column_data(data: &ColumnData<'_>) -> String {
    match data {
        ColumnData::Bit(Some(b)) => b.to_string(),
        ColumnData::U8(Some(v)) => v.to_string(),
        ColumnData::I16(Some(v)) => v.to_string(),
        ColumnData::I32(Some(v)) => v.to_string(),
        ColumnData::I64(Some(v)) => v.to_string(),
        ColumnData::F32(Some(v)) => v.to_string(),
        ColumnData::F64(Some(v)) => v.to_string(),
        ColumnData::Numeric(Some(n)) => n.to_string(),
        ColumnData::String(Some(s)) => s.to_string(),
        ColumnData::Guid(Some(g)) => g.to_string(),
        ColumnData::Binary(Some(b)) => format!("0x{}", hex_encode(b)),
        ColumnData::Xml(Some(xml)) => xml.to_string(),
        // All None variants and date/time types the provider does not model.
        _ => "NULL".to_string(),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Truncate a string for logging purposes.
///
/// The input is arbitrary user SQL, so the cut must land on a char
/// boundary, never a raw byte index.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_null_variants() {
        assert_eq!(render_column_data(&ColumnData::I32(None)), "NULL");
        assert_eq!(render_column_data(&ColumnData::String(None)), "NULL");
    }

    #[test]
    fn render_scalars() {
        assert_eq!(render_column_data(&ColumnData::I32(Some(42))), "42");
        assert_eq!(render_column_data(&ColumnData::Bit(Some(true))), "true");
        assert_eq!(
            render_column_data(&ColumnData::String(Some("hello".into()))),
            "hello"
        );
    }

    #[test]
    fn render_binary_as_hex() {
        assert_eq!(
            render_column_data(&ColumnData::Binary(Some(vec![0xde, 0xad].into()))),
            "0xdead"
        );
    }

    #[test]
    fn truncate_for_log_bounds_output() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("this is a long string", 10), "this is a ...");
    }

    #[test]
    fn truncate_for_log_respects_char_boundaries() {
        // A multibyte char spanning the cut index must not panic; the cut
        // steps back to the previous boundary.
        let statement = format!("{}€", "a".repeat(199));
        assert_eq!(truncate_for_log(&statement, 200), format!("{}...", "a".repeat(199)));

        assert_eq!(truncate_for_log("€€€€", 4), "€...");
        assert_eq!(truncate_for_log("€€", 6), "€€");
    }
}
