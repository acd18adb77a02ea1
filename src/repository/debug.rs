//! Tracing decorator for adapters
//!
//! Wraps any [`Adapter`] and emits a `debug` event before and after every
//! call, with its arguments, the elapsed time, the amount of data returned and
//! the error, if any. Events use the `wide_column_events::debug_adapter`
//! target, so they can be enabled on their own:
//!
//! ```text
//! RUST_LOG=wide_column_events::debug_adapter=debug wce events ...
//! ```

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::adapter::{Adapter, RowFilter, RowSet};
use crate::error::StorageError;
use crate::types::{Mutation, Row};

const TARGET: &str = "wide_column_events::debug_adapter";

/// Adapter decorator that traces every storage call
#[derive(Debug)]
pub struct DebugAdapter<A> {
    inner: A,
}

impl<A: Adapter> DebugAdapter<A> {
    /// Wrap an adapter
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    /// The wrapped adapter
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: Adapter> Adapter for DebugAdapter<A> {
    fn adapter_id(&self) -> &str {
        self.inner.adapter_id()
    }

    async fn read_row(&self, key: &str) -> Result<Option<Row>, StorageError> {
        debug!(target: TARGET, key, "ReadRow");
        let start = Instant::now();
        let result = self.inner.read_row(key).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(row) => debug!(
                target: TARGET,
                key,
                found = row.is_some(),
                cells = row.as_ref().map_or(0, Row::cell_count),
                ?elapsed,
                "ReadRow done"
            ),
            Err(e) => debug!(target: TARGET, key, ?elapsed, error = %e, "ReadRow failed"),
        }
        result
    }

    async fn read_rows(
        &self,
        row_set: &RowSet,
        filter: &RowFilter,
        visit: &mut (dyn FnMut(Row) -> bool + Send),
    ) -> Result<(), StorageError> {
        debug!(target: TARGET, ?row_set, ?filter, "ReadRows");
        let start = Instant::now();
        let mut rows = 0usize;
        let result = self
            .inner
            .read_rows(row_set, filter, &mut |row: Row| {
                rows += 1;
                visit(row)
            })
            .await;
        let elapsed = start.elapsed();
        match &result {
            Ok(()) => debug!(target: TARGET, rows, ?elapsed, "ReadRows done"),
            Err(e) => debug!(target: TARGET, rows, ?elapsed, error = %e, "ReadRows failed"),
        }
        result
    }

    async fn apply_bulk(
        &self,
        row_keys: &[String],
        mutations: &[Mutation],
    ) -> Result<Vec<Option<StorageError>>, StorageError> {
        debug!(target: TARGET, ?row_keys, mutations = mutations.len(), "ApplyBulk");
        let start = Instant::now();
        let result = self.inner.apply_bulk(row_keys, mutations).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(errors) => debug!(
                target: TARGET,
                ?elapsed,
                errored_items = errors.iter().filter(|e| e.is_some()).count(),
                "ApplyBulk done"
            ),
            Err(e) => debug!(target: TARGET, ?elapsed, error = %e, "ApplyBulk failed"),
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::subscriber::DefaultGuard;

    use super::*;
    use crate::repository::MemoryAdapter;
    use crate::types::{Cell, Timestamp};

    /// Formatted log output shared with the subscriber
    #[derive(Clone, Default)]
    pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .map(str::to_string)
                .collect()
        }

        pub(crate) fn lines_with(&self, needle: &str) -> Vec<String> {
            self.lines().into_iter().filter(|l| l.contains(needle)).collect()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Capture every event at debug level and above on the current thread
    pub(crate) fn capture_logs() -> (DefaultGuard, LogBuffer) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_target(true)
            .with_writer(move || writer.clone())
            .finish();
        (tracing::subscriber::set_default(subscriber), buffer)
    }

    #[tokio::test]
    async fn test_calls_are_forwarded() {
        let adapter = DebugAdapter::new(MemoryAdapter::with_cells(vec![
            Cell::new("a", "front:d", Timestamp(1), "1"),
            Cell::new("b", "front:d", Timestamp(1), "2"),
        ]));
        assert_eq!(adapter.adapter_id(), "memory");
        assert!(adapter.read_row("a").await.unwrap().is_some());

        let mut keys = Vec::new();
        adapter
            .read_rows(&RowSet::All, &RowFilter::PassAll, &mut |row: Row| {
                keys.push(row.key().to_string());
                true
            })
            .await
            .unwrap();
        assert_eq!(keys, vec!["a", "b"]);

        let mut mutation = Mutation::new();
        mutation.set("front", "d", Timestamp(2), "1");
        let errors = adapter
            .apply_bulk(&["c".to_string()], &[mutation])
            .await
            .unwrap();
        assert_eq!(errors, vec![None]);
        assert_eq!(adapter.inner().row_count(), 3);
    }

    #[tokio::test]
    async fn test_errors_are_passed_through() {
        let adapter = DebugAdapter::new(MemoryAdapter::new());
        let inverted = RowSet::Range {
            start: "z".into(),
            end: "a".into(),
        };
        let err = adapter
            .read_rows(&inverted, &RowFilter::PassAll, &mut |_row: Row| true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidRowSet(_)));
    }

    #[tokio::test]
    async fn test_two_events_per_call() {
        let (_guard, logs) = capture_logs();
        let adapter = DebugAdapter::new(MemoryAdapter::with_cells(vec![Cell::new(
            "a",
            "front:d",
            Timestamp(1),
            "1",
        )]));
        assert!(logs.lines_with(TARGET).is_empty());

        adapter.read_row("a").await.unwrap();
        let lines = logs.lines_with(TARGET);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ReadRow") && lines[0].contains("key=\"a\""));
        assert!(lines[1].contains("ReadRow done") && lines[1].contains("found=true"));

        adapter
            .read_rows(&RowSet::All, &RowFilter::PassAll, &mut |_row: Row| true)
            .await
            .unwrap();
        let lines = logs.lines_with(TARGET);
        assert_eq!(lines.len(), 4);
        assert!(lines[3].contains("ReadRows done") && lines[3].contains("rows=1"));

        let mut mutation = Mutation::new();
        mutation.set("front", "d", Timestamp(2), "2");
        adapter
            .apply_bulk(&["b".to_string()], &[mutation])
            .await
            .unwrap();
        let lines = logs.lines_with(TARGET);
        assert_eq!(lines.len(), 6);
        assert!(lines[4].contains("ApplyBulk"));
        assert!(lines[5].contains("ApplyBulk done") && lines[5].contains("errored_items=0"));
    }

    #[tokio::test]
    async fn test_failed_call_is_logged() {
        let (_guard, logs) = capture_logs();
        let adapter = DebugAdapter::new(MemoryAdapter::new());
        let inverted = RowSet::Range {
            start: "z".into(),
            end: "a".into(),
        };
        adapter
            .read_rows(&inverted, &RowFilter::PassAll, &mut |_row: Row| true)
            .await
            .unwrap_err();
        adapter.apply_bulk(&["a".to_string()], &[]).await.unwrap_err();

        let lines = logs.lines_with(TARGET);
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("ReadRows failed") && lines[1].contains("error="));
        assert!(lines[3].contains("ApplyBulk failed") && lines[3].contains("error="));
    }
}
