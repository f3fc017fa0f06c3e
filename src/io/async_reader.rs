//! Asynchronous CSV reader with batch interface
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerOps
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```
//!
//! Rows that fail to parse are logged and counted, never returned, so a
//! batch only ever holds applicable operations.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::io::sync_reader::at_line;
use crate::types::{LedgerError, LedgerOp};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    rows: u64,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rows: 0,
            skipped: 0,
        }
    }

    /// Rows dropped so far because they could not be parsed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Read up to `batch_size` operations
    ///
    /// Returns an empty vector once the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerOp> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let next = match records.next().await {
                Some(next) => next,
                None => break,
            };
            self.rows += 1;
            // Line 1 is the header
            let line = self.rows + 1;

            let op = next
                .map_err(LedgerError::from)
                .and_then(convert_csv_record)
                .map_err(|e| at_line(e, line));
            match op {
                Ok(op) => batch.push(op),
                Err(e) => {
                    self.skipped += 1;
                    warn!(line, error = %e, "skipping unreadable row");
                }
            }
        }

        batch
    }
}
