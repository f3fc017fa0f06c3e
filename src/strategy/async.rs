//! Batched concurrent replay strategy
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── LedgerConfig   (fees, caps, timeouts)
//!     ├── BatchConfig    (batch_size, max_concurrent_batches)
//!     ├── AsyncReader    (batch CSV reading)
//!     └── BatchProcessor (independent groups on worker threads)
//!             └── LedgerServices
//! ```
//!
//! Batches are applied one after another so that an account's operations
//! keep file order even when they span batches. Within a batch, groups of
//! operations that share no account run in parallel.

use crate::config::LedgerConfig;
use crate::core::{BatchProcessor, LedgerServices};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_balances_csv;
use crate::strategy::{ProcessingStrategy, ReplayReport};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Worker threads of the replay runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Zero values fall back to the defaults with a warning
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "batch_size must be positive, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "max_concurrent_batches must be positive, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    config: LedgerConfig,
    batch: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: LedgerConfig, batch: BatchConfig) -> Self {
        Self { config, batch }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplayReport, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.batch.max_concurrent_batches)
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let services = LedgerServices::from_config(&self.config);
            let processor = BatchProcessor::new(services.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut report = ReplayReport::default();
            loop {
                let batch = reader.read_batch(self.batch.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch before reading on
                for processed in processor.process_batch(batch).await {
                    report.record(processed.op.name(), &processed.result);
                }
            }
            report.skipped_rows = reader.skipped();

            write_balances_csv(&services.balances().await?, output)?;
            report.journal = services.journal().await?;

            info!(
                applied = report.applied,
                failed = report.failed,
                skipped = report.skipped_rows,
                "replay finished"
            );
            Ok(report)
        })
    }
}
