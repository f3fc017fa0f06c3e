//! Sequential replay strategy
//!
//! Streams rows through `SyncReader` and applies each operation in file
//! order on a single-threaded runtime. Transaction ids in the journal follow
//! file order exactly, which makes this the reference strategy for
//! comparing outputs.

use crate::config::LedgerConfig;
use crate::core::LedgerServices;
use crate::io::csv_format::write_balances_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ReplayReport};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Sequential replay strategy
///
/// ```no_run
/// use campus_wallet_ledger::config::LedgerConfig;
/// use campus_wallet_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let report = strategy
///     .process(Path::new("operations.csv"), &mut std::io::stdout())
///     .expect("replay failed");
/// eprintln!("{} applied, {} rejected", report.applied, report.failed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplayReport, LedgerError> {
        // The engine is async; a current-thread runtime keeps this strategy
        // on the calling thread. Timers drive operation deadlines.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let reader = SyncReader::new(input_path)?;
        let services = LedgerServices::from_config(&self.config);

        runtime.block_on(async {
            let mut report = ReplayReport::default();

            for row in reader {
                match row {
                    Ok(op) => {
                        let name = op.name();
                        let result = services.execute(op).await;
                        report.record(name, &result);
                    }
                    Err(e) => {
                        report.skipped_rows += 1;
                        warn!(error = %e, "skipping unreadable row");
                    }
                }
            }

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
