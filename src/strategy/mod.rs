//! Replay strategies for operation files
//!
//! A strategy owns the whole pipeline: read the operation CSV, apply every
//! operation to a fresh ledger built from a [`LedgerConfig`], write the
//! final balances and report what happened. Two implementations can be
//! selected at runtime (sequential and batched concurrent replay); both
//! produce identical balances for the same input.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::types::{LedgerError, OpOutcome, Transaction};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Summary of one replay
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Operations that succeeded, including fees reported as already paid
    pub applied: usize,
    /// Operations rejected by the ledger
    pub failed: usize,
    /// Rows that could not be parsed into an operation
    pub skipped_rows: usize,
    /// Every committed transaction, ordered by id
    pub journal: Vec<Transaction>,
}

impl ReplayReport {
    pub(crate) fn record(&mut self, op: &str, result: &Result<OpOutcome, LedgerError>) {
        match result {
            Ok(outcome) => {
                self.applied += 1;
                debug!(op, ?outcome, "operation applied");
            }
            Err(e) => {
                self.failed += 1;
                warn!(op, error = %e, "operation rejected");
            }
        }
    }
}

pub trait ProcessingStrategy: Send + Sync {
    /// Replay `input_path` and write `account,role,balance` rows to `output`
    ///
    /// Unparsable rows and rejected operations are logged and counted in the
    /// report; they never abort the replay.
    ///
    /// # Errors
    ///
    /// Fatal problems only: the input cannot be opened, the runtime cannot
    /// be built, or the output cannot be written.
    fn process(&self, input_path: &Path, output: &mut dyn Write)
        -> Result<ReplayReport, LedgerError>;
}

/// Build the strategy selected on the command line
///
/// `batch` is only consulted by the async strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: LedgerConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            config,
            batch.unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, Role};

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = ReplayReport::default();
        report.record(
            "open",
            &Ok(OpOutcome::Opened(Account::new("CUS00001", Role::Customer))),
        );
        report.record(
            "fund",
            &Err(LedgerError::account_not_found(&"CUS00009".into())),
        );

        assert_eq!(report.applied, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped_rows, 0);
    }
}
