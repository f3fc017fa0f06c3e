use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay campus wallet operations and print final balances
#[derive(Parser, Debug)]
#[command(name = "campus-wallet-ledger")]
#[command(about = "Replay campus wallet ledger operations and print final balances", long_about = None)]
pub struct CliArgs {
    /// Operation CSV file
    #[arg(value_name = "INPUT", help = "Path to the operation CSV file")]
    pub input_file: PathBuf,

    /// YAML ledger configuration
    #[arg(
        long = "config",
        value_name = "FILE",
        help = "Ledger configuration (fees, role-pair caps, timeouts, logging)"
    )]
    pub config: Option<PathBuf>,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for sequential or 'async' for batched concurrent replay"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batches (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads of the async replay (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Default operation deadline, overriding the configuration file
    #[arg(
        long = "timeout-ms",
        value_name = "MS",
        help = "Deadline of each transfer and fee deduction in milliseconds"
    )]
    pub timeout_ms: Option<u64>,

    /// Log filter, overriding the configuration file
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        help = "Log filter such as 'debug' or 'campus_wallet_ledger=trace' (RUST_LOG wins)"
    )]
    pub log_level: Option<String>,

    /// JSON logs, overriding the configuration file
    #[arg(long = "json-logs", help = "Write logs to stderr as JSON")]
    pub json_logs: bool,

    /// Journal output
    #[arg(
        long = "journal",
        value_name = "FILE",
        help = "Also write every committed transaction to this CSV file"
    )]
    pub journal: Option<PathBuf>,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Batch settings from the command line, defaults for anything unset
    ///
    /// Zero values are replaced by defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}
