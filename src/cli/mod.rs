// CLI module
// Command-line parsing and configuration loading

mod args;

pub use args::{CliArgs, StrategyType};

use crate::config::LedgerConfig;
use crate::types::LedgerError;
use clap::Parser;

/// Parse command-line arguments using clap
///
/// Invalid arguments and `--help` make clap print and exit the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Configuration named by `--config` (or the defaults) with command-line
/// overrides applied on top
///
/// `--timeout-ms`, `--log-level` and `--json-logs` replace the matching file
/// values. The result is validated again, so `--timeout-ms 0` is rejected.
pub fn load_config(args: &CliArgs) -> Result<LedgerConfig, LedgerError> {
    let mut config = match &args.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };

    if let Some(timeout_ms) = args.timeout_ms {
        config.operation_timeout_ms = timeout_ms;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}
