//! Campus Wallet Ledger CLI
//!
//! Replays a CSV of ledger operations and prints the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- --strategy sync operations.csv > balances.csv
//! cargo run -- --config ledger.yaml --journal journal.csv operations.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv > balances.csv
//! ```
//!
//! Balances go to stdout; logs go to stderr (`RUST_LOG` overrides the
//! configured level).
//!
//! # Exit Codes
//!
//! - 0: Success, even when individual operations were rejected
//! - 1: Error (bad configuration, input not readable, output not writable)

use campus_wallet_ledger::io::write_journal_csv;
use campus_wallet_ledger::types::LedgerError;
use campus_wallet_ledger::{cli, logging, strategy};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;

fn run(args: cli::CliArgs) -> Result<(), LedgerError> {
    let config = cli::load_config(&args)?;
    logging::init(&config.logging);

    let batch = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy, config, batch);

    let mut output = std::io::stdout();
    let report = strategy.process(&args.input_file, &mut output)?;

    if let Some(path) = &args.journal {
        let mut journal = BufWriter::new(File::create(path)?);
        write_journal_csv(&report.journal, &mut journal)?;
        journal.flush()?;
    }

    Ok(())
}

fn main() {
    let args = cli::parse_args();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
