//! Campus Wallet Ledger Library
//! # Overview
//!
//! The money-moving core of a campus digital wallet. Customers, restaurants,
//! treasury collectors, treasury masters and admins hold balances; value
//! moves between them through transfers, and each newly registered customer
//! pays a one-time registration fee.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, transactions, fees, operations and errors
//! - [`core`] - The ledger:
//!   - [`core::sequence`] - Gapless named counters for transaction and member ids
//!   - [`core::ledger_store`] - Balances with atomic adjust and guarded debit
//!   - [`core::unit_of_work`] - All-or-nothing commits over locked accounts
//!   - [`core::limit_policy`] - Role-pair per-transfer caps, bypassed in bulk mode
//!   - [`core::engine`] - Transfers, balance queries, listing and amendment
//!   - [`core::fee_saga`] - Exactly-once registration fee deduction
//! - [`io`] - Operation CSV readers and balance/journal writers
//! - [`strategy`] - Sequential and batched concurrent replay
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`cli`] - Command-line parsing
//!
//! # Guarantees
//!
//! - A transfer moves exactly its amount: the sender loses what the
//!   receiver gains
//! - No balance ever drops below zero
//! - Transaction ids are strictly increasing with no gaps
//! - A failed or timed-out operation leaves no trace
//! - At most one registration fee per account, ever

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::LedgerConfig;
pub use core::{LedgerServices, LedgerStore, RegistrationFeeSaga, SequenceGenerator, TransferEngine};
pub use io::{write_balances_csv, write_journal_csv};
pub use types::{
    Account, AccountId, FeeOutcome, LedgerError, LedgerOp, Role, Transaction, TransactionId,
    TransactionType, TransferRequest,
};
