//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account identifiers, roles and registration records
//! - `transaction`: Transaction records, requests and filters
//! - `fee`: Registration fee records and schedule
//! - `operation`: Replayable ledger operations and their outcomes
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod fee;
pub mod operation;
pub mod transaction;

pub use account::{Account, AccountBalance, AccountId, Registration, RegistrationChannel, Role};
pub use error::LedgerError;
pub use fee::{Fee, FeeOutcome, FeeSchedule};
pub use operation::{LedgerOp, OpOutcome};
pub use transaction::{
    PaymentMethod, Transaction, TransactionAmendment, TransactionFilter, TransactionId,
    TransactionStatus, TransactionType, TransferMode, TransferRequest,
};
