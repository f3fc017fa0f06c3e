//! Error types for the campus wallet ledger
//!
//! This module defines all error types that can occur while moving money
//! through the ledger and while replaying operation files.
//!
//! # Error Categories
//!
//! - **Validation and policy errors**: invalid amount, unknown account,
//!   insufficient balance, limit exceeded. Always detected before any
//!   mutation; never worth retrying unchanged.
//! - **Infrastructure errors**: store unavailable, deadline exceeded. The
//!   whole atomic unit is aborted; see [`LedgerError::is_retryable`].
//! - **Replay errors**: file I/O, CSV parsing and configuration problems.

use super::account::{AccountId, Role};
use super::transaction::{TransactionId, TransactionType};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger
///
/// Each variant carries the context a caller needs to explain the failure,
/// e.g. the configured cap for `LimitExceeded`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is not positive or has more than two fractional digits
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: String,
        /// Why it was rejected
        reason: String,
    },

    /// Account could not be resolved by the directory
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// Account has no registration record
    #[error("Registration for account {account} not found")]
    RegistrationNotFound { account: AccountId },

    /// Transaction record does not exist
    #[error("Transaction {transaction} not found")]
    TransactionNotFound { transaction: TransactionId },

    /// Debit would drive the balance below zero
    #[error(
        "Insufficient balance for account {account}: available {available}, requested {requested}"
    )]
    InsufficientBalance {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    /// Credit would overflow the balance representation
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// Named counter reached its maximum value
    #[error("Sequence '{sequence}' is exhausted")]
    SequenceExhausted { sequence: String },

    /// Amount exceeds the per-transaction cap of the role pair
    #[error("Transfer of {requested} from {sender_role} to {receiver_role} exceeds the limit of {cap}")]
    LimitExceeded {
        sender_role: Role,
        receiver_role: Role,
        /// The configured per-transaction cap
        cap: Decimal,
        requested: Decimal,
    },

    /// The backing store rejected the call; nothing was committed
    #[error("Store unavailable during {operation}")]
    StoreUnavailable { operation: String },

    /// The operation's deadline expired before commit; nothing was committed
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: String },

    /// Idempotency token was already used by a committed transfer
    #[error("Duplicate request '{key}', already committed as {transaction}")]
    DuplicateRequest {
        key: String,
        transaction: TransactionId,
    },

    /// Sender and receiver are the same account
    #[error("Account {account} cannot transfer to itself")]
    SelfTransfer { account: AccountId },

    /// Transaction type is written by a dedicated flow only
    #[error("Transaction type '{tx_type}' cannot be used for transfers")]
    ReservedTransactionType { tx_type: TransactionType },

    /// Editor's role may not amend transaction records
    #[error("Account {editor} with role {role} is not allowed to amend transactions")]
    Unauthorized { editor: AccountId, role: Role },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        message: String,
    },

    /// Configuration file could not be loaded
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        LedgerError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for LedgerError {
    fn from(error: serde_yaml::Error) -> Self {
        LedgerError::ConfigError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn invalid_amount(amount: Decimal, reason: &str) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn account_not_found(account: &AccountId) -> Self {
        LedgerError::AccountNotFound {
            account: account.clone(),
        }
    }

    pub fn registration_not_found(account: &AccountId) -> Self {
        LedgerError::RegistrationNotFound {
            account: account.clone(),
        }
    }

    pub fn insufficient_balance(account: &AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.clone(),
            available,
            requested,
        }
    }

    pub fn limit_exceeded(
        sender_role: Role,
        receiver_role: Role,
        cap: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::LimitExceeded {
            sender_role,
            receiver_role,
            cap,
            requested,
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: &AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.clone(),
        }
    }

    pub fn sequence_exhausted(sequence: &str) -> Self {
        LedgerError::SequenceExhausted {
            sequence: sequence.to_string(),
        }
    }

    pub fn store_unavailable(operation: &str) -> Self {
        LedgerError::StoreUnavailable {
            operation: operation.to_string(),
        }
    }

    pub fn deadline_exceeded(operation: &str) -> Self {
        LedgerError::DeadlineExceeded {
            operation: operation.to_string(),
        }
    }

    /// Whether the failure was transient infrastructure trouble
    ///
    /// Retrying a plain transfer is only safe when the caller knows it did
    /// not commit, or when it carries an idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreUnavailable { .. } | LedgerError::DeadlineExceeded { .. }
        )
    }
}
