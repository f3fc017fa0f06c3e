//! Core ledger module
//!
//! This module contains the components that move money:
//! - `status` - Shared store availability switch
//! - `sequence` - Named gapless counters and external id formatting
//! - `ledger_store` - Balances and append-only ledger records
//! - `unit_of_work` - Multi-record atomic units over locked accounts
//! - `traits` - Collaborator interfaces (account directory, cap source)
//! - `directory` - In-memory collaborators
//! - `limit_policy` - Role-pair transfer caps
//! - `engine` - Transfer orchestration and read-side queries
//! - `fee_saga` - One-time registration fee deduction
//! - `services` - Component wiring and operation dispatch
//! - `batch_processor` - Concurrent replay of operation batches

pub mod batch_processor;
pub mod directory;
pub mod engine;
pub mod fee_saga;
pub mod ledger_store;
pub mod limit_policy;
pub mod sequence;
pub mod services;
pub mod status;
pub mod traits;
pub mod unit_of_work;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use directory::{CapTable, InMemoryDirectory};
pub use engine::{validate_amount, TransferEngine};
pub use fee_saga::RegistrationFeeSaga;
pub use ledger_store::LedgerStore;
pub use limit_policy::{LimitDecision, LimitPolicy};
pub use sequence::{format_external_id, SequenceGenerator, TRANSACTION_SEQUENCE};
pub use services::LedgerServices;
pub use status::StoreStatus;
pub use traits::{AccountDirectory, TransferCapSource};
pub use unit_of_work::{CommitReceipt, TransactionDraft, UnitOfWork};
