//! Transfer orchestration
//!
//! This module provides the `TransferEngine`, which moves money between two
//! accounts and serves the read-side operations (balances, transaction
//! listing) plus descriptive amendments of committed records.
//!
//! # Transfer pipeline
//!
//! 1. Validate the amount (positive, at most two decimal places), reject
//!    self-transfers and the reserved `RegistrationFee` type.
//! 2. Resolve sender and receiver through the [`AccountDirectory`].
//! 3. Read the sender's balance; fail early when it cannot cover the amount.
//! 4. Consult the [`LimitPolicy`] for the resolved role pair.
//! 5. Open a [`UnitOfWork`](super::unit_of_work::UnitOfWork) over both
//!    accounts, stage the conditional debit and the credit, and commit them
//!    together with the Transaction record.
//!
//! Steps 1 to 4 never mutate anything. Step 5 is all-or-nothing.
//!
//! # Deadlines
//!
//! Every write runs under a deadline (`transfer_with_deadline`, or the
//! configured default through `transfer`). The commit itself has no await
//! point, so expiry can only ever abort a transfer before it commits.
//!
//! # Thread Safety
//!
//! The engine is cheap to clone; all clones share the same store, sequence
//! generator and collaborators.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::ledger_store::LedgerStore;
use super::limit_policy::{LimitDecision, LimitPolicy};
use super::sequence::SequenceGenerator;
use super::traits::AccountDirectory;
use super::unit_of_work::TransactionDraft;
use crate::types::{
    Account, AccountId, LedgerError, Transaction, TransactionAmendment, TransactionFilter,
    TransactionId, TransactionType, TransferRequest,
};

/// Number of fractional digits an amount may carry
pub const AMOUNT_SCALE: u32 = 2;

/// Default deadline of write operations
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Check that `amount` is a positive amount with at most two decimal places
///
/// Trailing zeros do not count: `1.500` is accepted as `1.5`.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, "amount must be positive"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::invalid_amount(
            amount,
            "amount must have at most two decimal places",
        ));
    }
    Ok(())
}

/// Transfer orchestrator
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<LedgerStore>,
    sequences: Arc<SequenceGenerator>,
    directory: Arc<dyn AccountDirectory>,
    limits: LimitPolicy,

    /// Deadline applied by `transfer`
    timeout: Duration,
}

impl TransferEngine {
    /// Create a new TransferEngine
    ///
    /// # Arguments
    ///
    /// * `store` - Shared ledger store
    /// * `sequences` - Shared sequence generator (transaction ids)
    /// * `directory` - Account/role resolution
    /// * `limits` - Role-pair limit policy
    pub fn new(
        store: Arc<LedgerStore>,
        sequences: Arc<SequenceGenerator>,
        directory: Arc<dyn AccountDirectory>,
        limits: LimitPolicy,
    ) -> Self {
        Self {
            store,
            sequences,
            directory,
            limits,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// Move money from one account to another under the default deadline
    ///
    /// See [`TransferEngine::transfer_with_deadline`].
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction, LedgerError> {
        self.transfer_with_deadline(request, Instant::now() + self.timeout)
            .await
    }

    /// Move money from one account to another
    ///
    /// # Arguments
    ///
    /// * `request` - Parties, amount, type, method, remarks, mode and optional idempotency key
    /// * `deadline` - Instant after which the transfer is abandoned uncommitted
    ///
    /// # Returns
    ///
    /// * `Ok(transaction)` - The committed record, `status = Success`
    /// * `Err(LedgerError::InvalidAmount)` - Amount not positive or too precise
    /// * `Err(LedgerError::SelfTransfer)` - Sender and receiver are the same account
    /// * `Err(LedgerError::ReservedTransactionType)` - `RegistrationFee` requested
    /// * `Err(LedgerError::AccountNotFound)` - Sender or receiver unknown
    /// * `Err(LedgerError::InsufficientBalance)` - Sender cannot cover the amount
    /// * `Err(LedgerError::LimitExceeded)` - Amount above the role pair's cap in normal mode
    /// * `Err(LedgerError::DuplicateRequest)` - Idempotency key already consumed
    /// * `Err(LedgerError::StoreUnavailable)` - Store offline; nothing committed
    /// * `Err(LedgerError::DeadlineExceeded)` - Deadline hit before commit; nothing committed
    pub async fn transfer_with_deadline(
        &self,
        request: TransferRequest,
        deadline: Instant,
    ) -> Result<Transaction, LedgerError> {
        let result = if Instant::now() >= deadline {
            Err(LedgerError::deadline_exceeded("transfer"))
        } else {
            timeout_at(deadline, self.execute_transfer(&request))
                .await
                .unwrap_or_else(|_| Err(LedgerError::deadline_exceeded("transfer")))
        };

        match &result {
            Ok(tx) => info!(
                transaction = %tx.transaction_id,
                sender = %tx.sender_id,
                receiver = %tx.receiver_id,
                amount = %tx.amount,
                tx_type = %tx.tx_type,
                "transfer committed"
            ),
            Err(error) => warn!(
                sender = %request.sender_id,
                receiver = %request.receiver_id,
                amount = %request.amount,
                error = %error,
                "transfer rejected"
            ),
        }

        result
    }

    async fn execute_transfer(&self, request: &TransferRequest) -> Result<Transaction, LedgerError> {
        validate_amount(request.amount)?;

        if request.sender_id == request.receiver_id {
            return Err(LedgerError::SelfTransfer {
                account: request.sender_id.clone(),
            });
        }

        if request.tx_type == TransactionType::RegistrationFee {
            return Err(LedgerError::ReservedTransactionType {
                tx_type: request.tx_type,
            });
        }

        if let Some(key) = &request.idempotency_key {
            if let Some(transaction) = self.store.transaction_for_key(key)? {
                return Err(LedgerError::DuplicateRequest {
                    key: key.clone(),
                    transaction,
                });
            }
        }

        let sender = self.resolve(&request.sender_id).await?;
        let receiver = self.resolve(&request.receiver_id).await?;

        let available = self.store.read(&sender.account_id).await?;
        if available < request.amount {
            return Err(LedgerError::insufficient_balance(
                &sender.account_id,
                available,
                request.amount,
            ));
        }

        let decision = self
            .limits
            .check(sender.role, receiver.role, request.amount, request.mode)
            .await?;
        if let LimitDecision::Reject { cap, .. } = decision {
            return Err(LedgerError::limit_exceeded(
                sender.role,
                receiver.role,
                cap,
                request.amount,
            ));
        }

        let mut unit = self
            .store
            .begin(&[&sender.account_id, &receiver.account_id])
            .await?;

        // The balance may have moved since the early read; the staged debit
        // re-checks it under the lock.
        unit.debit(&sender.account_id, request.amount)?;
        unit.credit(&receiver.account_id, request.amount)?;

        let receipt = unit.commit(TransactionDraft::from(request), &self.sequences)?;
        Ok(receipt.transaction)
    }

    async fn resolve(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.directory
            .resolve_account(id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Committed balance of an account; zero when it has none
    pub async fn get_balance(&self, account: &AccountId) -> Result<Decimal, LedgerError> {
        self.store.read(account).await
    }

    /// Committed transactions matching `filter`, ordered by id
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let members: Option<HashSet<AccountId>> = match filter.role {
            Some(role) => Some(
                self.directory
                    .accounts_with_role(role)
                    .await?
                    .into_iter()
                    .collect(),
            ),
            None => None,
        };

        self.store
            .transactions_matching(|tx| filter.matches(tx, members.as_ref()))
    }

    /// Change descriptive fields of a committed transaction
    ///
    /// # Arguments
    ///
    /// * `id` - Transaction to amend
    /// * `editor` - Account performing the edit; must be Admin or TreasuryMaster
    /// * `amendment` - Fields to overwrite; unset fields keep their value
    ///
    /// # Returns
    ///
    /// * `Ok(transaction)` - The amended record with `edited_at`/`edited_by_id` set
    /// * `Err(LedgerError::AccountNotFound)` - Editor unknown
    /// * `Err(LedgerError::Unauthorized)` - Editor's role may not amend
    /// * `Err(LedgerError::TransactionNotFound)` - No such transaction
    pub async fn amend_transaction(
        &self,
        id: TransactionId,
        editor: &AccountId,
        amendment: TransactionAmendment,
    ) -> Result<Transaction, LedgerError> {
        let editor = self.resolve(editor).await?;
        if !editor.role.can_amend_transactions() {
            return Err(LedgerError::Unauthorized {
                editor: editor.account_id,
                role: editor.role,
            });
        }

        if amendment.is_empty() {
            return self
                .store
                .transaction(id)?
                .ok_or(LedgerError::TransactionNotFound { transaction: id });
        }

        let amended = self.store.amend_transaction(id, &editor.account_id, |tx| {
            if let Some(remarks) = amendment.remarks {
                tx.remarks = remarks;
            }
            if let Some(payment_method) = amendment.payment_method {
                tx.payment_method = payment_method;
            }
            if let Some(location_id) = amendment.location_id {
                tx.location_id = Some(location_id);
            }
        })?;

        info!(transaction = %id, editor = %editor.account_id, "transaction amended");
        Ok(amended)
    }
}
