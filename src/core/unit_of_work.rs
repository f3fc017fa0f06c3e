//! Multi-record atomic units
//!
//! A `UnitOfWork` is opened by [`LedgerStore::begin`](super::LedgerStore::begin)
//! with the balance cells of every involved account locked. Callers stage
//! debits, credits, a fee record and a registration flag flip, then `commit`
//! a transaction draft. Either everything becomes visible or nothing does.
//!
//! # Commit order
//!
//! 1. Store availability is checked.
//! 2. Uniqueness claims (idempotency key, fee per account) take their
//!    `DashMap` entries; an occupied entry aborts the unit.
//! 3. The transaction id is allocated. This is the last fallible step, so
//!    an aborted unit never consumes a sequence value.
//! 4. Staged balances, the transaction, the fee and the flag are written.
//!
//! `commit` is synchronous: a cancelled or timed-out caller can only be
//! interrupted before it, never half-way through.
//!
//! Dropping a unit without committing discards every staged change.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::ledger_store::LedgerStore;
use super::sequence::{SequenceGenerator, TRANSACTION_SEQUENCE};
use crate::types::{
    AccountId, Fee, LedgerError, PaymentMethod, Registration, Transaction, TransactionId,
    TransactionStatus, TransactionType, TransferRequest,
};

/// Transaction record before its id and timestamp are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub payment_method: PaymentMethod,
    pub remarks: String,
    pub location_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl TransactionDraft {
    fn into_transaction(self, transaction_id: TransactionId, now: DateTime<Utc>) -> Transaction {
        Transaction {
            transaction_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            amount: self.amount,
            tx_type: self.tx_type,
            payment_method: self.payment_method,
            status: TransactionStatus::Success,
            remarks: self.remarks,
            location_id: self.location_id,
            idempotency_key: self.idempotency_key,
            created_at: now,
            edited_at: None,
            edited_by_id: None,
        }
    }
}

impl From<&TransferRequest> for TransactionDraft {
    fn from(request: &TransferRequest) -> Self {
        Self {
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
            amount: request.amount,
            tx_type: request.tx_type,
            payment_method: request.payment_method,
            remarks: request.remarks.clone(),
            location_id: request.location_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
        }
    }
}

/// What a successful commit wrote
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub transaction: Transaction,
    pub fee: Option<Fee>,
}

/// Staged changes over a set of locked accounts
pub struct UnitOfWork<'a> {
    store: &'a LedgerStore,

    /// Locked balance cells in ascending account order
    guards: Vec<(AccountId, OwnedMutexGuard<Option<Decimal>>)>,

    /// Balances after the staged debits and credits
    staged: BTreeMap<AccountId, Decimal>,

    fee: Option<(AccountId, Decimal)>,
    mark_paid: Option<AccountId>,
}

impl<'a> UnitOfWork<'a> {
    pub(super) fn new(
        store: &'a LedgerStore,
        guards: Vec<(AccountId, OwnedMutexGuard<Option<Decimal>>)>,
    ) -> Self {
        Self {
            store,
            guards,
            staged: BTreeMap::new(),
            fee: None,
            mark_paid: None,
        }
    }

    /// Balance of a locked account including staged changes
    ///
    /// Accounts outside the unit are reported as not found.
    pub fn balance(&self, account: &AccountId) -> Result<Decimal, LedgerError> {
        if let Some(staged) = self.staged.get(account) {
            return Ok(*staged);
        }
        self.guards
            .iter()
            .find(|(locked, _)| locked == account)
            .map(|(_, guard)| guard.unwrap_or(Decimal::ZERO))
            .ok_or_else(|| LedgerError::account_not_found(account))
    }

    /// Stage a conditional debit
    ///
    /// Fails with `InsufficientBalance` unless the balance covers `amount`.
    pub fn debit(&mut self, account: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let current = self.balance(account)?;
        if current < amount {
            return Err(LedgerError::insufficient_balance(account, current, amount));
        }
        let updated = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", account))?;
        self.staged.insert(account.clone(), updated);
        Ok(updated)
    }

    pub fn credit(&mut self, account: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let current = self.balance(account)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", account))?;
        self.staged.insert(account.clone(), updated);
        Ok(updated)
    }

    /// Whether a fee record already exists for a locked account
    pub fn has_fee(&self, account: &AccountId) -> bool {
        self.store.fees.contains_key(account)
    }

    /// Registration record as seen while the account is locked
    pub fn registration(&self, account: &AccountId) -> Option<Registration> {
        self.store
            .registrations
            .get(account)
            .map(|registration| registration.value().clone())
    }

    /// Stage the fee record of an account
    pub fn insert_fee(&mut self, account: &AccountId, amount: Decimal) {
        self.fee = Some((account.clone(), amount));
    }

    /// Stage `registration_fee_paid = true`
    pub fn mark_fee_paid(&mut self, account: &AccountId) -> Result<(), LedgerError> {
        if !self.store.registrations.contains_key(account) {
            return Err(LedgerError::registration_not_found(account));
        }
        self.mark_paid = Some(account.clone());
        Ok(())
    }

    /// Write every staged change plus the transaction record
    pub fn commit(
        mut self,
        draft: TransactionDraft,
        sequences: &SequenceGenerator,
    ) -> Result<CommitReceipt, LedgerError> {
        let store = self.store;
        store.status.ensure_online("commit")?;

        // Vacant entries stay locked until the end of the commit
        let key_slot = match &draft.idempotency_key {
            Some(key) => match store.idempotency_keys.entry(key.clone()) {
                Entry::Occupied(existing) => {
                    return Err(LedgerError::DuplicateRequest {
                        key: key.clone(),
                        transaction: *existing.get(),
                    })
                }
                Entry::Vacant(slot) => Some(slot),
            },
            None => None,
        };

        let fee_slot = match self.fee.take() {
            Some((account, amount)) => match store.fees.entry(account.clone()) {
                Entry::Occupied(existing) => {
                    return Err(LedgerError::DuplicateRequest {
                        key: format!("registration_fee:{}", account),
                        transaction: existing.get().transaction_id,
                    })
                }
                Entry::Vacant(slot) => Some((slot, account, amount)),
            },
            None => None,
        };

        let transaction_id = TransactionId::new(sequences.next(TRANSACTION_SEQUENCE)?);
        let now = Utc::now();

        for (account, guard) in self.guards.iter_mut() {
            if let Some(updated) = self.staged.get(account) {
                **guard = Some(*updated);
            }
        }

        let transaction = draft.into_transaction(transaction_id, now);
        store
            .transactions
            .insert(transaction_id, transaction.clone());

        if let Some(slot) = key_slot {
            slot.insert(transaction_id);
        }

        let fee = fee_slot.map(|(slot, account_id, amount)| {
            let fee = Fee {
                account_id,
                amount,
                transaction_id,
                created_at: now,
            };
            slot.insert(fee.clone());
            fee
        });

        if let Some(account) = self.mark_paid.take() {
            if let Some(mut registration) = store.registrations.get_mut(&account) {
                registration.fee_paid = true;
            }
        }

        debug!(transaction = %transaction_id, accounts = self.guards.len(), "unit of work committed");

        Ok(CommitReceipt { transaction, fee })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::StoreStatus;
    use crate::types::RegistrationChannel;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn setup() -> (Arc<StoreStatus>, LedgerStore, SequenceGenerator) {
        let status = Arc::new(StoreStatus::new());
        (
            Arc::clone(&status),
            LedgerStore::new(Arc::clone(&status)),
            SequenceGenerator::new(status),
        )
    }

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    fn draft(sender: &str, receiver: &str, amount: Decimal) -> TransactionDraft {
        TransactionDraft::from(&TransferRequest::new(sender, receiver, amount))
    }

    #[tokio::test]
    async fn test_commit_applies_everything() {
        let (_, store, sequences) = setup();
        store.adjust(&id("CUS00001"), dec!(100.00)).await.unwrap();

        let (sender, receiver) = (id("CUS00001"), id("RES00001"));
        let mut unit = store.begin(&[&sender, &receiver]).await.unwrap();
        unit.debit(&sender, dec!(40.00)).unwrap();
        unit.credit(&receiver, dec!(40.00)).unwrap();
        let receipt = unit
            .commit(draft("CUS00001", "RES00001", dec!(40.00)), &sequences)
            .unwrap();

        assert_eq!(receipt.transaction.transaction_id, TransactionId::new(1));
        assert_eq!(receipt.transaction.status, TransactionStatus::Success);
        assert!(receipt.fee.is_none());
        assert_eq!(store.read(&sender).await.unwrap(), dec!(60.00));
        assert_eq!(store.read(&receiver).await.unwrap(), dec!(40.00));
        assert_eq!(store.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_changes_nothing() {
        let (_, store, sequences) = setup();
        store.adjust(&id("CUS00001"), dec!(100.00)).await.unwrap();

        {
            let (sender, receiver) = (id("CUS00001"), id("RES00001"));
            let mut unit = store.begin(&[&sender, &receiver]).await.unwrap();
            unit.debit(&sender, dec!(40.00)).unwrap();
            unit.credit(&receiver, dec!(40.00)).unwrap();
        }

        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), dec!(100.00));
        assert_eq!(store.read(&id("RES00001")).await.unwrap(), Decimal::ZERO);
        assert_eq!(store.balances().await.unwrap().len(), 1);
        assert_eq!(sequences.current(TRANSACTION_SEQUENCE), 0);
    }

    #[tokio::test]
    async fn test_staged_debit_is_guarded() {
        let (_, store, _) = setup();
        store.adjust(&id("CUS00001"), dec!(50.00)).await.unwrap();

        let sender = id("CUS00001");
        let mut unit = store.begin(&[&sender]).await.unwrap();
        unit.debit(&sender, dec!(30.00)).unwrap();

        assert_eq!(
            unit.debit(&sender, dec!(30.00)).unwrap_err(),
            LedgerError::insufficient_balance(&sender, dec!(20.00), dec!(30.00))
        );
        assert_eq!(unit.balance(&sender).unwrap(), dec!(20.00));
    }

    #[tokio::test]
    async fn test_unlocked_account_is_rejected() {
        let (_, store, _) = setup();
        let sender = id("CUS00001");
        let mut unit = store.begin(&[&sender]).await.unwrap();

        assert!(matches!(
            unit.credit(&id("RES00001"), dec!(1.00)),
            Err(LedgerError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_offline_commit_leaves_no_trace() {
        let (status, store, sequences) = setup();
        store.adjust(&id("CUS00001"), dec!(100.00)).await.unwrap();

        let (sender, receiver) = (id("CUS00001"), id("RES00001"));
        let mut unit = store.begin(&[&sender, &receiver]).await.unwrap();
        unit.debit(&sender, dec!(40.00)).unwrap();
        unit.credit(&receiver, dec!(40.00)).unwrap();

        status.set_online(false);
        let result = unit.commit(draft("CUS00001", "RES00001", dec!(40.00)), &sequences);
        assert!(matches!(result, Err(LedgerError::StoreUnavailable { .. })));

        status.set_online(true);
        assert_eq!(store.read(&sender).await.unwrap(), dec!(100.00));
        assert_eq!(store.read(&receiver).await.unwrap(), Decimal::ZERO);
        assert_eq!(store.transaction_count(), 0);
        assert_eq!(sequences.current(TRANSACTION_SEQUENCE), 0);
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_is_rejected() {
        let (_, store, sequences) = setup();
        store.adjust(&id("CUS00001"), dec!(100.00)).await.unwrap();
        let (sender, receiver) = (id("CUS00001"), id("RES00001"));

        let mut first = draft("CUS00001", "RES00001", dec!(10.00));
        first.idempotency_key = Some("req-1".to_string());
        let mut unit = store.begin(&[&sender, &receiver]).await.unwrap();
        unit.debit(&sender, dec!(10.00)).unwrap();
        unit.credit(&receiver, dec!(10.00)).unwrap();
        let receipt = unit.commit(first.clone(), &sequences).unwrap();

        let mut unit = store.begin(&[&sender, &receiver]).await.unwrap();
        unit.debit(&sender, dec!(10.00)).unwrap();
        unit.credit(&receiver, dec!(10.00)).unwrap();
        let result = unit.commit(first, &sequences);

        assert_eq!(
            result.unwrap_err(),
            LedgerError::DuplicateRequest {
                key: "req-1".to_string(),
                transaction: receipt.transaction.transaction_id,
            }
        );
        assert_eq!(store.read(&sender).await.unwrap(), dec!(90.00));
        assert_eq!(sequences.current(TRANSACTION_SEQUENCE), 1);
    }

    #[tokio::test]
    async fn test_fee_commit_writes_fee_and_flag() {
        let (_, store, sequences) = setup();
        let customer = id("CUS00001");
        store.register(&customer, RegistrationChannel::Offline).unwrap();
        store.adjust(&customer, dec!(200.00)).await.unwrap();

        let mut unit = store.begin(&[&customer]).await.unwrap();
        assert!(!unit.has_fee(&customer));
        unit.debit(&customer, dec!(50.00)).unwrap();
        unit.insert_fee(&customer, dec!(50.00));
        unit.mark_fee_paid(&customer).unwrap();
        let mut fee_draft = draft("CUS00001", "ADM00001", dec!(50.00));
        fee_draft.tx_type = TransactionType::RegistrationFee;
        let receipt = unit.commit(fee_draft, &sequences).unwrap();

        let fee = receipt.fee.unwrap();
        assert_eq!(fee.amount, dec!(50.00));
        assert_eq!(fee.transaction_id, receipt.transaction.transaction_id);
        assert_eq!(store.fee(&customer).unwrap(), Some(fee));
        assert!(store.registration(&customer).unwrap().unwrap().fee_paid);
        assert_eq!(store.read(&customer).await.unwrap(), dec!(150.00));
    }

    #[tokio::test]
    async fn test_mark_fee_paid_requires_registration() {
        let (_, store, _) = setup();
        let customer = id("CUS00001");
        let mut unit = store.begin(&[&customer]).await.unwrap();

        assert_eq!(
            unit.mark_fee_paid(&customer).unwrap_err(),
            LedgerError::registration_not_found(&customer)
        );
    }
}
