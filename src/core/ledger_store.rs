//! Authoritative store of balances and ledger records
//!
//! This module provides the `LedgerStore`: one balance per account plus the
//! append-only collections (transactions, fees), registration records and
//! idempotency keys that the transfer engine and fee saga write.
//!
//! # Design
//!
//! Balances live in per-account cells (`Arc<tokio::sync::Mutex<_>>`) indexed
//! by a `DashMap`. A cell holding `None` means the account has no balance
//! record yet; reads report it as zero.
//!
//! - `adjust` locks a single cell and applies the delta in place. Negative
//!   deltas are conditional: they fail unless `balance >= |delta|`, so two
//!   concurrent debits can never overdraw an account.
//! - Multi-record writes go through [`UnitOfWork`](super::unit_of_work::UnitOfWork),
//!   which locks every involved cell in account order, stages all changes and
//!   applies them in one synchronous commit.
//!
//! Readers lock the same cells, so they only ever observe committed balances.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;

use super::status::StoreStatus;
use super::unit_of_work::UnitOfWork;
use crate::types::{
    AccountId, Fee, LedgerError, Registration, RegistrationChannel, Transaction, TransactionId,
};

/// Balance cell of one account; `None` until the first credit
pub(super) type BalanceCell = Arc<Mutex<Option<Decimal>>>;

/// Thread-safe ledger store
#[derive(Debug)]
pub struct LedgerStore {
    pub(super) balances: DashMap<AccountId, BalanceCell>,
    pub(super) transactions: DashMap<TransactionId, Transaction>,

    /// At most one fee per account; the key doubles as the fee saga's
    /// uniqueness guard
    pub(super) fees: DashMap<AccountId, Fee>,

    pub(super) registrations: DashMap<AccountId, Registration>,

    /// Idempotency token → transaction that consumed it
    pub(super) idempotency_keys: DashMap<String, TransactionId>,

    pub(super) status: Arc<StoreStatus>,
}

impl LedgerStore {
    pub fn new(status: Arc<StoreStatus>) -> Self {
        Self {
            balances: DashMap::new(),
            transactions: DashMap::new(),
            fees: DashMap::new(),
            registrations: DashMap::new(),
            idempotency_keys: DashMap::new(),
            status,
        }
    }

    pub fn status(&self) -> &Arc<StoreStatus> {
        &self.status
    }

    /// Get the balance cell of an account, creating an empty one if needed
    ///
    /// The `DashMap` guard is released before the cell is locked so that
    /// waiting on a busy account never blocks a whole shard.
    pub(super) fn cell(&self, account: &AccountId) -> BalanceCell {
        if let Some(cell) = self.balances.get(account) {
            return Arc::clone(cell.value());
        }
        Arc::clone(
            self.balances
                .entry(account.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        )
    }

    /// Atomically apply `delta` to an account's balance
    ///
    /// # Returns
    ///
    /// * `Ok(new_balance)` - The balance after the adjustment
    /// * `Err(LedgerError::InsufficientBalance)` - A debit larger than the balance; nothing changed
    /// * `Err(LedgerError::ArithmeticOverflow)` - The credit does not fit; nothing changed
    /// * `Err(LedgerError::StoreUnavailable)` - The store is offline
    pub async fn adjust(&self, account: &AccountId, delta: Decimal) -> Result<Decimal, LedgerError> {
        self.status.ensure_online("balance adjustment")?;

        let cell = self.cell(account);
        let mut balance = cell.lock().await;
        let current = balance.unwrap_or(Decimal::ZERO);

        if delta.is_sign_negative() && !delta.is_zero() {
            let requested = -delta;
            if current < requested {
                return Err(LedgerError::insufficient_balance(account, current, requested));
            }
        }

        let updated = current
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("adjust", account))?;

        // Zero-delta adjustments on unknown accounts must not create a record
        if balance.is_some() || delta > Decimal::ZERO {
            *balance = Some(updated);
        }

        debug!(account = %account, delta = %delta, balance = %updated, "balance adjusted");
        Ok(updated)
    }

    /// Read an account's committed balance; zero when it has no record
    pub async fn read(&self, account: &AccountId) -> Result<Decimal, LedgerError> {
        self.status.ensure_online("balance read")?;

        let cell = match self.balances.get(account) {
            Some(cell) => Arc::clone(cell.value()),
            None => return Ok(Decimal::ZERO),
        };
        let balance = cell.lock().await;
        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    /// Snapshot of every account that has a balance record
    pub async fn balances(&self) -> Result<Vec<(AccountId, Decimal)>, LedgerError> {
        self.status.ensure_online("balance listing")?;

        let cells: Vec<(AccountId, BalanceCell)> = self
            .balances
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut snapshot = Vec::with_capacity(cells.len());
        for (account, cell) in cells {
            if let Some(balance) = *cell.lock().await {
                snapshot.push((account, balance));
            }
        }
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(snapshot)
    }

    /// Lock the given accounts and start a multi-record atomic unit
    ///
    /// Cells are locked in ascending account order; duplicates are ignored.
    /// This is the last suspension point of any write path: everything after
    /// it up to `commit` runs synchronously.
    pub async fn begin(&self, accounts: &[&AccountId]) -> Result<UnitOfWork<'_>, LedgerError> {
        self.status.ensure_online("begin unit of work")?;

        let mut ordered: Vec<&AccountId> = accounts.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for account in ordered {
            let guard = self.cell(account).lock_owned().await;
            guards.push((account.clone(), guard));
        }

        Ok(UnitOfWork::new(self, guards))
    }

    /// Create the registration record of an account
    ///
    /// Registering twice returns the existing record unchanged.
    pub fn register(
        &self,
        account: &AccountId,
        channel: RegistrationChannel,
    ) -> Result<Registration, LedgerError> {
        self.status.ensure_online("registration")?;

        let registration = self
            .registrations
            .entry(account.clone())
            .or_insert_with(|| Registration::new(account.clone(), channel))
            .value()
            .clone();
        Ok(registration)
    }

    pub fn registration(&self, account: &AccountId) -> Result<Option<Registration>, LedgerError> {
        self.status.ensure_online("registration lookup")?;
        Ok(self.registrations.get(account).map(|r| r.value().clone()))
    }

    pub fn fee(&self, account: &AccountId) -> Result<Option<Fee>, LedgerError> {
        self.status.ensure_online("fee lookup")?;
        Ok(self.fees.get(account).map(|fee| fee.value().clone()))
    }

    pub fn fee_count(&self) -> usize {
        self.fees.len()
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        self.status.ensure_online("transaction lookup")?;
        Ok(self.transactions.get(&id).map(|tx| tx.value().clone()))
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Committed transactions accepted by `predicate`, ordered by id
    pub fn transactions_matching<F>(&self, predicate: F) -> Result<Vec<Transaction>, LedgerError>
    where
        F: Fn(&Transaction) -> bool,
    {
        self.status.ensure_online("transaction listing")?;

        let mut matching: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|tx| tx.transaction_id);
        Ok(matching)
    }

    /// Update the descriptive fields of a committed transaction
    ///
    /// The closure runs while the record's entry is locked and must not
    /// touch amount, parties, type or status.
    pub fn amend_transaction<F>(
        &self,
        id: TransactionId,
        editor: &AccountId,
        f: F,
    ) -> Result<Transaction, LedgerError>
    where
        F: FnOnce(&mut Transaction),
    {
        self.status.ensure_online("transaction amendment")?;

        let mut entry = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound { transaction: id })?;
        let tx = entry.value_mut();
        f(tx);
        tx.edited_at = Some(Utc::now());
        tx.edited_by_id = Some(editor.clone());
        Ok(tx.clone())
    }

    /// Transaction that consumed an idempotency token, if any
    pub fn transaction_for_key(&self, key: &str) -> Result<Option<TransactionId>, LedgerError> {
        self.status.ensure_online("idempotency lookup")?;
        Ok(self.idempotency_keys.get(key).map(|id| *id.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> LedgerStore {
        LedgerStore::new(Arc::new(StoreStatus::new()))
    }

    fn id(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[tokio::test]
    async fn test_read_unknown_account_is_zero() {
        let store = store();
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), Decimal::ZERO);
        assert!(store.balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_credit_creates_record() {
        let store = store();

        let balance = store.adjust(&id("CUS00001"), dec!(25.00)).await.unwrap();

        assert_eq!(balance, dec!(25.00));
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), dec!(25.00));
        assert_eq!(
            store.balances().await.unwrap(),
            vec![(id("CUS00001"), dec!(25.00))]
        );
    }

    #[tokio::test]
    async fn test_debit_is_conditional() {
        let store = store();
        store.adjust(&id("CUS00001"), dec!(10.00)).await.unwrap();

        let result = store.adjust(&id("CUS00001"), dec!(-10.01)).await;
        assert_eq!(
            result.unwrap_err(),
            LedgerError::insufficient_balance(&id("CUS00001"), dec!(10.00), dec!(10.01))
        );
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), dec!(10.00));

        let balance = store.adjust(&id("CUS00001"), dec!(-10.00)).await.unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_debit_of_unknown_account_creates_nothing() {
        let store = store();

        let result = store.adjust(&id("CUS00001"), dec!(-1.00)).await;

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert!(store.balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_adjustment_creates_nothing() {
        let store = store();
        assert_eq!(store.adjust(&id("CUS00001"), Decimal::ZERO).await.unwrap(), Decimal::ZERO);
        assert!(store.balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overflow_is_rejected() {
        let store = store();
        store.adjust(&id("CUS00001"), Decimal::MAX).await.unwrap();

        let result = store.adjust(&id("CUS00001"), dec!(1)).await;

        assert!(matches!(result, Err(LedgerError::ArithmeticOverflow { .. })));
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), Decimal::MAX);
    }

    #[tokio::test]
    async fn test_offline_store_rejects_everything() {
        let store = store();
        store.adjust(&id("CUS00001"), dec!(5)).await.unwrap();
        store.status().set_online(false);

        assert!(matches!(
            store.adjust(&id("CUS00001"), dec!(5)).await,
            Err(LedgerError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            store.read(&id("CUS00001")).await,
            Err(LedgerError::StoreUnavailable { .. })
        ));
        assert!(store.begin(&[&id("CUS00001")]).await.is_err());

        store.status().set_online(true);
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), dec!(5));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let store = store();

        let first = store.register(&id("CUS00001"), RegistrationChannel::Offline).unwrap();
        let second = store.register(&id("CUS00001"), RegistrationChannel::Online).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.channel, RegistrationChannel::Offline);
        assert!(store.registration(&id("CUS00002")).unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_credits_lose_no_updates() {
        let store = Arc::new(store());
        let mut tasks = vec![];

        for _ in 0..200 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.adjust(&id("RES00001"), dec!(0.25)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.read(&id("RES00001")).await.unwrap(), dec!(50.00));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_overdraw() {
        let store = Arc::new(store());
        store.adjust(&id("CUS00001"), dec!(10.00)).await.unwrap();

        let mut tasks = vec![];
        for _ in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.adjust(&id("CUS00001"), dec!(-1.00)).await.is_ok()
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(store.read(&id("CUS00001")).await.unwrap(), Decimal::ZERO);
    }
}
