//! In-memory collaborators
//!
//! `InMemoryDirectory` stands in for the account/role service and mints
//! member IDs; `CapTable` stands in for the limit configuration. Both are
//! `DashMap`-backed and safe to share across tasks.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::info;

use super::sequence::{format_external_id, member_sequence_name, SequenceGenerator};
use super::traits::{AccountDirectory, TransferCapSource};
use crate::types::{Account, AccountId, LedgerError, Role};

/// Account/role table
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account, returning the previous entry
    pub fn insert(&self, account: Account) -> Option<Account> {
        self.accounts.insert(account.account_id.clone(), account)
    }

    pub fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).map(|account| account.value().clone())
    }

    /// Every known account, ordered by id
    pub fn all(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Create a new account with the next member ID of its role
    ///
    /// # Arguments
    ///
    /// * `role` - Role of the new account; selects counter and prefix
    /// * `sequences` - Generator holding the `member_id.<role>` counters
    /// * `width` - Zero-padding of the numeric part
    ///
    /// # Returns
    ///
    /// * `Ok(account)` - e.g. `CUS00001` for the first customer at width 5
    /// * `Err(LedgerError::StoreUnavailable)` - No ID could be allocated
    pub fn enroll(
        &self,
        role: Role,
        sequences: &SequenceGenerator,
        width: usize,
    ) -> Result<Account, LedgerError> {
        let seq = sequences.next(&member_sequence_name(role))?;
        let id = format_external_id(role.member_prefix(), seq, width);
        let account = Account::new(id, role);

        self.insert(account.clone());
        info!(account = %account.account_id, role = %role, "account enrolled");
        Ok(account)
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn resolve_account(&self, id: &AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.get(id))
    }

    async fn accounts_with_role(&self, role: Role) -> Result<Vec<AccountId>, LedgerError> {
        let mut members: Vec<AccountId> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().role == role)
            .map(|entry| entry.key().clone())
            .collect();
        members.sort();
        Ok(members)
    }
}

/// Per-transaction caps keyed by role pair
///
/// Pairs without an entry are uncapped.
#[derive(Debug, Default)]
pub struct CapTable {
    caps: DashMap<(Role, Role), Decimal>,
}

impl CapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caps(caps: impl IntoIterator<Item = ((Role, Role), Decimal)>) -> Self {
        let table = Self::new();
        for ((sender, receiver), cap) in caps {
            table.set_cap(sender, receiver, cap);
        }
        table
    }

    pub fn set_cap(&self, sender_role: Role, receiver_role: Role, cap: Decimal) {
        self.caps.insert((sender_role, receiver_role), cap);
    }

    pub fn clear_cap(&self, sender_role: Role, receiver_role: Role) -> Option<Decimal> {
        self.caps
            .remove(&(sender_role, receiver_role))
            .map(|(_, cap)| cap)
    }

    pub fn cap(&self, sender_role: Role, receiver_role: Role) -> Option<Decimal> {
        self.caps
            .get(&(sender_role, receiver_role))
            .map(|cap| *cap.value())
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

#[async_trait]
impl TransferCapSource for CapTable {
    async fn transfer_cap(
        &self,
        sender_role: Role,
        receiver_role: Role,
    ) -> Result<Option<Decimal>, LedgerError> {
        Ok(self.cap(sender_role, receiver_role))
    }
}
