//! Collaborator interfaces consumed by the ledger core
//!
//! Account/role resolution and limit configuration live outside the ledger.
//! The engine only sees them through these traits, so an in-memory table,
//! a database or a remote service can stand behind them interchangeably.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Account, AccountId, LedgerError, Role};

/// Resolves account identities and roles
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account
    ///
    /// # Returns
    ///
    /// * `Ok(Some(account))` - The account and its role
    /// * `Ok(None)` - No such account
    /// * `Err(_)` - The directory could not be queried
    async fn resolve_account(&self, id: &AccountId) -> Result<Option<Account>, LedgerError>;

    /// All accounts holding `role`, used by role-scoped reporting
    async fn accounts_with_role(&self, role: Role) -> Result<Vec<AccountId>, LedgerError>;
}

/// Source of per-transaction caps keyed by (sender role, receiver role)
#[async_trait]
pub trait TransferCapSource: Send + Sync {
    /// The cap of a role pair, or `None` when the pair is uncapped
    async fn transfer_cap(
        &self,
        sender_role: Role,
        receiver_role: Role,
    ) -> Result<Option<Decimal>, LedgerError>;
}
