//! Wiring of the ledger components
//!
//! `LedgerServices` builds one shared store, sequence generator, directory
//! and cap table from a [`LedgerConfig`] and hands out the transfer engine
//! and fee saga on top of them. It also applies replayed [`LedgerOp`]s.
//!
//! ```text
//! LedgerServices
//!     ├── Arc<StoreStatus>        (shared online switch)
//!     ├── Arc<LedgerStore>        (balances + records)
//!     ├── Arc<SequenceGenerator>  (transaction and member ids)
//!     ├── Arc<InMemoryDirectory>  (accounts and roles)
//!     ├── Arc<CapTable>           (role-pair caps)
//!     ├── TransferEngine
//!     └── RegistrationFeeSaga
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::directory::{CapTable, InMemoryDirectory};
use super::engine::{validate_amount, TransferEngine};
use super::fee_saga::RegistrationFeeSaga;
use super::ledger_store::LedgerStore;
use super::limit_policy::LimitPolicy;
use super::sequence::SequenceGenerator;
use super::status::StoreStatus;
use crate::config::LedgerConfig;
use crate::types::{
    Account, AccountBalance, AccountId, LedgerError, LedgerOp, OpOutcome, RegistrationChannel,
    Role, Transaction, TransactionFilter,
};

#[derive(Clone)]
pub struct LedgerServices {
    status: Arc<StoreStatus>,
    store: Arc<LedgerStore>,
    sequences: Arc<SequenceGenerator>,
    directory: Arc<InMemoryDirectory>,
    caps: Arc<CapTable>,
    engine: TransferEngine,
    fee_saga: RegistrationFeeSaga,
    member_id_width: usize,
}

impl LedgerServices {
    pub fn from_config(config: &LedgerConfig) -> Self {
        let status = Arc::new(StoreStatus::new());
        let store = Arc::new(LedgerStore::new(Arc::clone(&status)));
        let sequences = Arc::new(SequenceGenerator::new(Arc::clone(&status)));
        let directory = Arc::new(InMemoryDirectory::new());
        let caps = Arc::new(config.cap_table());

        let engine = TransferEngine::new(
            Arc::clone(&store),
            Arc::clone(&sequences),
            directory.clone(),
            LimitPolicy::new(caps.clone()),
        )
        .with_timeout(config.operation_timeout());

        let fee_saga = RegistrationFeeSaga::new(
            Arc::clone(&store),
            Arc::clone(&sequences),
            directory.clone(),
            config.fees,
        )
        .with_timeout(config.operation_timeout());

        Self {
            status,
            store,
            sequences,
            directory,
            caps,
            engine,
            fee_saga,
            member_id_width: config.member_ids.width,
        }
    }

    pub fn status(&self) -> &Arc<StoreStatus> {
        &self.status
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn sequences(&self) -> &Arc<SequenceGenerator> {
        &self.sequences
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub fn caps(&self) -> &Arc<CapTable> {
        &self.caps
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn fee_saga(&self) -> &RegistrationFeeSaga {
        &self.fee_saga
    }

    /// Apply one replayed operation
    pub async fn execute(&self, op: LedgerOp) -> Result<OpOutcome, LedgerError> {
        match op {
            LedgerOp::Open {
                account,
                role,
                channel,
            } => self.open_account(account, role, channel).map(OpOutcome::Opened),
            LedgerOp::Fund { account, amount } => {
                let balance = self.fund(&account, amount).await?;
                Ok(OpOutcome::Funded { account, balance })
            }
            LedgerOp::Transfer(request) => self
                .engine
                .transfer(request)
                .await
                .map(OpOutcome::Transferred),
            LedgerOp::Fee {
                account,
                counterpart,
            } => self
                .fee_saga
                .deduct_registration_fee(&account, &counterpart)
                .await
                .map(OpOutcome::Fee),
        }
    }

    /// Add an account under a known id
    ///
    /// Re-opening an existing account updates its role. A registration
    /// record is created on the first open that names a channel.
    pub fn open_account(
        &self,
        account: AccountId,
        role: Role,
        channel: Option<RegistrationChannel>,
    ) -> Result<Account, LedgerError> {
        let opened = Account::new(account, role);
        if let Some(channel) = channel {
            self.store.register(&opened.account_id, channel)?;
        }
        self.directory.insert(opened.clone());

        info!(account = %opened.account_id, role = %role, "account opened");
        Ok(opened)
    }

    /// Add an account under the next member id of its role
    pub fn enroll(
        &self,
        role: Role,
        channel: Option<RegistrationChannel>,
    ) -> Result<Account, LedgerError> {
        let account = self
            .directory
            .enroll(role, &self.sequences, self.member_id_width)?;
        if let Some(channel) = channel {
            self.store.register(&account.account_id, channel)?;
        }
        Ok(account)
    }

    /// Credit an opening balance to an existing account
    pub async fn fund(&self, account: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        validate_amount(amount)?;
        if self.directory.get(account).is_none() {
            return Err(LedgerError::account_not_found(account));
        }

        let balance = self.store.adjust(account, amount).await?;
        info!(account = %account, amount = %amount, balance = %balance, "account funded");
        Ok(balance)
    }

    /// Balance of every known account, ordered by id
    pub async fn balances(&self) -> Result<Vec<AccountBalance>, LedgerError> {
        let mut balances = Vec::with_capacity(self.directory.len());
        for account in self.directory.all() {
            let balance = self.store.read(&account.account_id).await?;
            balances.push(AccountBalance {
                account_id: account.account_id,
                role: account.role,
                balance,
            });
        }
        Ok(balances)
    }

    /// Every committed transaction, ordered by id
    pub async fn journal(&self) -> Result<Vec<Transaction>, LedgerError> {
        self.engine
            .list_transactions(&TransactionFilter::default())
            .await
    }
}

impl Default for LedgerServices {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}
