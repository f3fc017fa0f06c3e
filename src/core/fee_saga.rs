//! One-time registration fee deduction
//!
//! `RegistrationFeeSaga` charges a newly registered customer the fee of its
//! registration channel. The debit, the Fee record, the `RegistrationFee`
//! transaction and the `fee_paid` flag are written in one unit of work, so
//! either all four exist or none does.
//!
//! # Exactly-once effect
//!
//! - A registration already flagged as paid short-circuits to
//!   `FeeOutcome::AlreadyPaid`.
//! - Concurrent invocations for the same account serialize on the account's
//!   balance lock; the loser re-reads the flag under the lock and reports
//!   `AlreadyPaid`.
//! - The Fee record is unique per account, and the commit refuses a second
//!   one even if the checks above were bypassed.
//!
//! Retrying after `StoreUnavailable` or `DeadlineExceeded` is always safe.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::engine::DEFAULT_OPERATION_TIMEOUT;
use super::ledger_store::LedgerStore;
use super::sequence::SequenceGenerator;
use super::traits::AccountDirectory;
use super::unit_of_work::TransactionDraft;
use crate::types::{
    AccountId, FeeOutcome, FeeSchedule, LedgerError, PaymentMethod, TransactionType,
};

#[derive(Clone)]
pub struct RegistrationFeeSaga {
    store: Arc<LedgerStore>,
    sequences: Arc<SequenceGenerator>,
    directory: Arc<dyn AccountDirectory>,
    schedule: FeeSchedule,
    timeout: Duration,
}

impl RegistrationFeeSaga {
    pub fn new(
        store: Arc<LedgerStore>,
        sequences: Arc<SequenceGenerator>,
        directory: Arc<dyn AccountDirectory>,
        schedule: FeeSchedule,
    ) -> Self {
        Self {
            store,
            sequences,
            directory,
            schedule,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Deduct the registration fee under the default deadline
    pub async fn deduct_registration_fee(
        &self,
        account: &AccountId,
        counterpart: &AccountId,
    ) -> Result<FeeOutcome, LedgerError> {
        self.deduct_registration_fee_with_deadline(account, counterpart, Instant::now() + self.timeout)
            .await
    }

    /// Deduct the registration fee of `account`
    ///
    /// # Arguments
    ///
    /// * `account` - Registered customer paying the fee
    /// * `counterpart` - Account recorded as receiver of the fee transaction
    /// * `deadline` - Instant after which the saga is abandoned uncommitted
    ///
    /// # Returns
    ///
    /// * `Ok(FeeOutcome::Charged(fee))` - This call deducted the fee
    /// * `Ok(FeeOutcome::AlreadyPaid)` - The fee was deducted before; nothing changed
    /// * `Err(LedgerError::RegistrationNotFound)` - The account has no registration record
    /// * `Err(LedgerError::AccountNotFound)` - Account or counterpart unknown
    /// * `Err(LedgerError::InsufficientBalance)` - Balance below the fee; nothing changed
    /// * `Err(LedgerError::StoreUnavailable)` / `Err(LedgerError::DeadlineExceeded)` - Nothing committed
    pub async fn deduct_registration_fee_with_deadline(
        &self,
        account: &AccountId,
        counterpart: &AccountId,
        deadline: Instant,
    ) -> Result<FeeOutcome, LedgerError> {
        let result = if Instant::now() >= deadline {
            Err(LedgerError::deadline_exceeded("registration fee"))
        } else {
            timeout_at(deadline, self.execute(account, counterpart))
                .await
                .unwrap_or_else(|_| Err(LedgerError::deadline_exceeded("registration fee")))
        };

        match &result {
            Ok(FeeOutcome::Charged(fee)) => info!(
                account = %account,
                amount = %fee.amount,
                transaction = %fee.transaction_id,
                "registration fee charged"
            ),
            Ok(FeeOutcome::AlreadyPaid) => info!(account = %account, "registration fee already paid"),
            Err(error) => warn!(account = %account, error = %error, "registration fee failed"),
        }

        result
    }

    async fn execute(
        &self,
        account: &AccountId,
        counterpart: &AccountId,
    ) -> Result<FeeOutcome, LedgerError> {
        let registration = self
            .store
            .registration(account)?
            .ok_or_else(|| LedgerError::registration_not_found(account))?;
        if registration.fee_paid {
            return Ok(FeeOutcome::AlreadyPaid);
        }

        for id in [account, counterpart] {
            if self.directory.resolve_account(id).await?.is_none() {
                return Err(LedgerError::account_not_found(id));
            }
        }

        let amount = self.schedule.amount_for(registration.channel);
        let available = self.store.read(account).await?;
        if available < amount {
            return Err(LedgerError::insufficient_balance(account, available, amount));
        }

        let mut unit = self.store.begin(&[account]).await?;

        // A concurrent invocation may have committed while we waited
        let paid = unit
            .registration(account)
            .map(|registration| registration.fee_paid)
            .unwrap_or(false);
        if paid || unit.has_fee(account) {
            return Ok(FeeOutcome::AlreadyPaid);
        }

        unit.debit(account, amount)?;
        unit.insert_fee(account, amount);
        unit.mark_fee_paid(account)?;

        let draft = TransactionDraft {
            sender_id: account.clone(),
            receiver_id: counterpart.clone(),
            amount,
            tx_type: TransactionType::RegistrationFee,
            payment_method: PaymentMethod::Wallet,
            remarks: format!("Registration fee ({} registration)", registration.channel),
            location_id: None,
            idempotency_key: None,
        };

        match unit.commit(draft, &self.sequences) {
            Ok(receipt) => receipt
                .fee
                .map(FeeOutcome::Charged)
                .ok_or_else(|| LedgerError::registration_not_found(account)),
            Err(LedgerError::DuplicateRequest { .. }) => Ok(FeeOutcome::AlreadyPaid),
            Err(error) => Err(error),
        }
    }
}
