//! Registration fee types
//!
//! A `Fee` record is the proof that the registration fee saga completed for
//! an account. At most one exists per account.

use super::account::{AccountId, RegistrationChannel};
use super::transaction::TransactionId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee record, keyed uniquely by `account_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub account_id: AccountId,
    pub amount: Decimal,

    /// The `RegistrationFee` transaction written in the same atomic unit
    pub transaction_id: TransactionId,

    pub created_at: DateTime<Utc>,
}

/// Result of `RegistrationFeeSaga::deduct_registration_fee`
#[derive(Debug, Clone, PartialEq)]
pub enum FeeOutcome {
    /// The fee was deducted by this call
    Charged(Fee),

    /// The fee had already been deducted; nothing changed
    AlreadyPaid,
}

impl FeeOutcome {
    pub fn is_already_paid(&self) -> bool {
        matches!(self, FeeOutcome::AlreadyPaid)
    }
}

/// Fixed registration fee per registration channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Self-service registration
    pub online: Decimal,

    /// Assisted registration
    pub offline: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            online: Decimal::new(3000, 2),
            offline: Decimal::new(5000, 2),
        }
    }
}

impl FeeSchedule {
    pub fn amount_for(&self, channel: RegistrationChannel) -> Decimal {
        match channel {
            RegistrationChannel::Online => self.online,
            RegistrationChannel::Offline => self.offline,
        }
    }
}
