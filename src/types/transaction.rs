//! Transaction-related types for the campus wallet ledger
//!
//! This module defines the immutable Transaction record appended for every
//! money movement, the request shape accepted by the transfer engine, and the
//! amendment and filter types used by reporting collaborators.

use super::account::{AccountId, Role};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Prefix of the external transaction reference
pub const TRANSACTION_ID_PREFIX: &str = "TXN";

/// Zero-padding width of the external transaction reference
pub const TRANSACTION_ID_WIDTH: usize = 10;

/// Transaction identifier
///
/// Allocated from the `transaction_id` sequence counter; strictly increasing
/// in commit order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            TRANSACTION_ID_PREFIX,
            self.0,
            width = TRANSACTION_ID_WIDTH
        )
    }
}

/// Kinds of money movement recorded by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Wallet-to-wallet payment, e.g. customer paying a restaurant
    Transfer,

    /// Cash collected by treasury and loaded into a wallet
    TopUp,

    /// Money returned to a payer
    Refund,

    /// Administrative credit, e.g. fund distribution from the master treasury
    Credit,

    /// One-time registration fee. Written only by the fee saga.
    RegistrationFee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::TopUp => "top_up",
            TransactionType::Refund => "refund",
            TransactionType::Credit => "credit",
            TransactionType::RegistrationFee => "registration_fee",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "transfer" => Ok(TransactionType::Transfer),
            "top_up" | "topup" => Ok(TransactionType::TopUp),
            "refund" => Ok(TransactionType::Refund),
            "credit" => Ok(TransactionType::Credit),
            "registration_fee" => Ok(TransactionType::RegistrationFee),
            other => Err(format!("Invalid transaction type '{}'", other)),
        }
    }
}

/// How the money entered or moved through the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Wallet,
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wallet" => Ok(PaymentMethod::Wallet),
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "online" => Ok(PaymentMethod::Online),
            other => Err(format!("Invalid payment method '{}'", other)),
        }
    }
}

/// Settlement status of a transaction record
///
/// Settlement is synchronous: the engine only ever writes `Success`.
/// `Pending` and `Failed` remain representable for records imported from
/// other systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limit enforcement mode of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Role-pair caps are enforced
    #[default]
    Normal,

    /// Caps are bypassed for large distributions by a privileged operator
    Bulk,
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(TransferMode::Normal),
            "bulk" => Ok(TransferMode::Bulk),
            other => Err(format!("Invalid transfer mode '{}'", other)),
        }
    }
}

/// Immutable record of a single money movement
///
/// Created exactly once per committed movement. Only the descriptive fields
/// (`remarks`, `payment_method`, `location_id`) may be amended afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub remarks: String,
    pub location_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by_id: Option<AccountId>,
}

/// Input of `TransferEngine::transfer`
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub payment_method: PaymentMethod,
    pub remarks: String,
    pub mode: TransferMode,
    pub location_id: Option<String>,

    /// Client-supplied token; a second request carrying the same token is
    /// rejected instead of moving money twice.
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    /// Create a plain wallet transfer in normal mode
    pub fn new(
        sender_id: impl Into<AccountId>,
        receiver_id: impl Into<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            tx_type: TransactionType::Transfer,
            payment_method: PaymentMethod::Wallet,
            remarks: String::new(),
            mode: TransferMode::Normal,
            location_id: None,
            idempotency_key: None,
        }
    }

    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Descriptive fields an authorized editor may change on a committed record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionAmendment {
    pub remarks: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub location_id: Option<String>,
}

impl TransactionAmendment {
    pub fn is_empty(&self) -> bool {
        self.remarks.is_none() && self.payment_method.is_none() && self.location_id.is_none()
    }
}

/// Reporting filter over committed transactions
///
/// All criteria are conjunctive; unset criteria match everything. The date
/// range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Matches when the account is sender or receiver
    pub account: Option<AccountId>,

    /// Matches when sender or receiver holds this role
    pub role: Option<Role>,

    /// Empty means all types
    pub types: Vec<TransactionType>,

    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Check a record against the filter
    ///
    /// `role_members` must hold the accounts with `self.role` when a role
    /// criterion is set; it is ignored otherwise.
    pub fn matches(&self, tx: &Transaction, role_members: Option<&HashSet<AccountId>>) -> bool {
        if let Some(account) = &self.account {
            if &tx.sender_id != account && &tx.receiver_id != account {
                return false;
            }
        }

        if self.role.is_some() {
            let members = match role_members {
                Some(members) => members,
                None => return false,
            };
            if !members.contains(&tx.sender_id) && !members.contains(&tx.receiver_id) {
                return false;
            }
        }

        if !self.types.is_empty() && !self.types.contains(&tx.tx_type) {
            return false;
        }

        if let Some(from) = self.from {
            if tx.created_at < from {
                return false;
            }
        }

        if let Some(to) = self.to {
            if tx.created_at > to {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn sample(sender: &str, receiver: &str, tx_type: TransactionType) -> Transaction {
        Transaction {
            transaction_id: TransactionId::new(1),
            sender_id: sender.into(),
            receiver_id: receiver.into(),
            amount: dec!(10.00),
            tx_type,
            payment_method: PaymentMethod::Wallet,
            status: TransactionStatus::Success,
            remarks: String::new(),
            location_id: None,
            idempotency_key: None,
            created_at: Utc::now(),
            edited_at: None,
            edited_by_id: None,
        }
    }

    #[rstest]
    #[case(1, "TXN0000000001")]
    #[case(42, "TXN0000000042")]
    #[case(12345678901, "TXN12345678901")]
    fn test_transaction_id_display(#[case] seq: u64, #[case] expected: &str) {
        assert_eq!(TransactionId::new(seq).to_string(), expected);
    }

    #[rstest]
    #[case("transfer", TransactionType::Transfer)]
    #[case("TopUp", TransactionType::TopUp)]
    #[case("top-up", TransactionType::TopUp)]
    #[case("refund", TransactionType::Refund)]
    #[case("credit", TransactionType::Credit)]
    #[case("registration_fee", TransactionType::RegistrationFee)]
    fn test_transaction_type_parsing(#[case] input: &str, #[case] expected: TransactionType) {
        assert_eq!(input.parse::<TransactionType>().unwrap(), expected);
    }

    #[test]
    fn test_transfer_request_defaults() {
        let request = TransferRequest::new("CUS00001", "RES00001", dec!(12.50));
        assert_eq!(request.tx_type, TransactionType::Transfer);
        assert_eq!(request.payment_method, PaymentMethod::Wallet);
        assert_eq!(request.mode, TransferMode::Normal);
        assert!(request.idempotency_key.is_none());
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Pending);
    }

    #[test]
    fn test_filter_by_account_matches_either_side() {
        let tx = sample("CUS00001", "RES00001", TransactionType::Transfer);

        let as_sender = TransactionFilter {
            account: Some("CUS00001".into()),
            ..Default::default()
        };
        let as_receiver = TransactionFilter {
            account: Some("RES00001".into()),
            ..Default::default()
        };
        let unrelated = TransactionFilter {
            account: Some("CUS00002".into()),
            ..Default::default()
        };

        assert!(as_sender.matches(&tx, None));
        assert!(as_receiver.matches(&tx, None));
        assert!(!unrelated.matches(&tx, None));
    }

    #[test]
    fn test_filter_by_role_uses_members() {
        let tx = sample("CUS00001", "RES00001", TransactionType::Transfer);
        let filter = TransactionFilter {
            role: Some(Role::Restaurant),
            ..Default::default()
        };

        let members: HashSet<AccountId> = [AccountId::from("RES00001")].into_iter().collect();
        let others: HashSet<AccountId> = [AccountId::from("RES00009")].into_iter().collect();

        assert!(filter.matches(&tx, Some(&members)));
        assert!(!filter.matches(&tx, Some(&others)));
        assert!(!filter.matches(&tx, None));
    }

    #[test]
    fn test_filter_by_type_and_range() {
        let tx = sample("CUS00001", "RES00001", TransactionType::Refund);

        let by_type = TransactionFilter {
            types: vec![TransactionType::Transfer, TransactionType::Refund],
            ..Default::default()
        };
        assert!(by_type.matches(&tx, None));

        let wrong_type = TransactionFilter {
            types: vec![TransactionType::TopUp],
            ..Default::default()
        };
        assert!(!wrong_type.matches(&tx, None));

        let in_range = TransactionFilter {
            from: Some(tx.created_at - Duration::minutes(1)),
            to: Some(tx.created_at),
            ..Default::default()
        };
        assert!(in_range.matches(&tx, None));

        let too_late = TransactionFilter {
            from: Some(tx.created_at + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!too_late.matches(&tx, None));
    }

    #[test]
    fn test_empty_amendment() {
        assert!(TransactionAmendment::default().is_empty());
        let amendment = TransactionAmendment {
            remarks: Some("corrected".to_string()),
            ..Default::default()
        };
        assert!(!amendment.is_empty());
    }
}
