//! Replayable ledger operations
//!
//! A `LedgerOp` is one row of an operation file after parsing. Each variant
//! maps onto exactly one ledger service call.

use super::account::{Account, AccountId, RegistrationChannel, Role};
use super::fee::FeeOutcome;
use super::transaction::{Transaction, TransferRequest};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOp {
    /// Add an account to the directory, optionally with a registration record
    Open {
        account: AccountId,
        role: Role,
        channel: Option<RegistrationChannel>,
    },

    /// Opening-balance credit collected outside the wallet
    Fund { account: AccountId, amount: Decimal },

    Transfer(TransferRequest),

    /// Registration fee deduction
    Fee {
        account: AccountId,
        counterpart: AccountId,
    },
}

impl LedgerOp {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerOp::Open { .. } => "open",
            LedgerOp::Fund { .. } => "fund",
            LedgerOp::Transfer(_) => "transfer",
            LedgerOp::Fee { .. } => "fee",
        }
    }

    /// Accounts whose state the operation reads or writes
    ///
    /// Operations with disjoint account sets and no shared idempotency key
    /// commute.
    pub fn accounts(&self) -> Vec<&AccountId> {
        match self {
            LedgerOp::Open { account, .. } | LedgerOp::Fund { account, .. } => vec![account],
            LedgerOp::Transfer(request) => vec![&request.sender_id, &request.receiver_id],
            LedgerOp::Fee {
                account,
                counterpart,
            } => vec![account, counterpart],
        }
    }

    /// Idempotency key the operation claims, if any
    ///
    /// Keys are ledger-wide, so two operations carrying the same key do not
    /// commute even when their accounts are disjoint.
    pub fn idempotency_key(&self) -> Option<&str> {
        match self {
            LedgerOp::Transfer(request) => request.idempotency_key.as_deref(),
            _ => None,
        }
    }
}

/// What a successfully applied operation produced
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    Opened(Account),
    Funded { account: AccountId, balance: Decimal },
    Transferred(Transaction),
    Fee(FeeOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accounts_of_each_op() {
        let open = LedgerOp::Open {
            account: "CUS00001".into(),
            role: Role::Customer,
            channel: None,
        };
        let transfer = LedgerOp::Transfer(TransferRequest::new("CUS00001", "RES00001", dec!(1)));
        let fee = LedgerOp::Fee {
            account: "CUS00001".into(),
            counterpart: "TRC00001".into(),
        };

        assert_eq!(open.accounts(), vec![&AccountId::from("CUS00001")]);
        assert_eq!(
            transfer.accounts(),
            vec![&AccountId::from("CUS00001"), &AccountId::from("RES00001")]
        );
        assert_eq!(fee.accounts().len(), 2);
        assert_eq!(fee.name(), "fee");
    }

    #[test]
    fn test_idempotency_key_of_each_op() {
        let keyed = LedgerOp::Transfer(
            TransferRequest::new("CUS00001", "RES00001", dec!(1)).with_idempotency_key("pos-1"),
        );
        let plain = LedgerOp::Transfer(TransferRequest::new("CUS00001", "RES00001", dec!(1)));
        let fund = LedgerOp::Fund {
            account: "CUS00001".into(),
            amount: dec!(1),
        };

        assert_eq!(keyed.idempotency_key(), Some("pos-1"));
        assert_eq!(plain.idempotency_key(), None);
        assert_eq!(fund.idempotency_key(), None);
    }
}
