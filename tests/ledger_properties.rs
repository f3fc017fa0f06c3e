//! Property tests over random transfer sequences
//!
//! Balances are driven through the public `LedgerServices` API on a
//! current-thread runtime, one operation at a time.

use campus_wallet_ledger::types::{LedgerError, Role, TransferRequest};
use campus_wallet_ledger::LedgerServices;
use proptest::prelude::*;
use rust_decimal::Decimal;

const ACCOUNTS: [&str; 4] = ["CUS00001", "CUS00002", "RES00001", "RES00002"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

/// Cents to a two-decimal amount
fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

async fn funded_ledger(opening: &[i64]) -> LedgerServices {
    let services = LedgerServices::default();
    for (i, account) in ACCOUNTS.iter().enumerate() {
        let role = if account.starts_with("CUS") {
            Role::Customer
        } else {
            Role::Restaurant
        };
        services
            .open_account((*account).into(), role, None)
            .expect("open");
        services
            .fund(&(*account).into(), cents(opening[i]))
            .await
            .expect("fund");
    }
    services
}

async fn balance(services: &LedgerServices, account: &str) -> Decimal {
    services
        .engine()
        .get_balance(&account.into())
        .await
        .expect("balance")
}

fn transfer_strategy() -> impl Strategy<Value = (usize, usize, i64)> {
    (0..ACCOUNTS.len(), 0..ACCOUNTS.len(), 1i64..50_000i64)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: a successful transfer moves exactly its amount, a failed
    /// one moves nothing, and the ledger total never changes.
    #[test]
    fn transfers_conserve_money(
        opening in prop::collection::vec(1i64..100_000i64, ACCOUNTS.len()),
        transfers in prop::collection::vec(transfer_strategy(), 1..40),
    ) {
        runtime().block_on(async {
            let services = funded_ledger(&opening).await;
            let total: Decimal = opening.iter().map(|c| cents(*c)).sum();

            for (from, to, amount) in transfers {
                let (sender, receiver) = (ACCOUNTS[from], ACCOUNTS[to]);
                let before = (balance(&services, sender).await, balance(&services, receiver).await);
                let amount = cents(amount);

                let result = services
                    .engine()
                    .transfer(TransferRequest::new(sender, receiver, amount))
                    .await;
                let after = (balance(&services, sender).await, balance(&services, receiver).await);

                match result {
                    Ok(tx) => {
                        prop_assert_eq!(tx.amount, amount);
                        prop_assert_eq!(after.0, before.0 - amount);
                        prop_assert_eq!(after.1, before.1 + amount);
                    }
                    Err(LedgerError::SelfTransfer { .. }) => {
                        prop_assert_eq!(sender, receiver);
                    }
                    Err(LedgerError::InsufficientBalance { available, requested, .. }) => {
                        prop_assert!(available < requested);
                        prop_assert_eq!(after, before);
                    }
                    Err(other) => {
                        prop_assert!(false, "unexpected error: {}", other);
                    }
                }

                let mut sum = Decimal::ZERO;
                for account in ACCOUNTS {
                    sum += balance(&services, account).await;
                }
                prop_assert_eq!(sum, total);
            }
            Ok(())
        })?;
    }

    /// Property: no sequence of transfers drives a balance below zero, and
    /// the journal holds exactly the successful transfers with gapless ids.
    #[test]
    fn balances_never_go_negative(
        opening in prop::collection::vec(0i64..5_000i64, ACCOUNTS.len()),
        transfers in prop::collection::vec(transfer_strategy(), 1..60),
    ) {
        runtime().block_on(async {
            let services = LedgerServices::default();
            for (i, account) in ACCOUNTS.iter().enumerate() {
                services.open_account((*account).into(), Role::Customer, None).expect("open");
                if opening[i] > 0 {
                    services.fund(&(*account).into(), cents(opening[i])).await.expect("fund");
                }
            }

            let mut committed = 0u64;
            for (from, to, amount) in transfers {
                let request = TransferRequest::new(ACCOUNTS[from], ACCOUNTS[to], cents(amount));
                if services.engine().transfer(request).await.is_ok() {
                    committed += 1;
                }
                for account in ACCOUNTS {
                    prop_assert!(balance(&services, account).await >= Decimal::ZERO);
                }
            }

            let journal = services.journal().await.expect("journal");
            let ids: Vec<u64> = journal.iter().map(|tx| tx.transaction_id.value()).collect();
            prop_assert_eq!(ids, (1..=committed).collect::<Vec<u64>>());
            Ok(())
        })?;
    }
}
