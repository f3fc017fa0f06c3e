//! CSV format handling for operation records and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to `LedgerOp`s
//! - Balance and journal serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{
    AccountBalance, AccountId, LedgerError, LedgerOp, PaymentMethod, RegistrationChannel, Role,
    Transaction, TransactionType, TransferMode, TransferRequest,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Columns: `op,account,counterpart,amount,kind,method,mode,role,channel,key,remarks`.
/// Everything but `op` is optional; which fields are required depends on
/// the operation.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub counterpart: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

fn parse_error(message: String) -> LedgerError {
    LedgerError::ParseError {
        line: None,
        message,
    }
}

/// Non-blank field value
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(field: &'a Option<String>, name: &str, op: &str) -> Result<&'a str, LedgerError> {
    present(field).ok_or_else(|| parse_error(format!("'{}' is missing field '{}'", op, name)))
}

fn parse_field<T: FromStr<Err = String>>(value: &str) -> Result<T, LedgerError> {
    value.parse::<T>().map_err(parse_error)
}

fn parse_amount(field: &Option<String>, op: &str) -> Result<Decimal, LedgerError> {
    let raw = required(field, "amount", op)?;
    Decimal::from_str(raw).map_err(|_| parse_error(format!("Invalid amount '{}'", raw)))
}

/// Convert a CsvRecord to a LedgerOp
///
/// Only the shape of the row is checked here; amounts are validated by the
/// ledger itself so that a zero or negative amount fails as `InvalidAmount`.
///
/// # Returns
///
/// * `Ok(LedgerOp)` - Successfully converted operation
/// * `Err(LedgerError::ParseError)` - Unknown op, missing field or unparsable value
pub fn convert_csv_record(record: CsvRecord) -> Result<LedgerOp, LedgerError> {
    let op = record.op.trim().to_lowercase();
    let account = |field: &Option<String>, name: &str| {
        required(field, name, &op).map(AccountId::from)
    };

    match op.as_str() {
        "open" => Ok(LedgerOp::Open {
            account: account(&record.account, "account")?,
            role: parse_field::<Role>(required(&record.role, "role", &op)?)?,
            channel: present(&record.channel)
                .map(parse_field::<RegistrationChannel>)
                .transpose()?,
        }),
        "fund" => Ok(LedgerOp::Fund {
            account: account(&record.account, "account")?,
            amount: parse_amount(&record.amount, &op)?,
        }),
        "transfer" => {
            let mut request = TransferRequest::new(
                account(&record.account, "account")?,
                account(&record.counterpart, "counterpart")?,
                parse_amount(&record.amount, &op)?,
            );
            if let Some(kind) = present(&record.kind) {
                request = request.with_type(parse_field::<TransactionType>(kind)?);
            }
            if let Some(method) = present(&record.method) {
                request = request.with_payment_method(parse_field::<PaymentMethod>(method)?);
            }
            if let Some(mode) = present(&record.mode) {
                request = request.with_mode(parse_field::<TransferMode>(mode)?);
            }
            if let Some(key) = present(&record.key) {
                request = request.with_idempotency_key(key);
            }
            if let Some(remarks) = present(&record.remarks) {
                request = request.with_remarks(remarks);
            }
            Ok(LedgerOp::Transfer(request))
        }
        "fee" => Ok(LedgerOp::Fee {
            account: account(&record.account, "account")?,
            counterpart: account(&record.counterpart, "counterpart")?,
        }),
        _ => Err(parse_error(format!("Invalid operation '{}'", record.op))),
    }
}

/// Write balances as `account,role,balance` with two decimals
///
/// Rows are sorted by account id for deterministic output.
pub fn write_balances_csv(
    balances: &[AccountBalance],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["account", "role", "balance"])?;

    let mut sorted: Vec<&AccountBalance> = balances.iter().collect();
    sorted.sort_by(|a, b| a.account_id.cmp(&b.account_id));

    for row in sorted {
        writer.write_record(&[
            row.account_id.to_string(),
            row.role.to_string(),
            format!("{:.2}", row.balance),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write committed transactions, one row each, in the order given
pub fn write_journal_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record([
        "transaction_id",
        "sender",
        "receiver",
        "amount",
        "type",
        "method",
        "status",
        "remarks",
        "location",
        "key",
        "created_at",
    ])?;

    for tx in transactions {
        writer.write_record(&[
            tx.transaction_id.to_string(),
            tx.sender_id.to_string(),
            tx.receiver_id.to_string(),
            format!("{:.2}", tx.amount),
            tx.tx_type.to_string(),
            tx.payment_method.to_string(),
            tx.status.to_string(),
            tx.remarks.clone(),
            tx.location_id.clone().unwrap_or_default(),
            tx.idempotency_key.clone().unwrap_or_default(),
            tx.created_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionId, TransactionStatus};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn record(op: &str) -> CsvRecord {
        CsvRecord {
            op: op.to_string(),
            ..Default::default()
        }
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_convert_open() {
        let op = convert_csv_record(CsvRecord {
            account: some("CUS00001"),
            role: some("customer"),
            channel: some("offline"),
            ..record("OPEN")
        })
        .unwrap();

        assert_eq!(
            op,
            LedgerOp::Open {
                account: "CUS00001".into(),
                role: Role::Customer,
                channel: Some(RegistrationChannel::Offline),
            }
        );
    }

    #[test]
    fn test_convert_transfer_defaults() {
        let op = convert_csv_record(CsvRecord {
            account: some("CUS00001"),
            counterpart: some("RES00001"),
            amount: some(" 12.50 "),
            ..record("transfer")
        })
        .unwrap();

        assert_eq!(
            op,
            LedgerOp::Transfer(TransferRequest::new("CUS00001", "RES00001", dec!(12.50)))
        );
    }

    #[test]
    fn test_convert_transfer_with_all_fields() {
        let op = convert_csv_record(CsvRecord {
            account: some("TRM00001"),
            counterpart: some("ADM00001"),
            amount: some("7500"),
            kind: some("credit"),
            method: some("cash"),
            mode: some("bulk"),
            key: some("dist-1"),
            remarks: some("term funds"),
            ..record("transfer")
        })
        .unwrap();

        let expected = TransferRequest::new("TRM00001", "ADM00001", dec!(7500))
            .with_type(TransactionType::Credit)
            .with_payment_method(PaymentMethod::Cash)
            .with_mode(TransferMode::Bulk)
            .with_idempotency_key("dist-1")
            .with_remarks("term funds");
        assert_eq!(op, LedgerOp::Transfer(expected));
    }

    #[test]
    fn test_convert_fund_and_fee() {
        let fund = convert_csv_record(CsvRecord {
            account: some("CUS00001"),
            amount: some("200.00"),
            ..record("fund")
        })
        .unwrap();
        assert_eq!(
            fund,
            LedgerOp::Fund {
                account: "CUS00001".into(),
                amount: dec!(200.00),
            }
        );

        let fee = convert_csv_record(CsvRecord {
            account: some("CUS00001"),
            counterpart: some("TRC00001"),
            ..record("fee")
        })
        .unwrap();
        assert_eq!(fee.name(), "fee");
    }

    #[rstest]
    #[case::unknown_op(record("payout"), "Invalid operation")]
    #[case::open_without_role(CsvRecord { account: some("A"), ..record("open") }, "missing field 'role'")]
    #[case::bad_role(CsvRecord { account: some("A"), role: some("janitor"), ..record("open") }, "Unknown role")]
    #[case::fund_without_amount(CsvRecord { account: some("A"), ..record("fund") }, "missing field 'amount'")]
    #[case::blank_amount(CsvRecord { account: some("A"), amount: some("  "), ..record("fund") }, "missing field 'amount'")]
    #[case::bad_amount(CsvRecord { account: some("A"), amount: some("ten"), ..record("fund") }, "Invalid amount")]
    #[case::transfer_without_counterpart(
        CsvRecord { account: some("A"), amount: some("1"), ..record("transfer") },
        "missing field 'counterpart'"
    )]
    #[case::bad_mode(
        CsvRecord { account: some("A"), counterpart: some("B"), amount: some("1"), mode: some("turbo"), ..record("transfer") },
        "Invalid transfer mode"
    )]
    fn test_convert_errors(#[case] input: CsvRecord, #[case] expected: &str) {
        let error = convert_csv_record(input).unwrap_err();
        assert!(matches!(error, LedgerError::ParseError { .. }));
        assert!(error.to_string().contains(expected), "got: {}", error);
    }

    #[rstest]
    #[case::empty(vec![], "account,role,balance\n")]
    #[case::sorted_and_rounded(
        vec![
            AccountBalance { account_id: "RES00001".into(), role: Role::Restaurant, balance: dec!(350) },
            AccountBalance { account_id: "CUS00001".into(), role: Role::Customer, balance: dec!(700.5) },
        ],
        "account,role,balance\nCUS00001,customer,700.50\nRES00001,restaurant,350.00\n"
    )]
    fn test_write_balances_csv(#[case] balances: Vec<AccountBalance>, #[case] expected: &str) {
        let mut output = Vec::new();
        write_balances_csv(&balances, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_journal_csv() {
        let tx = Transaction {
            transaction_id: TransactionId::new(3),
            sender_id: "CUS00001".into(),
            receiver_id: "RES00001".into(),
            amount: dec!(300),
            tx_type: TransactionType::Transfer,
            payment_method: PaymentMethod::Wallet,
            status: TransactionStatus::Success,
            remarks: "lunch, extra rice".to_string(),
            location_id: None,
            idempotency_key: Some("k1".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            edited_at: None,
            edited_by_id: None,
        };

        let mut output = Vec::new();
        write_journal_csv(&[tx], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "TXN0000000003,CUS00001,RES00001,300.00,transfer,wallet,success,\"lunch, extra rice\",,k1,2024-01-02T03:04:05+00:00"
        );
    }
}
