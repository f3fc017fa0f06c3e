//! Synchronous CSV reader with iterator interface
//!
//! Streams ledger operations from an operation file one row at a time.
//! Row-level failures are yielded as `LedgerError::ParseError` carrying the
//! physical line number, so a replay can report the row and keep going.
//!
//! ```no_run
//! use campus_wallet_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(op) => println!("{}: {:?}", op.name(), op),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, LedgerOp};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::path::Path;

/// Attach a line number to a row-level error
pub(crate) fn at_line(error: LedgerError, line: u64) -> LedgerError {
    match error {
        LedgerError::ParseError { message, .. } => LedgerError::ParseError {
            line: Some(line),
            message,
        },
        other => other,
    }
}

#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    headers: StringRecord,
    record: StringRecord,
}

impl SyncReader {
    /// Open an operation file
    ///
    /// Fields are trimmed and rows may omit trailing columns.
    ///
    /// # Errors
    ///
    /// `IoError` when the file cannot be opened, `ParseError` when the
    /// header row cannot be read.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerOp, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map_or(0, |p| p.line());
                let op = self
                    .record
                    .deserialize::<CsvRecord>(Some(&self.headers))
                    .map_err(LedgerError::from)
                    .and_then(convert_csv_record)
                    .map_err(|e| at_line(e, line));
                Some(op)
            }
            // A broken row still advances the reader
            Err(e) => Some(Err(LedgerError::from(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransferRequest;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,account,counterpart,amount,kind,method,mode,role,channel,key,remarks\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn read_all(content: &str) -> Vec<Result<LedgerOp, LedgerError>> {
        let file = create_temp_csv(content);
        SyncReader::new(file.path()).unwrap().collect()
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(LedgerError::IoError { .. })));
    }

    #[test]
    fn test_reads_each_operation_kind() {
        let ops = read_all(&format!(
            "{HEADER}\
             open,CUS00001,,,,,,customer,online,,\n\
             fund,CUS00001,,100.00,,,,,,,\n\
             transfer,CUS00001,RES00001,12.50,,,,,,k1,lunch\n\
             fee,CUS00001,TRC00001,,,,,,,,\n"
        ));

        let names: Vec<&str> = ops.iter().map(|r| r.as_ref().unwrap().name()).collect();
        assert_eq!(names, vec!["open", "fund", "transfer", "fee"]);
        assert_eq!(
            ops[2].as_ref().unwrap(),
            &LedgerOp::Transfer(
                TransferRequest::new("CUS00001", "RES00001", dec!(12.50))
                    .with_idempotency_key("k1")
                    .with_remarks("lunch")
            )
        );
    }

    #[test]
    fn test_short_rows_and_whitespace() {
        let ops = read_all(&format!("{HEADER}  fund , CUS00001 ,, 5 \n"));

        assert_eq!(
            ops,
            vec![Ok(LedgerOp::Fund {
                account: "CUS00001".into(),
                amount: dec!(5),
            })]
        );
    }

    #[test]
    fn test_errors_carry_line_numbers_and_reading_continues() {
        let ops = read_all(&format!(
            "{HEADER}\
             fund,CUS00001,,100.00\n\
             fund,CUS00001,,lots\n\
             payout,CUS00001\n\
             fund,CUS00002,,1\n"
        ));

        assert_eq!(ops.len(), 4);
        assert!(ops[0].is_ok());
        assert!(ops[3].is_ok());
        assert!(matches!(ops[1], Err(LedgerError::ParseError { line: Some(3), .. })));
        assert!(matches!(ops[2], Err(LedgerError::ParseError { line: Some(4), .. })));
    }

    #[test]
    fn test_empty_file_after_header() {
        assert!(read_all(HEADER).is_empty());
    }
}
