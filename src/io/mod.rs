//! I/O module
//!
//! Reads operation files and writes balance and journal reports.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, report serialization)
//! - `sync_reader` - Row-by-row reader with line-numbered errors
//! - `async_reader` - Batch reader for concurrent replay

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_record, write_balances_csv, write_journal_csv, CsvRecord};
pub use sync_reader::SyncReader;
