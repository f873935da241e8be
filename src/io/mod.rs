//! CSV input and output for the batch driver
//!
//! - `csv_format` - account and transfer row types, their conversion into
//!   store parameters, and the balances writer
//! - `sync_reader` - row-by-row reader used by the sync strategy
//! - `async_reader` - batch reader over `csv-async` used by the async strategy

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{write_accounts_csv, AccountCsvRecord, CsvRow, TransferCsvRecord};
pub use sync_reader::SyncReader;
