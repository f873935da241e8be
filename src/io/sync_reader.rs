//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over rows of either input file. Delegates
//! CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV rows
//! sequentially, converting each one through its [`CsvRow`] implementation.
//! It never loads the entire file into memory.
//!
//! ```no_run
//! use ledger_engine::io::csv_format::TransferCsvRecord;
//! use ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::<TransferCsvRecord>::new(Path::new("transfers.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Transfer: {:?}", request),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors, unreadable header) are returned
//!   from `new()`
//! - Individual row errors are yielded as `ParseError`s carrying the physical
//!   line the row starts on

use crate::io::csv_format::CsvRow;
use crate::types::LedgerError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::marker::PhantomData;
use std::path::Path;

/// Synchronous CSV reader
///
/// Provides an iterator interface over converted rows of type `T`.
#[derive(Debug)]
pub struct SyncReader<T> {
    reader: csv::Reader<File>,
    headers: StringRecord,
    _row: PhantomData<T>,
}

impl<T: CsvRow> SyncReader<T> {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(LedgerError::FileNotFound)` if the file does not exist
    /// * `Err(LedgerError::IoError)` for any other open failure
    /// * `Err(LedgerError::ParseError)` if the header row cannot be read
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .buffer_capacity(8 * 1024)
            .from_reader(file);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            _row: PhantomData,
        })
    }
}

impl<T: CsvRow> Iterator for SyncReader<T> {
    type Item = Result<T::Output, LedgerError>;

    /// Get the next converted row
    ///
    /// # Returns
    ///
    /// * `Some(Ok(T::Output))` - Successfully parsed row
    /// * `Some(Err(LedgerError::ParseError))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Ok(true) => {
                // Quoted fields may span lines, so count from the record's position.
                let line = record.position().map(|pos| pos.line());
                let row = record
                    .deserialize::<T>(Some(&self.headers))
                    .map_err(|e| LedgerError::parse_error(line, e.to_string()))
                    .and_then(|row| row.convert().map_err(|e| LedgerError::parse_error(line, e)));
                Some(row)
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_format::{AccountCsvRecord, TransferCsvRecord};
    use crate::types::{NewAccount, TransferRequest};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn read_transfers(content: &str) -> Vec<Result<TransferRequest, LedgerError>> {
        let file = create_temp_csv(content);
        SyncReader::<TransferCsvRecord>::new(file.path())
            .unwrap()
            .collect()
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        let result = SyncReader::<TransferCsvRecord>::new(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_sync_reader_reads_accounts() {
        let file = create_temp_csv("owner,balance,currency\nalice,100,USD\nbob,50,EUR\n");

        let accounts: Vec<_> = SyncReader::<AccountCsvRecord>::new(file.path())
            .unwrap()
            .collect();

        assert_eq!(
            accounts,
            vec![
                Ok(NewAccount::new("alice", 100, "USD")),
                Ok(NewAccount::new("bob", 50, "EUR")),
            ]
        );
    }

    #[test]
    fn test_sync_reader_reads_transfers_in_order() {
        let records = read_transfers("from,to,amount\n1,2,30\n2,1,5\n");

        assert_eq!(
            records,
            vec![
                Ok(TransferRequest { from: 1, to: 2, amount: 30 }),
                Ok(TransferRequest { from: 2, to: 1, amount: 5 }),
            ]
        );
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let records = read_transfers("from,to,amount\n1,2,30\n1,2,invalid\nx,2,5\n2,1,5\n");

        assert_eq!(records.len(), 4);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(LedgerError::ParseError { line: Some(3), .. })
        ));
        assert!(matches!(
            records[2],
            Err(LedgerError::ParseError { line: Some(4), .. })
        ));
        assert!(records[3].is_ok());
    }

    #[test]
    fn test_sync_reader_reports_physical_lines_after_multiline_field() {
        let records = read_transfers("from,to,amount\n1,2,\"3\n0\"\nx,2,5\n2,1,5\n");

        assert_eq!(records.len(), 3);
        assert!(matches!(
            records[0],
            Err(LedgerError::ParseError { line: Some(2), .. })
        ));
        assert!(matches!(
            records[1],
            Err(LedgerError::ParseError { line: Some(4), .. })
        ));
        assert_eq!(records[2], Ok(TransferRequest { from: 2, to: 1, amount: 5 }));
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let records = read_transfers("from,to,amount\n  1  ,  2  ,  30  \n");
        assert_eq!(records, vec![Ok(TransferRequest { from: 1, to: 2, amount: 30 })]);
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        assert!(read_transfers("from,to,amount\n").is_empty());
    }

    #[test]
    fn test_sync_reader_filter_map_pattern() {
        let valid: Vec<_> = read_transfers("from,to,amount\n1,2,10\n1,2,\n3,4,5\n")
            .into_iter()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(valid.len(), 2);
        assert_eq!(valid[1].from, 3);
    }
}
