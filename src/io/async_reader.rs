//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over rows of either input file for the async
//! strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio (through the futures compat layer) for async file access
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of converted rows
//!                  ↓
//!           csv_format module
//!           (CsvRow implementations)
//! ```

use crate::io::csv_format::CsvRow;
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::io::AsyncRead;

/// Asynchronous CSV reader
///
/// Maintains streaming behavior with memory bounded by the batch size.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncReader<R>,
    headers: Option<StringRecord>,
    /// Physical line the last record read starts on
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .create_reader(reader);

        Self {
            csv_reader,
            headers: None,
            line_num: 1,
        }
    }

    /// Read a batch of converted rows
    ///
    /// Reads up to `batch_size` valid rows. Invalid rows are logged with
    /// the line they start on and skipped, so they do not count towards the batch.
    ///
    /// # Returns
    ///
    /// A vector of successfully converted rows.
    /// Returns an empty vector when the end of the file is reached, or when
    /// the header row cannot be read.
    pub async fn read_batch<T>(&mut self, batch_size: usize) -> Vec<T::Output>
    where
        T: CsvRow + 'static,
    {
        let mut batch = Vec::with_capacity(batch_size);

        if self.headers.is_none() {
            match self.csv_reader.headers().await {
                Ok(headers) => self.headers = Some(headers.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable header row");
                    return batch;
                }
            }
        }

        let mut record = StringRecord::new();
        while batch.len() < batch_size {
            match self.csv_reader.read_record(&mut record).await {
                Ok(false) => break,
                Ok(true) => {
                    if let Some(position) = record.position() {
                        self.line_num = position.line();
                    }
                    match record.deserialize::<T>(self.headers.as_ref()) {
                        Ok(row) => match row.convert() {
                            Ok(value) => batch.push(value),
                            Err(e) => {
                                tracing::warn!(line = self.line_num, error = %e, "skipping invalid row")
                            }
                        },
                        Err(e) => {
                            tracing::warn!(line = self.line_num, error = %e, "skipping unparsable row")
                        }
                    }
                }
                Err(e) if matches!(e.kind(), csv_async::ErrorKind::Io(_)) => {
                    tracing::warn!(error = %e, "stopping at read error");
                    break;
                }
                Err(e) => {
                    let line = e.position().map(|position| position.line());
                    tracing::warn!(line, error = %e, "skipping unreadable row");
                }
            }
        }

        batch
    }
}
