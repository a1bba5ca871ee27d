//! Ingestion pipeline: pull rows off the CSV one at a time, normalize each, and
//! keep the accepted users in file order.
//!
//! The source is a [`RowStream`]. It yields `Ok(Some(row))` per data line,
//! `Ok(None)` once the file is exhausted and `Err` when the file itself can't be
//! read. Per-row problems never surface as `Err`: a line that can't be decoded
//! comes out as `Ok(Some(Err(rejected)))`, everything else is judged by
//! [`normalize`].

use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord, StringRecord};
use futures::{Stream, TryStream, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::io::reader_from_path;
use crate::loader::{load, LoadSummary};
use crate::normalize::{normalize, RawRow, RejectionReason, UserRecord, REQUIRED_HEADERS};
use crate::{UploadError, UploadResult, UserStore};

/// Pull-based row source over a CSV reader.
pub struct RowStream<R> {
    reader: AsyncReader<R>,
    headers: Arc<StringRecord>,
    line: u64,
}

impl<R> RowStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Read the header line and check the required columns are present.
    pub async fn open(reader: R) -> UploadResult<Self> {
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(1 << 20) // 1 MiB
            .create_reader(reader);

        // a UTF-8 BOM sticks to the first header name otherwise
        let headers: StringRecord = reader
            .headers()
            .await?
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
            .collect();

        if let Some(missing) = REQUIRED_HEADERS
            .iter()
            .find(|req| !headers.iter().any(|h| h == **req))
        {
            return Err(UploadError::MissingHeader(missing.to_string()));
        }
        debug!(headers = ?headers, "csv header accepted");

        Ok(Self {
            reader,
            headers: Arc::new(headers),
            line: 0,
        })
    }

    /// Next data row, `None` at end of file. A row that isn't valid UTF-8 is
    /// handed back as a rejection; the reader has already moved past it.
    pub async fn next_row(&mut self) -> UploadResult<Option<ParsedRow>> {
        let mut record = ByteRecord::new();
        if !self.reader.read_byte_record(&mut record).await? {
            return Ok(None);
        }
        self.line += 1;
        let row = match StringRecord::from_byte_record(record) {
            Ok(values) => Ok(RawRow::new(Arc::clone(&self.headers), values, self.line)),
            Err(err) => Err(RejectedRow {
                line: self.line,
                reason: RejectionReason::MalformedRow(err.to_string()),
            }),
        };
        Ok(Some(row))
    }

    pub fn into_stream(self) -> impl Stream<Item = UploadResult<ParsedRow>> {
        futures::stream::try_unfold(self, |mut rows| async move {
            Ok::<_, UploadError>(rows.next_row().await?.map(|row| (row, rows)))
        })
    }
}

/// A decoded row, or the rejection for a line that couldn't be decoded.
pub type ParsedRow = Result<RawRow, RejectedRow>;

/// A row left out of the import, with the data line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: RejectionReason,
}

/// What one pass over a file produced.
#[derive(Debug, Default)]
pub struct ImportResult {
    pub rows_read: usize,
    /// Accepted users, in file order
    pub records: Vec<UserRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// Normalize every row of `rows`, keeping accepted users in arrival order.
///
/// Rejections are logged and collected; only a stream error stops the pass.
pub async fn collect_records<S>(rows: S) -> UploadResult<ImportResult>
where
    S: TryStream<Ok = ParsedRow, Error = UploadError>,
{
    let mut result = ImportResult::default();
    let rows = rows.into_stream();
    futures::pin_mut!(rows);

    while let Some(parsed) = rows.try_next().await? {
        result.rows_read += 1;
        let rejected = match parsed {
            Ok(row) => match normalize(&row) {
                Ok(user) => {
                    result.records.push(user);
                    continue;
                }
                Err(reason) => RejectedRow {
                    line: row.line(),
                    reason,
                },
            },
            Err(rejected) => rejected,
        };
        warn!(line = rejected.line, reason = %rejected.reason, "row rejected");
        result.rejected.push(rejected);
    }

    info!(
        rows = result.rows_read,
        accepted = result.records.len(),
        rejected = result.rejected.len(),
        "csv pass complete"
    );
    Ok(result)
}

/// Open `reader` as a users CSV and normalize all of it.
pub async fn process_csv_stream<R>(reader: R) -> UploadResult<ImportResult>
where
    R: AsyncRead + Unpin + Send,
{
    let rows = RowStream::open(reader).await?;
    collect_records(rows.into_stream()).await
}

/// Normalize a local file.
pub async fn ingest_path(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
) -> UploadResult<ImportResult> {
    let (reader, meta) = reader_from_path(path, charset).await?;
    info!(
        file = %meta.name_hint,
        compression = ?meta.compression,
        charset = meta.charset.name(),
        "reading users file"
    );
    process_csv_stream(reader).await
}

/// Full pass without persistence. Every accepted user is reported.
pub async fn dry_run(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
) -> UploadResult<ImportResult> {
    let result = ingest_path(path, charset).await?;
    for user in &result.records {
        info!(
            name = user.name(),
            surname = user.surname(),
            email = user.email(),
            "dry run: would insert"
        );
    }
    info!(records = result.records.len(), "dry run finished, database untouched");
    Ok(result)
}

/// Full pass, then hand the accepted users to the loader.
///
/// A stream error returns before anything is inserted.
pub async fn import<S>(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
    store: &mut S,
) -> UploadResult<(ImportResult, LoadSummary)>
where
    S: UserStore + ?Sized,
{
    let result = ingest_path(path, charset).await?;
    let summary = load(store, &result.records).await;
    Ok((result, summary))
}
