use crate::UploadResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::Utf8Transcoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

#[derive(Debug, Clone)]
pub struct CsvMeta {
    /// Picked from the file extension (`.gz`, `.zst`)
    pub compression: Compression,
    /// File name, for log lines
    pub name_hint: String,
    /// Which character encoding to expect (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for CsvMeta {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl CsvMeta {
    /// Meta for a local file: compression from the extension, caller-chosen charset.
    pub fn for_path(path: &Path, charset: &'static encoding_rs::Encoding) -> Self {
        let compression = match path.extension().and_then(|s| s.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        };
        Self {
            compression,
            name_hint: path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string(),
            charset,
        }
    }
}

/// Wrap a raw reader with optional decompression and UTF-8 transcoding.
pub fn build_csv_reader<R>(raw: R, meta: &CsvMeta) -> impl AsyncRead + Unpin + Send
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // 1 MiB read buffer, same as the CSV reader's
    let buf = BufReader::with_capacity(1 << 20, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = match meta.compression {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    // transcode only when the input isn't UTF-8 already
    let reader: Box<dyn AsyncRead + Unpin + Send> = if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    };
    reader
}

/// Open a local CSV file for streaming.
pub async fn reader_from_path(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
) -> UploadResult<(impl AsyncRead + Unpin + Send, CsvMeta)> {
    let file = File::open(path).await?;
    let meta = CsvMeta::for_path(path, charset);
    Ok((build_csv_reader(file, &meta), meta))
}
