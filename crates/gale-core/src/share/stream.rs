//! Byte-range aware file streaming.
//!
//! Serves a single resolved file either whole or as the inclusive byte
//! window requested via an HTTP `Range` header. The returned stream
//! yields exactly the advertised number of bytes; the caller surfaces
//! the accompanying metadata (content length, `bytes start-end/total`
//! descriptor, partial-vs-full status).
//!
//! Range grammar accepted: `bytes=<start>-<end>` where a missing start
//! defaults to 0 and a missing end to the last byte. An explicit end past
//! the last byte is clamped so the declared length always matches the
//! bytes actually sent.

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom, Take};
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};
use crate::share::ResolvedPath;

/// An inclusive byte window into a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset served
    pub start: u64,
    /// Last byte offset served (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes the range covers.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse a `bytes=<start>-<end>` header against a known file size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeNotSatisfiable`] when the header does not
    /// parse, `start >= size`, or `start > end`.
    pub fn parse(header: &str, size: u64) -> Result<Self> {
        let malformed = || Error::RangeNotSatisfiable(format!("invalid range '{header}'"));

        let window = header.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
        let (start_str, end_str) = window.split_once('-').ok_or_else(malformed)?;

        let start = if start_str.is_empty() {
            0
        } else {
            start_str.parse::<u64>().map_err(|_| malformed())?
        };

        let end = if end_str.is_empty() {
            size.saturating_sub(1)
        } else {
            end_str.parse::<u64>().map_err(|_| malformed())?
        };
        let end = end.min(size.saturating_sub(1));

        if start >= size {
            return Err(Error::RangeNotSatisfiable(format!(
                "start {start} is at or past end of file ({size} bytes)"
            )));
        }
        if start > end {
            return Err(Error::RangeNotSatisfiable(format!(
                "start {start} is after end {end}"
            )));
        }

        Ok(Self { start, end })
    }
}

/// An open file positioned and bounded for streaming.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    range: Option<ByteRange>,
    total_size: u64,
    file_name: String,
}

impl FileStream {
    /// Open a resolved file for streaming, honoring an optional `Range`
    /// header.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the path is not a regular file
    /// - [`Error::RangeNotSatisfiable`] per [`ByteRange::parse`]
    pub async fn open(resolved: &ResolvedPath, range_header: Option<&str>) -> Result<Self> {
        let metadata = tokio::fs::metadata(resolved.as_path()).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(resolved.file_name())
            } else {
                Error::Io(e)
            }
        })?;

        if !metadata.is_file() {
            return Err(Error::NotFound(resolved.file_name()));
        }

        let total_size = metadata.len();
        let range = range_header
            .map(|h| ByteRange::parse(h, total_size))
            .transpose()?;

        let mut file = File::open(resolved.as_path()).await?;
        if let Some(range) = range {
            file.seek(SeekFrom::Start(range.start)).await?;
        }

        Ok(Self {
            file,
            range,
            total_size,
            file_name: resolved.file_name(),
        })
    }

    /// Bytes this stream will yield.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.len())
    }

    /// Size of the underlying file.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Whether this is a partial-content response.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.range.is_some()
    }

    /// `bytes start-end/total` descriptor for partial responses.
    #[must_use]
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|r| format!("bytes {}-{}/{}", r.start, r.end, self.total_size))
    }

    /// File name for the content-disposition header.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Consume the handle, producing a chunked byte stream of exactly
    /// [`Self::content_length`] bytes.
    ///
    /// Errors after the stream starts are yielded as items and propagate
    /// to the hosting layer; nothing is retried here.
    #[must_use]
    pub fn into_stream(self) -> ReaderStream<Take<File>> {
        let length = self.content_length();
        ReaderStream::with_capacity(self.file.take(length), crate::STREAM_CHUNK_SIZE)
    }
}
