//! Reading the shrine-ontology table.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::types::Header;

/// One data record with its 1-based line number (the header is line 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Line where the record starts.
    pub line: u64,
    /// Field values as read.
    pub fields: Vec<String>,
}

/// Errors from the source table.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file could not be opened.
    #[error("cannot open source: {0}")]
    Open(#[source] io::Error),
    /// Reading failed mid-stream.
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
    /// The table has no header row.
    #[error("missing header row")]
    MissingHeader,
    /// A record could not be decoded (quoting, encoding).
    #[error("line {line}: {message}")]
    Record {
        /// Line of the offending record, 0 if unknown.
        line: u64,
        /// Decoder message.
        message: String,
    },
}

impl SourceError {
    /// Whether the error concerns one record rather than the whole source.
    pub fn is_record_error(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Self::Io(e),
            _ => Self::Record { line, message },
        }
    }
}

/// Streaming reader over a comma-delimited, double-quoted ontology table.
///
/// The header is read eagerly; records are yielded one at a time so the
/// caller can decide per record whether to continue after a failure.
pub struct TableReader<R: Read> {
    inner: csv::Reader<R>,
    header: Header,
}

impl TableReader<File> {
    /// Open a file.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::Open)?;
        Self::from_reader(file)
    }
}

impl<R: Read> TableReader<R> {
    /// Wrap any reader.
    pub fn from_reader(reader: R) -> Result<Self, SourceError> {
        let mut inner = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let raw = inner.headers().map_err(SourceError::from_csv)?;
        if raw.is_empty() {
            return Err(SourceError::MissingHeader);
        }
        let header = Header::from_columns(
            raw.iter()
                .enumerate()
                .map(|(i, c)| if i == 0 { c.trim_start_matches('\u{feff}') } else { c }),
        );
        Ok(Self { inner, header })
    }

    /// The header row.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Remaining records.
    pub fn records(&mut self) -> impl Iterator<Item = Result<RawRecord, SourceError>> + '_ {
        self.inner.records().map(|result| {
            let record = result.map_err(SourceError::from_csv)?;
            Ok(RawRecord {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                fields: record.iter().map(str::to_string).collect(),
            })
        })
    }
}
