//! Append-only CSV result table
//!
//! The header is written once when the file is created. Each row is encoded
//! in memory, written with a single `write_all` and synced before `append`
//! returns, so a crash can only ever leave a torn final line. Reopening the
//! file cuts such a line off before anything new is appended.

use crate::error::{Result, SweepError};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Encodes one newline-terminated CSV record.
fn encode_record<I, S>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| SweepError::Io(e.into_error()))
}

/// Result table at a fixed path.
#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    file: File,
    header: Vec<String>,
    existing_rows: usize,
    appended_rows: usize,
}

impl ResultSink {
    /// Opens `path` for appending. A new or empty file gets `header`; an
    /// existing file must already carry exactly the same header.
    pub fn open<P: AsRef<Path>>(path: P, header: Vec<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SweepError::sink(&path, e))?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| SweepError::sink(&path, e))?;

        let content = fs::read(&path).map_err(|e| SweepError::sink(&path, e))?;

        // Drop a torn final row left behind by a crash
        let intact = content
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        if intact < content.len() {
            tracing::warn!(
                "{}: dropping {} bytes of incomplete trailing row",
                path.display(),
                content.len() - intact
            );
            file.set_len(intact as u64)
                .map_err(|e| SweepError::sink(&path, e))?;
        }

        let existing_rows = if intact == 0 {
            let bytes = encode_record(&header)?;
            file.write_all(&bytes)
                .and_then(|_| file.sync_data())
                .map_err(|e| SweepError::sink(&path, e))?;
            0
        } else {
            check_header(&path, &content[..intact], &header)?
        };

        Ok(ResultSink {
            path,
            file,
            header,
            existing_rows,
            appended_rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Complete data rows found in the file when it was opened.
    pub fn existing_rows(&self) -> usize {
        self.existing_rows
    }

    /// Rows appended through this handle.
    pub fn appended_rows(&self) -> usize {
        self.appended_rows
    }

    /// Appends one row and syncs it to disk.
    pub fn append(&mut self, row: &[String]) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(SweepError::RowShape {
                expected: self.header.len(),
                found: row.len(),
            });
        }

        let bytes = encode_record(row)?;
        self.file
            .write_all(&bytes)
            .and_then(|_| self.file.sync_data())
            .map_err(|e| SweepError::sink(&self.path, e))?;
        self.appended_rows += 1;
        Ok(())
    }
}

/// Verifies the first record against `expected`, returning the number of
/// data rows after it.
fn check_header(path: &Path, content: &[u8], expected: &[String]) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut records = reader.records();

    let found: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => Vec::new(),
    };
    if found != expected {
        return Err(SweepError::HeaderMismatch {
            path: path.to_path_buf(),
            found,
            expected: expected.to_vec(),
        });
    }

    let mut rows = 0;
    for record in records {
        record?;
        rows += 1;
    }
    Ok(rows)
}
