//! CSV file sink
//!
//! Writes the reconciled row set to a comma-separated file.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

use super::{SinkRow, TabularSink};

/// Sink backed by a single CSV file
///
/// `replace` writes `<path>.tmp`, fsyncs it and renames it over `path`, so
/// readers see either the previous pass or the new one.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_all(&self, rows: &[SinkRow]) -> std::io::Result<()> {
        let tmp_path = self.tmp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for row in rows {
                writeln!(writer, "{}", row)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)
    }
}

impl TabularSink for CsvSink {
    fn load(&self) -> Result<Vec<SinkRow>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            rows.push(SinkRow::parse(&line)?);
        }
        Ok(rows)
    }

    fn replace(&self, rows: &[SinkRow]) -> Result<()> {
        self.write_all(rows).map_err(|e| {
            let _ = fs::remove_file(self.tmp_path());
            SyncError::SinkWrite(format!("{}: {}", self.path.display(), e))
        })
    }
}
