//! Cache log reader
//!
//! Reads framed records from a cache log file in order.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, SyncError};

use super::entry::{check_file_header, FILE_HEADER_SIZE, HEADER_SIZE};
use super::LogRecord;

/// Outcome of reading the next record
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// A complete, checksummed record
    Record(LogRecord),

    /// Clean end of file at a record boundary
    End,

    /// The file ends inside a record (partial write)
    Torn,

    /// A complete record failed verification
    Corrupt(String),
}

/// Reads records from a cache log file
pub struct CacheReader {
    reader: BufReader<File>,

    /// Offset just past the last record read successfully
    position: u64,

    /// Total file length at open time
    file_len: u64,
}

impl CacheReader {
    /// Open a cache log for reading
    ///
    /// A file shorter than the file header is treated as a torn header and
    /// yields no records. A wrong magic or version is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let position = if file_len >= FILE_HEADER_SIZE as u64 {
            let mut header = [0u8; FILE_HEADER_SIZE];
            reader.read_exact(&mut header)?;
            check_file_header(&header)?;
            FILE_HEADER_SIZE as u64
        } else {
            // Nothing past the header to read; position stays at 0
            0
        };

        Ok(Self {
            reader,
            position,
            file_len,
        })
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at a clean end of file. A partial or corrupted
    /// record is reported as `CacheCorruption`.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        match self.read_next()? {
            ReadOutcome::Record(record) => Ok(Some(record)),
            ReadOutcome::End => Ok(None),
            ReadOutcome::Torn => Err(SyncError::CacheCorruption(format!(
                "Truncated record at offset {}",
                self.position
            ))),
            ReadOutcome::Corrupt(reason) => Err(SyncError::CacheCorruption(reason)),
        }
    }

    /// Iterate over all records, stopping after the first error
    pub fn records(self) -> CacheIterator {
        CacheIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last good record
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub(crate) fn read_next(&mut self) -> Result<ReadOutcome> {
        if self.position < FILE_HEADER_SIZE as u64 {
            return Ok(if self.file_len == 0 {
                ReadOutcome::End
            } else {
                ReadOutcome::Torn
            });
        }

        let mut header = [0u8; HEADER_SIZE];
        match read_fully(&mut self.reader, &mut header)? {
            0 => return Ok(ReadOutcome::End),
            n if n < HEADER_SIZE => return Ok(ReadOutcome::Torn),
            _ => {}
        }

        let (seq, crc, len) = match LogRecord::parse_header(&header) {
            Ok(parts) => parts,
            Err(e) => return Ok(ReadOutcome::Corrupt(e.to_string())),
        };

        let mut data = vec![0u8; len as usize];
        if read_fully(&mut self.reader, &mut data)? < data.len() {
            return Ok(ReadOutcome::Torn);
        }

        match LogRecord::decode_payload(seq, crc, &data) {
            Ok(record) => {
                self.position += (HEADER_SIZE + data.len()) as u64;
                Ok(ReadOutcome::Record(record))
            }
            Err(e) => Ok(ReadOutcome::Corrupt(e.to_string())),
        }
    }
}

/// Read until `buf` is full or EOF, returning the number of bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Iterator over cache log records
pub struct CacheIterator {
    reader: CacheReader,
    done: bool,
}

impl Iterator for CacheIterator {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
