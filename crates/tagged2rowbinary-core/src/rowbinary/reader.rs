// Point record reader
//
// Decodes the agent's point files one record at a time:
//   Path String, Value Float64, Time UInt32, Date UInt16, Timestamp UInt32
// Clean EOF on a record boundary ends iteration normally; anything else that
// stops decoding is reported as corruption and also ends iteration.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ReadError;

/// Upper bound on a single Path length prefix. Anything larger is treated as
/// a corrupted length rather than allocated.
pub const MAX_RECORD_LEN: usize = 1024 * 1024;

const READ_BUFFER_SIZE: usize = 1024 * 1024;
const MAX_UVARINT_BYTES: usize = 10;

/// Sequential reader over point records.
///
/// `read_record` hands out a borrow of an internal buffer that is reused for
/// the next record, so callers copy whatever they need to keep.
#[derive(Debug)]
pub struct RecordReader<R: Read> {
    inner: BufReader<R>,
    name: Vec<u8>,
    value: f64,
    timestamp: u32,
    days: u16,
    version: u32,
    offset: u64,
    records: u64,
}

impl RecordReader<File> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, inner),
            name: Vec::with_capacity(256),
            value: 0.0,
            timestamp: 0,
            days: 0,
            version: 0,
            offset: 0,
            records: 0,
        }
    }

    /// Decode the next record and return its Path bytes.
    pub fn read_record(&mut self) -> Result<&[u8], ReadError> {
        self.next_record()?;
        Ok(&self.name)
    }

    /// Decode the next record without borrowing it, so `name()` and `days()`
    /// can be read side by side.
    pub fn next_record(&mut self) -> Result<(), ReadError> {
        let start = self.offset;

        let (len, prefix_len) = match self.read_uvarint(start)? {
            Some(decoded) => decoded,
            None => return Err(ReadError::EndOfInput),
        };
        if len > MAX_RECORD_LEN as u64 {
            return Err(corrupted(start, format!("path length {} exceeds limit", len)));
        }

        let len = len as usize;
        self.name.resize(len, 0);
        self.inner
            .read_exact(&mut self.name)
            .map_err(|e| truncated(e, start, "path"))?;

        let value = self
            .inner
            .read_f64::<LittleEndian>()
            .map_err(|e| truncated(e, start, "value"))?;
        let timestamp = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, start, "time"))?;
        let days = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|e| truncated(e, start, "date"))?;
        let version = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, start, "timestamp"))?;

        self.offset += (prefix_len + len + 8 + 4 + 2 + 4) as u64;
        self.value = value;
        self.timestamp = timestamp;
        self.days = days;
        self.version = version;
        self.records += 1;

        Ok(())
    }

    /// Path bytes of the most recently decoded record.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Day bucket of the most recently returned record.
    pub fn days(&self) -> u16 {
        self.days
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Records successfully decoded so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Byte offset just past the last good record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    // Returns the value and its encoded width. `Ok(None)` only when the source
    // ends before the first byte.
    fn read_uvarint(&mut self, start: u64) -> Result<Option<(u64, usize)>, ReadError> {
        let mut value = 0u64;
        for i in 0..MAX_UVARINT_BYTES {
            let byte = match self.inner.read_u8() {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && i == 0 => {
                    return Ok(None);
                }
                Err(e) => return Err(truncated(e, start, "path length")),
            };
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                return Ok(Some((value, i + 1)));
            }
        }
        Err(corrupted(start, "path length varint overflows u64".to_string()))
    }
}

fn corrupted(offset: u64, reason: String) -> ReadError {
    ReadError::Corrupted { offset, reason }
}

fn truncated(err: io::Error, offset: u64, field: &str) -> ReadError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        corrupted(offset, format!("truncated {}", field))
    } else {
        ReadError::Io(err)
    }
}
