// Decoded view of an output row, for consumers that read the bulk-load blob
// back (verification tooling, tests).

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ReadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub days: u16,
    /// `name=value` this row indexes.
    pub name: String,
    /// Original identifier bytes.
    pub path: Vec<u8>,
    /// Every generic tag, `__name__` first.
    pub tags: Vec<String>,
    pub version: u32,
    /// One value per dedicated column, in column order.
    pub extra: Vec<String>,
}

impl OutputRow {
    /// Decode every row in `bytes`. `extra_columns` must match the encoder's
    /// dedicated column count.
    pub fn decode_all(bytes: &[u8], extra_columns: usize) -> Result<Vec<OutputRow>, ReadError> {
        let mut cursor = Cursor::new(bytes);
        let mut rows = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            let offset = cursor.position();
            let row = Self::decode(&mut cursor, extra_columns).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    ReadError::Corrupted {
                        offset,
                        reason: "truncated row".to_string(),
                    }
                } else {
                    ReadError::Io(e)
                }
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn decode<R: Read>(input: &mut R, extra_columns: usize) -> io::Result<OutputRow> {
        let days = input.read_u16::<LittleEndian>()?;
        let name = read_string(input)?;
        let path = read_bytes(input)?;

        let tag_count = read_uvarint(input)?;
        let mut tags = Vec::with_capacity(tag_count.min(1024) as usize);
        for _ in 0..tag_count {
            tags.push(read_string(input)?);
        }

        let version = input.read_u32::<LittleEndian>()?;

        let mut extra = Vec::with_capacity(extra_columns);
        for _ in 0..extra_columns {
            extra.push(read_string(input)?);
        }

        Ok(OutputRow {
            days,
            name,
            path,
            tags,
            version,
            extra,
        })
    }
}

fn read_uvarint<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = input.read_u8()?;
        value |= u64::from(byte & 0x7f) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "uvarint overflow"))
}

fn read_bytes<R: Read>(input: &mut R) -> io::Result<Vec<u8>> {
    let len = read_uvarint(input)? as usize;
    let mut bytes = Vec::new();
    input.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(bytes)
}

fn read_string<R: Read>(input: &mut R) -> io::Result<String> {
    String::from_utf8(read_bytes(input)?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
