// RowBinary output primitives
//
// ClickHouse RowBinary: fixed-width integers are little-endian, strings and
// arrays carry an unsigned LEB128 length prefix, nothing is null-terminated.

use std::io::{self, Write};

/// Growable byte buffer with RowBinary field writers.
///
/// Writes into a `Vec<u8>` cannot fail, so the writers return nothing.
#[derive(Debug, Default, Clone)]
pub struct WriteBuffer {
    body: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            body: Vec::with_capacity(capacity),
        }
    }

    /// Clear contents, keeping the allocation.
    pub fn reset(&mut self) {
        self.body.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.body.capacity()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.body.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_uvarint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.body.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.body.push(value as u8);
    }

    /// Length-prefixed bytes (RowBinary `String`).
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_uvarint(value.len() as u64);
        self.body.extend_from_slice(value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Length-prefixed `key=value` without building the joined string first.
    pub fn write_key_value(&mut self, key: &str, value: &str) {
        self.write_uvarint((key.len() + 1 + value.len()) as u64);
        self.body.extend_from_slice(key.as_bytes());
        self.body.push(b'=');
        self.body.extend_from_slice(value.as_bytes());
    }

    /// Raw bytes, no length prefix.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.body.extend_from_slice(value);
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Number of bytes `write_uvarint` emits for `value`.
pub fn uvarint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
