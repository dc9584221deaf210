// Point record encoder
//
// Inverse of `RecordReader`. The agent writes these files; tests, benches and
// fixture tooling need to produce them too.

use std::io::{self, Write};

use super::WriteBuffer;

const SECONDS_PER_DAY: u32 = 86_400;

/// One point record as stored in an agent file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<'a> {
    pub path: &'a [u8],
    pub value: f64,
    pub timestamp: u32,
    pub days: u16,
    pub version: u32,
}

impl<'a> Point<'a> {
    /// Point stamped at `timestamp`, with the day bucket derived from it.
    pub fn at(path: &'a str, value: f64, timestamp: u32) -> Self {
        Self {
            path: path.as_bytes(),
            value,
            timestamp,
            days: timestamp_to_days(timestamp),
            version: timestamp,
        }
    }
}

/// UTC days since 1970-01-01.
pub fn timestamp_to_days(timestamp: u32) -> u16 {
    (timestamp / SECONDS_PER_DAY) as u16
}

pub fn encode_point(buf: &mut WriteBuffer, point: &Point<'_>) {
    buf.write_bytes(point.path);
    buf.write_f64(point.value);
    buf.write_u32(point.timestamp);
    buf.write_u16(point.days);
    buf.write_u32(point.version);
}

/// Streams encoded points into any writer.
#[derive(Debug)]
pub struct PointWriter<W: Write> {
    inner: W,
    buf: WriteBuffer,
    written: u64,
}

impl<W: Write> PointWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: WriteBuffer::with_capacity(256),
            written: 0,
        }
    }

    pub fn write(&mut self, point: &Point<'_>) -> io::Result<()> {
        self.buf.reset();
        encode_point(&mut self.buf, point);
        self.inner.write_all(self.buf.as_bytes())?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_days() {
        assert_eq!(timestamp_to_days(0), 0);
        assert_eq!(timestamp_to_days(86_399), 0);
        assert_eq!(timestamp_to_days(86_400), 1);
        // 2023-11-14T22:13:20Z
        assert_eq!(timestamp_to_days(1_700_000_000), 19_675);
    }

    #[test]
    fn test_point_layout() {
        let mut buf = WriteBuffer::new();
        encode_point(
            &mut buf,
            &Point {
                path: b"a",
                value: 1.5,
                timestamp: 1,
                days: 2,
                version: 3,
            },
        );
        let bytes = buf.as_bytes();
        assert_eq!(bytes.len(), 1 + 1 + 8 + 4 + 2 + 4);
        assert_eq!(&bytes[..2], &[1, b'a']);
        assert_eq!(&bytes[2..10], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[14..16], &[2, 0]);
    }

    #[test]
    fn test_point_writer_counts() {
        let mut writer = PointWriter::new(Vec::new());
        writer.write(&Point::at("a.b?c=d", 1.0, 100)).unwrap();
        writer.write(&Point::at("e.f", 2.0, 200)).unwrap();
        assert_eq!(writer.written(), 2);
        let bytes = writer.finish().unwrap();
        assert!(!bytes.is_empty());
    }
}
