// Row expansion
//
// One parsed metric becomes one row per index-worthy tag. Every row of a
// metric shares Date, Path, Tags, Version and the dedicated columns; only the
// Name column differs.
//
// Row layout (RowBinary):
//   Date UInt16 | Name String | Path String | Tags Array(String) | Version UInt32
//   | one String per dedicated column

use std::ops::Range;

use super::routing::{DedicatedTags, IgnoredMetrics};
use super::tags::{ParsedMetric, NAME_TAG};
use crate::rowbinary::{uvarint_len, WriteBuffer};

/// What one `encode` call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedMetric {
    /// Rows written into the output buffer.
    pub rows: usize,
    /// Generic tags in the blob, `__name__` included.
    pub tag_count: usize,
}

/// Expands parsed metrics into rows.
///
/// Holds scratch state reused across metrics; one encoder per processing pass.
#[derive(Debug)]
pub struct RowEncoder<'cfg> {
    dedicated: &'cfg DedicatedTags,
    ignored: &'cfg IgnoredMetrics,
    // Spans of `name=value` payloads inside the tags buffer.
    index_tags: Vec<Range<usize>>,
    extra_values: Vec<String>,
}

impl<'cfg> RowEncoder<'cfg> {
    pub fn new(dedicated: &'cfg DedicatedTags, ignored: &'cfg IgnoredMetrics) -> Self {
        Self {
            dedicated,
            ignored,
            index_tags: Vec::with_capacity(16),
            extra_values: vec![String::new(); dedicated.len()],
        }
    }

    /// Encode all rows of `metric` into `out`, replacing its contents.
    ///
    /// `tags` is scratch space for the shared tag blob and is also reset.
    pub fn encode(
        &mut self,
        out: &mut WriteBuffer,
        tags: &mut WriteBuffer,
        metric: &ParsedMetric<'_>,
        raw_path: &[u8],
        days: u16,
        version: u32,
    ) -> EncodedMetric {
        out.reset();
        tags.reset();
        self.index_tags.clear();
        for value in &mut self.extra_values {
            value.clear();
        }

        self.index_tags.push(push_tag(tags, NAME_TAG, &metric.path));
        let mut tag_count = 1;

        let name_only = self.ignored.index_name_only(&metric.path);
        for (key, value) in &metric.tags {
            if let Some(slot) = self.dedicated.classify(key) {
                self.extra_values[slot].push_str(value);
                continue;
            }

            let span = push_tag(tags, key, value);
            tag_count += 1;
            if !name_only {
                self.index_tags.push(span);
            }
        }

        let blob = tags.as_bytes();
        for span in &self.index_tags {
            out.write_u16(days);
            out.write_bytes(&blob[span.clone()]);
            out.write_bytes(raw_path);
            out.write_uvarint(tag_count as u64);
            out.write_raw(blob);
            out.write_u32(version);
            for value in &self.extra_values {
                out.write_string(value);
            }
        }

        EncodedMetric {
            rows: self.index_tags.len(),
            tag_count,
        }
    }
}

// Appends a length-prefixed `key=value` and returns the span of its payload.
fn push_tag(tags: &mut WriteBuffer, key: &str, value: &str) -> Range<usize> {
    let payload_len = key.len() + 1 + value.len();
    let start = tags.len() + uvarint_len(payload_len as u64);
    tags.write_key_value(key, value);
    start..tags.len()
}
