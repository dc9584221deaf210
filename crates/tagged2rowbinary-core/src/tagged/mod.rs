// Tagged metric pipeline
//
// Per record: filter -> dedup gate -> tag parser -> router -> row encoder ->
// one write of the metric's rows to the output sink.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::dedup::{DedupGate, ExistsCache};
use crate::error::{ReadError, Result, TaggedError};
use crate::rowbinary::{BufferPool, RecordReader};

mod encoder;
pub mod filter;
mod routing;
mod row;
mod tags;

pub use encoder::{EncodedMetric, RowEncoder};
pub use filter::{check_identifier, Rejection, MAX_IDENTIFIER_LEN};
pub use routing::{DedicatedTags, IgnoredMetrics, IGNORE_ALL};
pub use row::OutputRow;
pub use tags::{parse, ParsedMetric, NAME_TAG};

/// Fixed leading columns of the tagged table, in row order.
pub const BASE_COLUMNS: [&str; 5] = ["Date", "Name", "Path", "Tags", "Version"];

/// Outcome of one file pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseSummary {
    /// `"<day>:<identifier>"` keys admitted in this pass. Merge into the
    /// existence cache after the output is durable.
    pub new_keys: HashSet<String>,
    pub records_read: usize,
    pub metrics_written: usize,
    pub rows_written: usize,
    pub skipped_plain: usize,
    pub skipped_malformed: usize,
    pub skipped_duplicate: usize,
    /// Iteration stopped at an unreadable tail rather than a clean end.
    pub truncated: bool,
}

/// Converts point files into tagged-table rows.
///
/// Immutable after construction and safe to share between threads; each call
/// checks out its own scratch buffers.
#[derive(Debug)]
pub struct TaggedParser {
    dedicated: DedicatedTags,
    ignored: IgnoredMetrics,
    query: String,
    pool: Arc<BufferPool>,
}

impl TaggedParser {
    pub fn new(table: &str, dedicated: DedicatedTags, ignored: IgnoredMetrics) -> Self {
        let query = insert_query(table, &dedicated);
        Self {
            dedicated,
            ignored,
            query,
            pool: BufferPool::global(),
        }
    }

    /// Use a dedicated buffer pool instead of the process-wide one.
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    /// `<table> (Date, Name, Path, Tags, Version[, dedicated columns...])`
    pub fn insert_query(&self) -> &str {
        &self.query
    }

    pub fn dedicated(&self) -> &DedicatedTags {
        &self.dedicated
    }

    pub fn ignored(&self) -> &IgnoredMetrics {
        &self.ignored
    }

    /// Process one point file, writing rows to `out`.
    ///
    /// On `Err`, rows already written to `out` stay there.
    pub fn parse_file<C, W>(&self, path: &Path, cache: &C, out: &mut W) -> Result<ParseSummary>
    where
        C: ExistsCache + ?Sized,
        W: Write,
    {
        let mut reader = RecordReader::open(path).map_err(|source| TaggedError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let summary = self.parse_records(&mut reader, cache, out, current_version())?;
        info!(
            file = %path.display(),
            records = summary.records_read,
            metrics = summary.metrics_written,
            rows = summary.rows_written,
            duplicates = summary.skipped_duplicate,
            malformed = summary.skipped_malformed,
            truncated = summary.truncated,
            "parsed tagged file"
        );
        Ok(summary)
    }

    /// Process every record `reader` yields. All rows carry `version`.
    pub fn parse_records<R, C, W>(
        &self,
        reader: &mut RecordReader<R>,
        cache: &C,
        out: &mut W,
        version: u32,
    ) -> Result<ParseSummary>
    where
        R: Read,
        C: ExistsCache + ?Sized,
        W: Write,
    {
        let mut rows = self.pool.acquire();
        let mut tags = self.pool.acquire();
        let mut encoder = RowEncoder::new(&self.dedicated, &self.ignored);
        let mut gate = DedupGate::new(cache);
        let mut summary = ParseSummary::default();

        loop {
            match reader.next_record() {
                Ok(()) => {}
                Err(ReadError::EndOfInput) => break,
                Err(err) => {
                    warn!(
                        error = %err,
                        records = reader.records_read(),
                        "stopping at unreadable input tail"
                    );
                    summary.truncated = true;
                    break;
                }
            }
            summary.records_read += 1;

            let raw = reader.name();
            let days = reader.days();

            if !raw.contains(&b'?') {
                summary.skipped_plain += 1;
                continue;
            }

            let Some(identifier) = filter::admit(raw) else {
                summary.skipped_malformed += 1;
                continue;
            };

            if !gate.should_process(days, identifier) {
                summary.skipped_duplicate += 1;
                continue;
            }

            let metric = match tags::parse(identifier) {
                Ok(metric) => metric,
                Err(err) => {
                    warn!(target: "tagged::malformed", error = %err, "skipping unparsable identifier");
                    summary.skipped_malformed += 1;
                    continue;
                }
            };

            let encoded = encoder.encode(&mut rows, &mut tags, &metric, raw, days, version);

            out.write_all(rows.as_bytes())
                .map_err(|source| TaggedError::Sink {
                    metrics_written: summary.metrics_written,
                    source,
                })?;

            summary.metrics_written += 1;
            summary.rows_written += encoded.rows;
        }

        summary.new_keys = gate.into_seen();
        Ok(summary)
    }
}

fn insert_query(table: &str, dedicated: &DedicatedTags) -> String {
    let columns: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .chain(dedicated.columns().iter().map(String::as_str))
        .collect();
    format!("{} ({})", table, columns.join(", "))
}

/// Wall-clock seconds, truncated to the 32-bit Version column.
pub fn current_version() -> u32 {
    chrono::Utc::now().timestamp() as u32
}
