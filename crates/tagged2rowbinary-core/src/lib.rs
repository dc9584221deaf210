// tagged2rowbinary-core - Tagged metric parsing and row expansion
//
// Reads the point files written by the metrics collection agent and turns
// every tagged identifier (`path?tag=value&...`) into RowBinary rows for the
// tagged index table, one row per indexable tag.
//
// Synchronous. Configuration arrives as immutable values; the existence cache
// is reached through the `ExistsCache` trait.

pub mod dedup;
pub mod error;
pub mod rowbinary;
pub mod tagged;

pub use dedup::{dedup_key, DedupGate, ExistsCache, NoCache};
pub use error::{ErrorCode, ReadError, Result, TagError, TaggedError};
pub use rowbinary::{BufferPool, RecordReader, WriteBuffer};
pub use tagged::{
    current_version, DedicatedTags, IgnoredMetrics, OutputRow, ParseSummary, ParsedMetric,
    TaggedParser,
};
