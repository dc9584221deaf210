// RowBinary codec: point records in, bulk-load rows out

mod points;
mod pool;
mod reader;
mod writer;

pub use points::{encode_point, timestamp_to_days, Point, PointWriter};
pub use pool::{BufferPool, PooledBuffer, MAX_POOLED_CAPACITY};
pub use reader::{RecordReader, MAX_RECORD_LEN};
pub use writer::{uvarint_len, WriteBuffer};
