//! A length-delimited, field-tagged wire codec for typed value buffers: a
//! `Kind` tag, a value array (packed varints/raw bytes for numerics,
//! repeated length-prefixed items for strings/bytes/fixed-length values),
//! and a packed null bitmap.

mod kind;
mod mempool;
mod nulls;
mod reader;
mod varint;
mod writer;

pub use kind::Kind;
pub use mempool::Mempool;
pub use nulls::NullBitmap;
pub use reader::ValueReader;
pub use writer::ValueWriter;
