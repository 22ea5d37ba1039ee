//! Mempool-backed writers for the value-buffer wire format.
//!
//! Each writer accumulates its value array into a single growing buffer
//! (packed numerics: the raw item bytes only; string/bytes/fixed-length:
//! each item's own tag+length+data, already concatenated) and assembles the
//! final `Kind` tag, value-array section and null bitmap at [`ValueWriter::finish`].
//!
//! This is a two-phase assemble (accumulate, then wrap with tag+length)
//! rather than the original's in-place running length-prefix patch: a
//! `Vec<u8>` naturally supports "append, then read back the final length"
//! without the raw-pointer backpatching the original needs to avoid
//! reallocation. The mempool is still used as the per-item scratch area the
//! caller's closures write into, preserving the "reuse the unused tail"
//! discipline for variable-length items.

use crate::kind::{Kind, WireShape, KIND_TAG};
use crate::mempool::Mempool;
use crate::nulls::NullBitmapWriter;
use crate::varint::{write_varint_u32, write_varint_u64_into};
use dq_core::{DqError, DqResult};

/// Worst-case bytes a base-128 varint needs to represent a value with this
/// many bits.
const fn max_varint_len(bits: u32) -> usize {
    ((bits as usize) + 6) / 7
}

pub struct ValueWriter {
    kind: Kind,
    mempool: Mempool,
    items: Vec<u8>,
    nulls: NullBitmapWriter,
    count: usize,
}

impl ValueWriter {
    pub fn new(kind: Kind, estimated_item_count: usize) -> Self {
        let estimated_item_count = estimated_item_count.max(1);
        Self {
            kind,
            mempool: Mempool::new(estimated_item_count * 16),
            items: Vec::new(),
            nulls: NullBitmapWriter::default(),
            count: 0,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn expect_shape(&self, want: WireShape) -> DqResult<()> {
        if self.kind.wire_shape() == want {
            Ok(())
        } else {
            Err(DqError::parse_failure(format!(
                "write call does not match writer kind {:?}",
                self.kind
            )))
        }
    }

    fn append_packed_varint(&mut self, v: u64, max_bytes: usize) {
        let scratch = self.mempool.allocate(max_bytes);
        let used = write_varint_u64_into(v, scratch);
        self.items.extend_from_slice(&scratch[..used]);
        self.mempool.reuse(max_bytes - used);
        self.count += 1;
    }

    fn append_packed_raw(&mut self, bytes: &[u8]) {
        let scratch = self.mempool.allocate(bytes.len());
        scratch.copy_from_slice(bytes);
        self.items.extend_from_slice(scratch);
        self.count += 1;
    }

    pub fn write_int32(&mut self, v: i32) -> DqResult<()> {
        self.expect_shape(WireShape::Int32)?;
        self.append_packed_varint(v as u32 as u64, max_varint_len(32));
        Ok(())
    }

    pub fn write_int64(&mut self, v: i64) -> DqResult<()> {
        self.expect_shape(WireShape::Int64)?;
        self.append_packed_varint(v as u64, max_varint_len(64));
        Ok(())
    }

    pub fn write_uint32(&mut self, v: u32) -> DqResult<()> {
        self.expect_shape(WireShape::Uint32)?;
        self.append_packed_varint(v as u64, max_varint_len(32));
        Ok(())
    }

    pub fn write_uint64(&mut self, v: u64) -> DqResult<()> {
        self.expect_shape(WireShape::Uint64)?;
        self.append_packed_varint(v, max_varint_len(64));
        Ok(())
    }

    pub fn write_double(&mut self, v: f64) -> DqResult<()> {
        self.expect_shape(WireShape::Double)?;
        self.append_packed_raw(&v.to_le_bytes());
        Ok(())
    }

    pub fn write_float(&mut self, v: f32) -> DqResult<()> {
        self.expect_shape(WireShape::Float)?;
        self.append_packed_raw(&v.to_le_bytes());
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> DqResult<()> {
        self.expect_shape(WireShape::Bool)?;
        self.append_packed_varint(if v { 1 } else { 0 }, 1);
        Ok(())
    }

    /// Write a string item. `fun` receives a scratch buffer of `desired_size`
    /// bytes and returns how many of them it actually used.
    pub fn write_string(
        &mut self,
        desired_size: usize,
        fun: impl FnOnce(&mut [u8]) -> usize,
    ) -> DqResult<()> {
        self.expect_shape(WireShape::String)?;
        self.write_length_delimited_item(self.kind.wire_shape().field_tag(), desired_size, fun);
        Ok(())
    }

    /// Write a bytes item, same contract as [`ValueWriter::write_string`].
    pub fn write_bytes(
        &mut self,
        desired_size: usize,
        fun: impl FnOnce(&mut [u8]) -> usize,
    ) -> DqResult<()> {
        self.expect_shape(WireShape::Bytes)?;
        self.write_length_delimited_item(self.kind.wire_shape().field_tag(), desired_size, fun);
        Ok(())
    }

    /// Write a fixed-length item (date: 8 bytes, time: 6 bytes). `fun`
    /// receives a scratch buffer of the kind's fixed length and returns how
    /// many bytes it actually used (clamped to that length).
    pub fn write_fixlen(&mut self, fun: impl FnOnce(&mut [u8]) -> usize) -> DqResult<()> {
        let max_len = match self.kind.wire_shape() {
            WireShape::FixedLen(len) => len,
            _ => {
                return Err(DqError::parse_failure(format!(
                    "write_fixlen does not match writer kind {:?}",
                    self.kind
                )))
            }
        };
        let tag = self.kind.wire_shape().field_tag();
        let scratch = self.mempool.allocate(max_len);
        let used = fun(scratch).min(max_len);
        let mut data = vec![0u8; used];
        data.copy_from_slice(&scratch[..used]);
        self.mempool.reuse(max_len - used);

        write_varint_u32(tag, &mut self.items);
        self.items.push(used as u8);
        self.items.extend_from_slice(&data);
        self.count += 1;
        Ok(())
    }

    fn write_length_delimited_item(
        &mut self,
        tag: u32,
        desired_size: usize,
        fun: impl FnOnce(&mut [u8]) -> usize,
    ) {
        let scratch = self.mempool.allocate(desired_size);
        let used = fun(scratch).min(desired_size);
        let mut data = vec![0u8; used];
        data.copy_from_slice(&scratch[..used]);
        self.mempool.reuse(desired_size - used);

        write_varint_u32(tag, &mut self.items);
        write_varint_u32(used as u32, &mut self.items);
        self.items.extend_from_slice(&data);
        self.count += 1;
    }

    /// Mark item `pos` as null. Safe to call before or after the item at
    /// that position has been written.
    pub fn set_null(&mut self, pos: usize) {
        self.nulls.set_null(pos);
    }

    /// Assemble the final wire buffer: `Kind` tag, value-array section,
    /// then the null bitmap.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.items.len() + 32);
        write_varint_u32(KIND_TAG, &mut out);
        write_varint_u32(self.kind.as_u32(), &mut out);

        match self.kind.wire_shape() {
            WireShape::Int32
            | WireShape::Int64
            | WireShape::Uint32
            | WireShape::Uint64
            | WireShape::Double
            | WireShape::Float
            | WireShape::Bool => {
                write_varint_u32(self.kind.wire_shape().field_tag(), &mut out);
                write_varint_u32(self.items.len() as u32, &mut out);
                out.extend_from_slice(&self.items);
            }
            WireShape::String | WireShape::Bytes | WireShape::FixedLen(_) => {
                out.extend_from_slice(&self.items);
            }
        }

        self.nulls.write_to(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ValueReader;

    #[test]
    fn packed_int32_with_null_round_trips() {
        // Scenario E: [1, -2, 3] with a null at index 1.
        let mut w = ValueWriter::new(Kind::Int32, 3);
        w.write_int32(1).unwrap();
        w.write_int32(-2).unwrap();
        w.write_int32(3).unwrap();
        w.set_null(1);
        let buf = w.finish();

        let mut r = ValueReader::parse(&buf).unwrap();
        assert_eq!(r.kind(), Kind::Int32);
        let (v0, n0) = r.read_int32().unwrap();
        let (_v1, n1) = r.read_int32().unwrap();
        let (v2, n2) = r.read_int32().unwrap();
        assert_eq!((v0, n0), (1, false));
        assert!(n1);
        assert_eq!((v2, n2), (3, false));
    }

    #[test]
    fn string_items_round_trip() {
        let mut w = ValueWriter::new(Kind::String, 2);
        w.write_string(5, |buf| {
            buf[..5].copy_from_slice(b"hello");
            5
        })
        .unwrap();
        w.write_string(3, |buf| {
            buf[..3].copy_from_slice(b"hi!");
            3
        })
        .unwrap();
        let buf = w.finish();

        let mut r = ValueReader::parse(&buf).unwrap();
        let (s0, n0) = r.read_string().unwrap();
        let (s1, n1) = r.read_string().unwrap();
        assert_eq!(s0, "hello");
        assert!(!n0);
        assert_eq!(s1, "hi!");
        assert!(!n1);
    }

    #[test]
    fn fixlen_date_items_round_trip() {
        let mut w = ValueWriter::new(Kind::Date, 1);
        w.write_fixlen(|buf| {
            buf[..8].copy_from_slice(b"20260728");
            8
        })
        .unwrap();
        let buf = w.finish();

        let mut r = ValueReader::parse(&buf).unwrap();
        let (s, n) = r.read_string().unwrap();
        assert_eq!(s, "20260728");
        assert!(!n);
    }

    #[test]
    fn mismatched_write_call_is_rejected() {
        let mut w = ValueWriter::new(Kind::Int32, 1);
        assert!(w.write_string(4, |_| 0).is_err());
    }

    #[test]
    fn empty_writer_has_no_items_and_no_nulls() {
        let w = ValueWriter::new(Kind::Bool, 0);
        assert!(w.is_empty());
        let buf = w.finish();
        let r = ValueReader::parse(&buf).unwrap();
        assert_eq!(r.n_nulls(), 0);
    }
}
