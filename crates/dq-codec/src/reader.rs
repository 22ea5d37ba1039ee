//! Zero-copy readers for the value-buffer wire format.
//!
//! Construction parses the `Kind` field and the null bitmap eagerly (the
//! bitmap has to be known up front so `read_null()` can answer from the
//! first call), then leaves a cursor positioned at the start of the value
//! array. Packed numeric reads consume sequentially from a payload range
//! fixed at construction; string/bytes/fixed-length reads walk repeated
//! tag+length+data items, stopping the moment the next tag no longer
//! matches the expected field number.

use crate::kind::{Kind, WireShape, KIND_TAG, NULLS_TAG};
use crate::nulls::NullBitmap;
use crate::varint::{read_varint_u32, read_varint_u64};
use dq_core::{DqError, DqResult};

pub struct ValueReader<'a> {
    buf: &'a [u8],
    kind: Kind,
    shape: WireShape,
    /// Packed shapes: cursor into the payload range, bounded by `end`.
    cursor: usize,
    end: usize,
    /// Repeated shapes (string/bytes/fixed-length): the tag already read
    /// for the next pending item, or `None` once the sequence has ended.
    pending_tag: Option<u32>,
    nulls: NullBitmap,
}

fn peek_tag(buf: &[u8], pos: usize) -> DqResult<Option<(u32, usize)>> {
    if pos >= buf.len() {
        return Ok(None);
    }
    let mut p = pos;
    let tag = read_varint_u32(buf, &mut p)?;
    Ok(Some((tag, p)))
}

impl<'a> ValueReader<'a> {
    pub fn parse(buf: &'a [u8]) -> DqResult<Self> {
        let mut pos = 0usize;
        let tag = read_varint_u32(buf, &mut pos)?;
        if tag != KIND_TAG {
            log::debug!("value buffer does not start with a Kind tag: got {}", tag);
            return Err(DqError::parse_failure("expected Kind field tag first"));
        }
        let kind_val = read_varint_u32(buf, &mut pos)?;
        let kind = Kind::from_u32(kind_val)?;
        let shape = kind.wire_shape();
        let expected_tag = shape.field_tag();

        let mut nulls = NullBitmap::empty();
        let mut cursor = 0usize;
        let mut end = 0usize;
        let mut pending_tag = None;

        if let Some((tag, after_tag)) = peek_tag(buf, pos)? {
            if tag == NULLS_TAG {
                let mut p = after_tag;
                nulls = NullBitmap::parse(buf, &mut p)?;
                // our own writer never emits nulls before the value section,
                // but stay defensive: no items precede it in that layout.
            } else if tag == expected_tag {
                match shape {
                    WireShape::Int32
                    | WireShape::Int64
                    | WireShape::Uint32
                    | WireShape::Uint64
                    | WireShape::Double
                    | WireShape::Float
                    | WireShape::Bool => {
                        let mut p = after_tag;
                        let payload_len = read_varint_u32(buf, &mut p)? as usize;
                        cursor = p;
                        end = p + payload_len;
                        if end > buf.len() {
                            return Err(DqError::parse_failure("packed payload overruns buffer"));
                        }
                        if let Some((tag2, after2)) = peek_tag(buf, end)? {
                            if tag2 == NULLS_TAG {
                                let mut p2 = after2;
                                nulls = NullBitmap::parse(buf, &mut p2)?;
                            }
                        }
                    }
                    WireShape::String | WireShape::Bytes | WireShape::FixedLen(_) => {
                        pending_tag = Some(tag);
                        cursor = after_tag;
                        let trailing = skip_repeated_items(buf, after_tag, shape, expected_tag)?;
                        if let Some((tag2, after2)) = peek_tag(buf, trailing)? {
                            if tag2 == NULLS_TAG {
                                let mut p2 = after2;
                                nulls = NullBitmap::parse(buf, &mut p2)?;
                            }
                        }
                    }
                }
            } else {
                return Err(DqError::parse_failure("unrecognized field tag in value buffer"));
            }
        }

        Ok(Self {
            buf,
            kind,
            shape,
            cursor,
            end,
            pending_tag,
            nulls,
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn n_nulls(&self) -> usize {
        self.nulls.n_nulls()
    }

    /// Consume the next null flag without consuming a value. Exposed for
    /// callers that track value positions themselves.
    pub fn read_null(&mut self) -> bool {
        self.nulls.read_null()
    }

    fn expect_shape(&self, shapes: &[WireShape]) -> DqResult<()> {
        if shapes.contains(&self.shape) {
            Ok(())
        } else {
            Err(DqError::parse_failure(format!(
                "type mismatch: reader holds {:?}",
                self.kind
            )))
        }
    }

    fn next_packed_varint_u32(&mut self) -> DqResult<u32> {
        if self.cursor >= self.end {
            return Err(DqError::parse_failure("end of stream"));
        }
        read_varint_u32(self.buf, &mut self.cursor)
    }

    fn next_packed_varint_u64(&mut self) -> DqResult<u64> {
        if self.cursor >= self.end {
            return Err(DqError::parse_failure("end of stream"));
        }
        read_varint_u64(self.buf, &mut self.cursor)
    }

    fn next_packed_raw<const N: usize>(&mut self) -> DqResult<[u8; N]> {
        if self.cursor + N > self.end {
            return Err(DqError::parse_failure("end of stream"));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(out)
    }

    pub fn read_int32(&mut self) -> DqResult<(i32, bool)> {
        self.expect_shape(&[WireShape::Int32])?;
        let v = self.next_packed_varint_u32()? as i32;
        Ok((v, self.nulls.read_null()))
    }

    pub fn read_int64(&mut self) -> DqResult<(i64, bool)> {
        self.expect_shape(&[WireShape::Int64])?;
        let v = self.next_packed_varint_u64()? as i64;
        Ok((v, self.nulls.read_null()))
    }

    pub fn read_uint32(&mut self) -> DqResult<(u32, bool)> {
        self.expect_shape(&[WireShape::Uint32])?;
        let v = self.next_packed_varint_u32()?;
        Ok((v, self.nulls.read_null()))
    }

    pub fn read_uint64(&mut self) -> DqResult<(u64, bool)> {
        self.expect_shape(&[WireShape::Uint64])?;
        let v = self.next_packed_varint_u64()?;
        Ok((v, self.nulls.read_null()))
    }

    pub fn read_double(&mut self) -> DqResult<(f64, bool)> {
        self.expect_shape(&[WireShape::Double])?;
        let bytes = self.next_packed_raw::<8>()?;
        Ok((f64::from_le_bytes(bytes), self.nulls.read_null()))
    }

    pub fn read_float(&mut self) -> DqResult<(f32, bool)> {
        self.expect_shape(&[WireShape::Float])?;
        let bytes = self.next_packed_raw::<4>()?;
        Ok((f32::from_le_bytes(bytes), self.nulls.read_null()))
    }

    pub fn read_bool(&mut self) -> DqResult<(bool, bool)> {
        self.expect_shape(&[WireShape::Bool])?;
        let v = self.next_packed_varint_u32()?;
        Ok((v != 0, self.nulls.read_null()))
    }

    fn next_repeated_item(&mut self, len_is_one_byte: bool) -> DqResult<&'a [u8]> {
        let expected_tag = self.shape.field_tag();
        if self.pending_tag != Some(expected_tag) {
            return Err(DqError::parse_failure("end of stream"));
        }
        let mut p = self.cursor;
        let len = if len_is_one_byte {
            let b = *self
                .buf
                .get(p)
                .ok_or_else(|| DqError::parse_failure("truncated item length"))?;
            p += 1;
            b as usize
        } else {
            read_varint_u32(self.buf, &mut p)? as usize
        };
        let data_start = p;
        let data_end = data_start
            .checked_add(len)
            .filter(|e| *e <= self.buf.len())
            .ok_or_else(|| DqError::parse_failure("item overruns buffer"))?;
        let data = &self.buf[data_start..data_end];

        self.pending_tag = match peek_tag(self.buf, data_end)? {
            Some((tag, after)) if tag == expected_tag => {
                self.cursor = after;
                Some(tag)
            }
            _ => None,
        };
        Ok(data)
    }

    pub fn read_string(&mut self) -> DqResult<(&'a str, bool)> {
        self.expect_shape(&[WireShape::String, WireShape::FixedLen(8), WireShape::FixedLen(6)])?;
        let one_byte_len = matches!(self.shape, WireShape::FixedLen(_));
        let data = self.next_repeated_item(one_byte_len)?;
        let s = std::str::from_utf8(data).map_err(|_| DqError::parse_failure("invalid utf-8 in string item"))?;
        Ok((s, self.nulls.read_null()))
    }

    pub fn read_bytes(&mut self) -> DqResult<(&'a [u8], bool)> {
        self.expect_shape(&[WireShape::Bytes])?;
        let data = self.next_repeated_item(false)?;
        Ok((data, self.nulls.read_null()))
    }
}

/// Walk past every item of a repeated (string/bytes/fixed-length) field
/// starting at `pos` (just after the first tag has already been read),
/// returning the position right after the last item — used only to locate
/// a possible trailing null-bitmap tag.
fn skip_repeated_items(buf: &[u8], mut pos: usize, shape: WireShape, expected_tag: u32) -> DqResult<usize> {
    let one_byte_len = matches!(shape, WireShape::FixedLen(_));
    loop {
        let len = if one_byte_len {
            let b = *buf
                .get(pos)
                .ok_or_else(|| DqError::parse_failure("truncated item length"))?;
            pos += 1;
            b as usize
        } else {
            read_varint_u32(buf, &mut pos)? as usize
        };
        pos = pos
            .checked_add(len)
            .filter(|e| *e <= buf.len())
            .ok_or_else(|| DqError::parse_failure("item overruns buffer"))?;

        match peek_tag(buf, pos)? {
            Some((tag, after)) if tag == expected_tag => pos = after,
            _ => return Ok(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ValueWriter;

    #[test]
    fn type_mismatch_on_wrong_accessor() {
        let mut w = ValueWriter::new(Kind::Int32, 1);
        w.write_int32(5).unwrap();
        let buf = w.finish();
        let mut r = ValueReader::parse(&buf).unwrap();
        assert!(r.read_string().is_err());
    }

    #[test]
    fn end_of_stream_after_last_item() {
        let mut w = ValueWriter::new(Kind::Bool, 1);
        w.write_bool(true).unwrap();
        let buf = w.finish();
        let mut r = ValueReader::parse(&buf).unwrap();
        assert_eq!(r.read_bool().unwrap(), (true, false));
        assert!(r.read_bool().is_err());
    }

    #[test]
    fn bytes_items_are_not_utf8_checked() {
        let mut w = ValueWriter::new(Kind::Bytes, 1);
        w.write_bytes(3, |buf| {
            buf[..3].copy_from_slice(&[0xff, 0x00, 0xfe]);
            3
        })
        .unwrap();
        let buf = w.finish();
        let mut r = ValueReader::parse(&buf).unwrap();
        let (data, is_null) = r.read_bytes().unwrap();
        assert_eq!(data, &[0xff, 0x00, 0xfe]);
        assert!(!is_null);
    }
}
