//! LEB128-style varint encode/decode shared by the reader and writer.

use dq_core::{DqError, DqResult};

/// Append `v` to `out` as a base-128 varint (7 data bits per byte, MSB set
/// on every byte but the last).
pub(crate) fn write_varint_u64(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            out.push(byte | 0x80);
        } else {
            out.push(byte);
            break;
        }
    }
}

pub(crate) fn write_varint_u32(v: u32, out: &mut Vec<u8>) {
    write_varint_u64(v as u64, out)
}

/// Write `v` as a base-128 varint directly into `out`, returning the number
/// of bytes used. `out` must be at least `max_varint_len` bytes for `v`'s
/// width (callers size their scratch buffer for the worst case).
pub(crate) fn write_varint_u64_into(mut v: u64, out: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            out[i] = byte | 0x80;
            i += 1;
        } else {
            out[i] = byte;
            i += 1;
            break;
        }
    }
    i
}

/// Decode a varint starting at `*pos`, advancing `*pos` past it.
pub(crate) fn read_varint_u64(buf: &[u8], pos: &mut usize) -> DqResult<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *buf
            .get(*pos)
            .ok_or_else(|| DqError::parse_failure("truncated varint"))?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(DqError::parse_failure("varint exceeds 64 bits"));
        }
    }
}

pub(crate) fn read_varint_u32(buf: &[u8], pos: &mut usize) -> DqResult<u32> {
    let v = read_varint_u64(buf, pos)?;
    u32::try_from(v).map_err(|_| DqError::parse_failure("varint exceeds 32 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_and_large_values() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_varint_u64(v, &mut buf);
            let mut pos = 0;
            assert_eq!(read_varint_u64(&buf, &mut pos).unwrap(), v);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn truncated_buffer_is_a_parse_failure() {
        let mut pos = 0;
        assert!(read_varint_u64(&[0x80], &mut pos).is_err());
    }

    #[test]
    fn write_into_slice_matches_write_into_vec() {
        for v in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut vec_buf = Vec::new();
            write_varint_u64(v, &mut vec_buf);

            let mut slice_buf = [0u8; 10];
            let used = write_varint_u64_into(v, &mut slice_buf);
            assert_eq!(&slice_buf[..used], vec_buf.as_slice());
        }
    }
}
