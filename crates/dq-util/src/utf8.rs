//! In-place UTF-8 sanitization: a byte-level state machine that blanks out
//! stray `0x00`, truncated multi-byte sequences, and garbled lead/continuation
//! bytes with ASCII space, leaving valid sequences untouched.

/// Replace every byte that does not belong to a well-formed UTF-8 sequence
/// with `b' '`, in place.
pub fn sanitize(buf: &mut [u8]) {
    let mut code_pos: usize = 0;
    let mut code_len: usize = 1;

    for i in 0..buf.len() {
        if buf[i] == 0 {
            buf[i] = b' ';
        }

        // we thought we were mid-sequence, but this byte isn't a continuation
        if code_len > 1 && (buf[i] >> 6) != 0b10 {
            code_pos += 1;
            for k in 1..code_pos {
                if i >= k {
                    buf[i - k] = b' ';
                }
            }
            code_len = 1;
            code_pos = 0;
        }

        if buf[i] < 128 {
            code_len = 1;
            code_pos = 0;
        } else if (buf[i] >> 3) == 0b11110 {
            code_len = 4;
            code_pos = 1;
        } else if (buf[i] >> 4) == 0b1110 {
            code_len = 3;
            code_pos = 1;
        } else if (buf[i] >> 5) == 0b110 {
            code_len = 2;
            code_pos = 1;
        } else if (buf[i] >> 6) == 0b10 {
            code_pos += 1;
            if code_pos > code_len || code_len == 1 {
                for k in 0..code_pos {
                    if i >= k {
                        buf[i - k] = b' ';
                    }
                }
                code_len = 1;
                code_pos = 0;
            } else if code_pos == code_len {
                code_len = 1;
            }
        } else {
            buf[i] = b' ';
            code_len = 1;
            code_pos = 0;
        }
    }

    if code_len > 1 && code_len > code_pos {
        code_pos += 1;
        for k in 1..code_pos {
            if buf.len() >= k {
                let idx = buf.len() - k;
                buf[idx] = b' ';
            }
        }
    }
}
