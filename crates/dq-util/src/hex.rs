//! Hex formatting for endpoint/thread identifiers in log output.

/// Encode `v` as 16 lowercase hex digits, zero-padded.
pub fn encode_u64(v: u64) -> String {
    format!("{:016x}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_sixteen_digits() {
        assert_eq!(encode_u64(0), "0000000000000000");
        assert_eq!(encode_u64(0xff), "00000000000000ff");
    }

    #[test]
    fn full_width_value_round_trips() {
        assert_eq!(encode_u64(u64::MAX), "ffffffffffffffff");
    }
}
