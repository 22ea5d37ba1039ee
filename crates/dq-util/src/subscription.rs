//! Subscription-key sanitization: non-printable bytes become spaces, and the
//! result is truncated to the maximum subscription size the transport layer
//! accepts.

use dq_core::constants::MAX_SUBSCRIPTION_SIZE;

/// Map every byte outside the printable ASCII range `32..=126` to space, and
/// truncate to `MAX_SUBSCRIPTION_SIZE`.
pub fn sanitize(bytes: &[u8]) -> Vec<u8> {
    let len = bytes.len().min(MAX_SUBSCRIPTION_SIZE);
    bytes[..len]
        .iter()
        .map(|&b| if (32..=126).contains(&b) { b } else { b' ' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_bytes_pass_through() {
        assert_eq!(sanitize(b"topic.name"), b"topic.name".to_vec());
    }

    #[test]
    fn control_bytes_become_spaces() {
        assert_eq!(sanitize(&[0x01, b'a', 0x7f]), vec![b' ', b'a', b' ']);
    }

    #[test]
    fn truncates_to_max_subscription_size() {
        let oversized = vec![b'x'; MAX_SUBSCRIPTION_SIZE + 50];
        let out = sanitize(&oversized);
        assert_eq!(out.len(), MAX_SUBSCRIPTION_SIZE);
    }
}
