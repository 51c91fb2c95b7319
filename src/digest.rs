//! Content-digest helper used to detect byte-identical re-ingestion
//! (spec §4.6, §9).

/// SHA-256 hex digest of the raw (pre-decode) audio bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    sha256::digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_bytes() {
        let bytes = b"same input";
        assert_eq!(digest_bytes(bytes), digest_bytes(bytes));
    }

    #[test]
    fn differs_for_different_bytes() {
        assert_ne!(digest_bytes(b"one"), digest_bytes(b"two"));
    }
}
