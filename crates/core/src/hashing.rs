//! SHA-256 helpers shared by id derivation and timeline hashing.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Hash several string components into one digest.
///
/// Components are separated by a unit-separator byte so that
/// `["ab", "c"]` and `["a", "bc"]` hash differently.
pub fn sha256_hex_parts(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn part_boundaries_are_significant() {
        assert_ne!(sha256_hex_parts(&["ab", "c"]), sha256_hex_parts(&["a", "bc"]));
        assert_eq!(sha256_hex_parts(&["a", "b"]), sha256_hex_parts(&["a", "b"]));
    }
}
