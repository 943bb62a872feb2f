//! Constant-time comparison primitives.
//!
//! Every secret-bearing equality check in the crate goes through here so that
//! timing does not leak how many leading bytes matched.

/// Compare two byte slices in constant time.
///
/// Returns `false` immediately when the lengths differ (length is not treated
/// as secret). For equal-length inputs every byte pair is visited exactly
/// once, accumulating differences without branching on the data.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Compare two strings in constant time over their UTF-8 bytes.
pub fn secure_compare_str(a: &str, b: &str) -> bool {
    secure_compare(a.as_bytes(), b.as_bytes())
}
