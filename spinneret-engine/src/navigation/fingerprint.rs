//! Page content fingerprinting.
//!
//! A 32-bit multiply-by-31 rolling hash over the visible text of the page's
//! root container. Deterministic and order-sensitive, intentionally cheap
//! rather than collision-proof: a false "duplicate" is a rare, tolerable
//! cost of a fast heuristic.

pub fn fingerprint(text: &str) -> u32 {
    let mut hash: u32 = 0;
    for ch in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as u32);
    }
    hash
}
