//! State nonce generation and comparison.

/// Random bytes per nonce (each UUIDv4 contributes 122 random bits).
const NONCE_BYTES: usize = 32;

/// Generate a fresh, unguessable `state` value, hex encoded.
pub fn generate_nonce() -> String {
    let mut buf = [0u8; NONCE_BYTES];
    for chunk in buf.chunks_exact_mut(16) {
        chunk.copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    }
    buf.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Compare without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
