//! Cache key derivation for persisted tokens.

use sha2::{Digest, Sha256};

/// Bytes of the SHA-256 digest kept in the fingerprint.
const FINGERPRINT_LEN: usize = 16;

/// Derive the stable cache key for a client identity and scope set.
///
/// Scopes are sorted before hashing, so the same set in a different order
/// maps to the same key. Each field is NUL-terminated to keep field
/// boundaries unambiguous.
pub fn derive_cache_key(client_id: &str, client_secret: &str, scopes: &[String]) -> String {
    let mut sorted: Vec<&str> = scopes.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for field in [client_id, client_secret, sorted.join(" ").as_str()] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hex_encode(&hasher.finalize()[..FINGERPRINT_LEN])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
