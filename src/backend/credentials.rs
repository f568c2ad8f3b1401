//! Storage keys for per-network passwords.
//!
//! SSIDs can be up to 32 arbitrary bytes, which does not fit the short key
//! slots of small key-value stores. Each SSID is hashed to 64 bits and the
//! hash is spelled out as 11 printable characters behind a `pw-` tag.

const SEED: u64 = 525_201_411_107_845_655;
const MULTIPLIER: u64 = 0x5bd1_e995_5bd1_e995;

/// Namespace tag for password entries.
pub const PASSWORD_KEY_PREFIX: &str = "pw-";

/// Number of characters encoding the hash, 6 bits each.
pub const ENCODED_LEN: usize = 11;

/// One-at-a-time multiply-xor-shift hash over `bytes`.
pub fn hash64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(SEED, |mut h, &b| {
        h ^= u64::from(b);
        h = h.wrapping_mul(MULTIPLIER);
        h ^ (h >> 47)
    })
}

/// Opaque, deterministic store key for the password of `ssid`.
pub fn password_key(ssid: &str) -> String {
    let mut hash = hash64(ssid.as_bytes());
    let mut key = String::with_capacity(PASSWORD_KEY_PREFIX.len() + ENCODED_LEN);
    key.push_str(PASSWORD_KEY_PREFIX);
    for _ in 0..ENCODED_LEN {
        key.push(char::from(b'0' + (hash & 0x3f) as u8));
        hash >>= 6;
    }
    key
}
