//! Client-chosen session identity.
//!
//! The gateway keys streamed sessions on an opaque identifier the client
//! picks once per process: eight lowercase alphanumerics, matching what
//! the web clients generate per tab.

use rand::Rng;

const SESSION_ID_LEN: usize = 8;
const SESSION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a fresh session identifier.
pub fn new_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.random_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}
