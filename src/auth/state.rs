//! CSRF state nonce generation.

use rand::Rng;

/// Minimum state length required by the flow.
pub const STATE_LENGTH: usize = 32;

/// Unreserved URL characters, the same alphabet the web client used.
const CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Generate a random state nonce of the given length.
pub fn generate_state(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
