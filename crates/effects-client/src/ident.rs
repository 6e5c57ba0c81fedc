//! Short random identifiers for generated file names.

use rand::Rng;

const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric token of `len` characters.
///
/// Uniform draw with replacement from the 62-character alphabet. Not
/// cryptographically secure; only used to make storage object names
/// collision-unlikely, never for security decisions.
pub fn file_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
