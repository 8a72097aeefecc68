//! Tracking identifier generation.
//!
//! Format: `PREFIX-XXXXXXXX` where X is an uppercase alphanumeric drawn from
//! a CSPRNG. Eight characters over a 36-symbol alphabet give ~2.8e12
//! identifiers; the store additionally enforces uniqueness with a UNIQUE
//! constraint and the builder retries on collision.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 8;

pub fn generate_tracking_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// Loose shape check used by lookup endpoints to reject garbage early.
pub fn looks_like_tracking_id(s: &str) -> bool {
    match s.split_once('-') {
        Some((prefix, suffix)) => {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphabetic())
                && suffix.len() >= 6
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
