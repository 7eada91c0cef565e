//! Short token generation.

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Length of generated tokens.
pub const TOKEN_LEN: usize = 12;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a short token.
///
/// Mixes the wall clock in nanoseconds, a random draw, a random alphanumeric
/// character, the process id and an in-process counter, then keeps the first
/// [`TOKEN_LEN`] hex digits of their SHA-256. Tokens are hard to collide, not
/// hard to guess; they must not be used as credentials.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let random: u32 = rng.random_range(0..100_000_000);
    let marker = char::from(rng.sample(Alphanumeric));
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let seed = format!(
        "{:x}{:x}{}{:x}{}",
        nanos,
        random,
        marker,
        std::process::id(),
        counter
    );
    let mut token = hex::encode(Sha256::digest(seed.as_bytes()));
    token.truncate(TOKEN_LEN);
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_differ_in_tight_loop() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }
}
