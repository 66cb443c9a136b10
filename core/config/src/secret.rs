//! Token secret generation.

use rand::Rng;

/// Length of a generated token secret, in characters.
pub const TOKEN_SECRET_LEN: usize = 60;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generate a random alphabetic secret of [`TOKEN_SECRET_LEN`] characters.
pub fn generate_token_secret() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_SECRET_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_shape() {
        let secret = generate_token_secret();
        assert_eq!(secret.len(), TOKEN_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn test_secrets_differ() {
        assert_ne!(generate_token_secret(), generate_token_secret());
    }
}
