//! # Generate
//!
//! Generate random strings for use in access tokens, nonces, and
//! transaction codes.

use base64ct::{Base64UrlUnpadded, Encoding};

const SAFE_CHARS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789)(*&^%$#@!~";
const TOKEN_LEN: usize = 32;

/// Generates a base64 encoded random string for an access token.
#[must_use]
pub fn token() -> String {
    let rnd = random_string(TOKEN_LEN, SAFE_CHARS);
    Base64UrlUnpadded::encode_string(rnd.as_bytes())
}

/// Generates a base64 encoded random string for a nonce.
#[must_use]
pub fn nonce() -> String {
    let rnd = random_string(TOKEN_LEN, SAFE_CHARS);
    Base64UrlUnpadded::encode_string(rnd.as_bytes())
}

/// Generates a 4-digit transaction code (PIN) in the inclusive range
/// 1000–9999, for out-of-band confirmation of a pre-authorized code.
#[must_use]
pub fn tx_code() -> String {
    fastrand::u32(1000..=9999).to_string()
}

/// Generates a random string from a given set of characters. Uses fastrand
/// so is not cryptographically secure.
#[must_use]
pub fn random_string(len: usize, charset: &str) -> String {
    let chars: Vec<char> = charset.chars().collect();
    (0..len).map(|_| chars[fastrand::usize(..chars.len())]).collect()
}

#[cfg(test)]
mod tests {
    #[test]
    fn tx_code_is_four_digits() {
        for _ in 0..100 {
            let code = super::tx_code();
            assert_eq!(code.len(), 4);
            let n: u32 = code.parse().expect("numeric");
            assert!((1000..=9999).contains(&n));
        }
    }

    #[test]
    fn token_is_url_safe() {
        let token = super::token();
        assert_eq!(token.len(), 43);
        assert!(!token.contains(['+', '/', '=']));
    }
}
