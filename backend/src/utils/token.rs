use rand::RngCore;

/// Number of random bytes behind a signature token.
pub const SIGNATURE_TOKEN_BYTES: usize = 32;

/// Generates an opaque signature token: 32 random bytes, hex encoded.
pub fn generate_signature_token() -> String {
    let mut bytes = [0u8; SIGNATURE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Shortens a token for log output.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_64_lowercase_hex_chars() {
        let token = generate_signature_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_signature_token(), generate_signature_token());
    }

    #[test]
    fn redact_keeps_short_prefix() {
        assert_eq!(redact_token("abcdef0123456789"), "abcdef…");
        assert_eq!(redact_token("ab"), "ab…");
    }
}
