use rand::seq::IndexedRandom;
use uuid::Uuid;

use super::types::LOBBY_CODE_LENGTH;

/// Alphabet for human-relayed lobby codes. Visually ambiguous glyphs
/// (0/O, 1/I) are omitted so codes survive being read out loud.
pub const LOBBY_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// How many collision retries to attempt before falling back to a hex code.
pub const LOBBY_CODE_RETRIES: usize = 10;

/// Generate a random 6-character lobby code from the clean alphabet.
pub fn generate_lobby_code() -> String {
    let mut rng = rand::rng();
    // `choose` on the non-empty alphabet never yields None
    (0..LOBBY_CODE_LENGTH)
        .filter_map(|_| LOBBY_CODE_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect()
}

/// Collision fallback: the first 6 uppercase hex characters of a fresh
/// random 128-bit value.
pub fn fallback_lobby_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw.chars()
        .take(LOBBY_CODE_LENGTH)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_clean_alphabet() {
        for _ in 0..200 {
            let code = generate_lobby_code();
            assert_eq!(code.len(), LOBBY_CODE_LENGTH);
            assert!(code
                .bytes()
                .all(|b| LOBBY_CODE_ALPHABET.contains(&b)));
            // No confusable characters
            assert!(!code.contains('0'));
            assert!(!code.contains('O'));
            assert!(!code.contains('I'));
            assert!(!code.contains('1'));
        }
    }

    #[test]
    fn generated_codes_are_mostly_unique() {
        let mut codes = std::collections::HashSet::new();
        for _ in 0..100 {
            codes.insert(generate_lobby_code());
        }
        assert!(codes.len() > 90);
    }

    #[test]
    fn fallback_codes_are_uppercase_hex() {
        for _ in 0..100 {
            let code = fallback_lobby_code();
            assert_eq!(code.len(), LOBBY_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }
}
