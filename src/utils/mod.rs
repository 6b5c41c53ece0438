const KEY_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random alphanumeric key of exactly `length` characters.
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| KEY_CHARS[rand::random_range(0..KEY_CHARS.len())] as char)
        .take(length)
        .collect()
}

/// 短码只允许字母和数字
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 128 && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_code_length_and_alphabet() {
        for len in [0, 1, 8, 32] {
            let code = generate_random_code(len);
            assert_eq!(code.len(), len);
            assert!(code.bytes().all(|b| KEY_CHARS.contains(&b)));
        }
    }

    #[test]
    fn test_generated_codes_differ() {
        assert_ne!(generate_random_code(16), generate_random_code(16));
    }

    #[test]
    fn test_is_valid_short_code() {
        assert!(is_valid_short_code("abc123XYZ"));
        assert!(!is_valid_short_code(""));
        assert!(!is_valid_short_code("api/user"));
        assert!(!is_valid_short_code(&"a".repeat(129)));
    }
}
