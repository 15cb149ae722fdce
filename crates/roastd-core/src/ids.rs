use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

pub const LINK_CODE_LEN: usize = 8;

/// Draw an 8-character code uniformly from `[A-Za-z0-9]`.
///
/// Uniqueness is not checked here; the registry's unique constraint rejects
/// collisions at insert time.
pub fn new_link_code() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(LINK_CODE_LEN)
        .map(char::from)
        .collect()
}

pub fn new_session_id() -> Uuid {
    Uuid::new_v4()
}

pub fn is_valid_link_code(code: &str) -> bool {
    code.len() == LINK_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_link_code_shape() {
        for _ in 0..100 {
            let code = new_link_code();
            assert!(is_valid_link_code(&code), "{code}");
        }
    }

    #[test]
    fn test_link_codes_unique_over_10k_draws() {
        let codes: HashSet<String> = (0..10_000).map(|_| new_link_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn test_link_code_validation() {
        assert!(is_valid_link_code("aZ09bY18"));
        assert!(!is_valid_link_code("short"));
        assert!(!is_valid_link_code("toolong123"));
        assert!(!is_valid_link_code("abc-defg"));
        assert!(!is_valid_link_code("ÄbcdefgH"));
    }

    #[test]
    fn test_session_ids_distinct() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
