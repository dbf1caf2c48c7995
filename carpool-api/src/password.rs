//! bcrypt password hashes in the modular crypt format (`$2b$10$...`).

use anyhow::Context;

/// Work factor, 2^10 rounds.
const COST: u32 = 10;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    bcrypt::hash(password, COST).context("hashing password")
}

/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_only_the_original_password() {
        let stored = hash_password("hunter22").unwrap();
        assert!(stored.starts_with("$2b$10$"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("pw", "not-a-hash"));
        assert!(!verify_password("pw", "!!$!!"));
        assert!(!verify_password("pw", "$2b$10$tooshort"));
    }
}
