//! Argon2id password hashing
//!
//! Stored hashes are PHC strings, which carry the salt and parameters
//! inline, so verification needs no side table and parameter upgrades
//! only affect new hashes.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::{password_hash::SaltString, Argon2};

use crate::types::{CardwayError, Result};

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CardwayError::Auth(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// A wrong password is `Ok(false)`; a stored value that does not parse
/// as a PHC string is an error, since that means corrupt data rather
/// than a bad credential.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| CardwayError::Auth(format!("stored hash is not a PHC string: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let hash = hash_password("kanji-every-morning").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("kanji-every-morning", &hash).unwrap());
        assert!(!verify_password("kanji-every-evening", &hash).unwrap());
    }

    #[test]
    fn test_salts_make_hashes_unique() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-password", &first).unwrap());
        assert!(verify_password("same-password", &second).unwrap());
    }

    #[test]
    fn test_corrupt_stored_hash_is_an_error_not_a_mismatch() {
        let err = verify_password("whatever", "plaintext-left-by-a-bad-migration").unwrap_err();
        assert!(matches!(err, CardwayError::Auth(_)));
    }
}
