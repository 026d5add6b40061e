use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn verify_password__should_accept_matching_password() {
        // Given
        let hash = hash_password("longenough1").expect("hash password");

        // Then
        assert!(verify_password("longenough1", &hash));
    }

    #[test]
    fn verify_password__should_reject_wrong_password() {
        // Given
        let hash = hash_password("longenough1").expect("hash password");

        // Then
        assert!(!verify_password("different", &hash));
    }

    #[test]
    fn verify_password__should_reject_malformed_hash() {
        // Then
        assert!(!verify_password("longenough1", "not-a-phc-string"));
    }
}
