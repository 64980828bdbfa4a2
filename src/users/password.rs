use argon2::{
    password_hash::{PasswordHash, PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use super::repo::StoreError;

/// Salt and PHC hash for a freshly registered password.
pub struct Credential {
    pub salt: String,
    pub password_hash: String,
}

pub fn new_credential(plain: &str) -> Result<Credential, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = hash_with_salt(plain, &salt)?;
    Ok(Credential {
        salt: salt.as_str().to_owned(),
        password_hash,
    })
}

/// Recomputes the hash of `plain` with the stored salt and compares the raw
/// outputs. `Output` equality is constant time.
pub fn verify_password(plain: &str, salt: &str, stored_hash: &str) -> Result<bool, StoreError> {
    let salt = SaltString::from_b64(salt).map_err(|e| {
        error!(error = %e, "stored salt is not valid b64");
        StoreError::Credential(e.to_string())
    })?;
    let stored = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        StoreError::Credential(e.to_string())
    })?;
    let candidate = hash_with_salt(plain, &salt)?;
    let candidate = PasswordHash::new(&candidate)
        .map_err(|e| StoreError::Credential(e.to_string()))?;

    match (candidate.hash, stored.hash) {
        (Some(a), Some(b)) => Ok(a == b),
        _ => Err(StoreError::Credential("hash output missing".into())),
    }
}

fn hash_with_salt(plain: &str, salt: &SaltString) -> Result<String, StoreError> {
    Argon2::default()
        .hash_password(plain.as_bytes(), salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            StoreError::Credential(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let cred = new_credential("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(verify_password("Secur3P@ssw0rd!", &cred.salt, &cred.password_hash)
            .expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let cred = new_credential("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("wrong-password", &cred.salt, &cred.password_hash)
            .expect("verify should not error"));
    }

    #[test]
    fn salts_are_per_credential() {
        let a = new_credential("same").unwrap();
        let b = new_credential("same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn verify_fails_against_another_salt() {
        let a = new_credential("secret123").unwrap();
        let b = new_credential("secret123").unwrap();
        assert!(!verify_password("secret123", &b.salt, &a.password_hash).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let cred = new_credential("anything").unwrap();
        let err = verify_password("anything", &cred.salt, "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
