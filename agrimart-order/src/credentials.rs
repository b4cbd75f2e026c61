use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use agrimart_core::{CoreError, CoreResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Argon2id PHC string for a new password
pub fn hash_password(password: &str) -> CoreResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            CoreError::StorageError(format!("password hashing failed: {}", e))
        })
}

/// `Ok(false)` on a wrong password. A stored hash that does not parse is
/// a storage fault, not a failed login.
pub fn verify_password(stored_hash: &str, password: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CoreError::StorageError(format!("stored password hash is invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            tracing::error!(error = %e, "Password verification failed");
            Err(CoreError::StorageError(format!("password verification failed: {}", e)))
        }
    }
}
