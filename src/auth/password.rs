use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;

/// Stand-in hash verified when the account does not exist, so an unknown
/// email costs the same argon2 work as a wrong password. Default params.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$am9iYm9hcmQtZHVtbXkhIQ$yihNG/fXAKR/PCp/CLZWgjk4d+mF/+x4CqWPVmfKuS8";

#[cfg(test)]
pub(crate) static VERIFIED_CANDIDATES: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());

/// Hash a password into a PHC string (argon2id, default params).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    #[cfg(test)]
    VERIFIED_CANDIDATES.lock().unwrap().push(password.to_string());

    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(e.to_string())),
    }
}

/// Runs [`hash_password`] off the async executor.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
}

/// Runs [`verify_password`] off the async executor.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
}
