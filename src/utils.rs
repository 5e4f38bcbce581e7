use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand_core::OsRng;

use crate::errors::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Validates a self-service password change and returns the new hash.
///
/// Accounts without a stored hash were provisioned by an OAuth provider and
/// can never set a password here, whatever the caller supplies.
pub fn change_password(
    stored_hash: Option<&str>,
    current_password: Option<&str>,
    new_password: &str,
) -> Result<String, AppError> {
    let stored_hash = stored_hash.ok_or_else(|| AppError::bad_request("Cannot change password for OAuth accounts"))?;

    let current_password = current_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("Current password is required to set a new password"))?;

    if !verify_password(current_password, stored_hash)? {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    hash_password(new_password)
}

/// Trims user input and maps blank strings to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}
