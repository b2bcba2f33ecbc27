//! Input validation applied before any request leaves the client.

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::errors::{BeaconError, InvalidInputReason, Result};

/// Require at least eight characters with an upper case letter, a lower
/// case letter and a digit.
///
/// # Errors
/// Returns `InvalidInput(WeakPassword)` when any rule is not met.
pub fn validate_password(password: &str) -> Result<()> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        Err(BeaconError::InvalidInput(InvalidInputReason::WeakPassword))
    }
}

/// # Errors
/// Returns `InvalidInput(EmptyUsername)` for a blank username.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(BeaconError::InvalidInput(InvalidInputReason::EmptyUsername));
    }
    Ok(())
}

/// # Errors
/// Returns `InvalidInput(EmptyDeviceToken)` for a blank push token.
pub fn validate_device_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(BeaconError::InvalidInput(InvalidInputReason::EmptyDeviceToken));
    }
    Ok(())
}
