//! OAuth failure classification.
//!
//! The backend reports why a token request was refused only through an
//! English `error` / `error_description` pair, so the mapping is literal.
//! Everything that depends on those phrases lives here.

use beacon_domain::UnauthorizedReason;
use serde::Deserialize;

const AUTHENTICATION_FAILED: &str = "Authentication failed.";
const CREDENTIALS_INCORRECT: &str = "Credentials incorrect.";
const ACCOUNT_DISABLED: &str = "Account disabled.";
const ACCOUNT_LOCKED: &str = "Account locked.";
const INVALID_TOKEN: &str = "Invalid token.";
const TOKEN_INVALID_OR_EXPIRED: &str = "Token invalid or expired.";

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Map a 401 response body to the reason the credential was refused.
///
/// Bodies that are not JSON, or whose phrases are unknown, map to
/// [`UnauthorizedReason::Generic`].
pub fn classify_oauth_error(body: &[u8]) -> UnauthorizedReason {
    let parsed: OAuthErrorBody = serde_json::from_slice(body).unwrap_or_default();

    match (parsed.error.as_deref(), parsed.error_description.as_deref()) {
        (Some(AUTHENTICATION_FAILED), Some(CREDENTIALS_INCORRECT)) => {
            UnauthorizedReason::CredentialIncorrect
        }
        (Some(AUTHENTICATION_FAILED), Some(ACCOUNT_DISABLED)) => UnauthorizedReason::AccountDisabled,
        (Some(AUTHENTICATION_FAILED), Some(ACCOUNT_LOCKED)) => UnauthorizedReason::AccountLocked,
        (Some(INVALID_TOKEN), Some(TOKEN_INVALID_OR_EXPIRED)) => {
            UnauthorizedReason::TokenInvalidOrExpired
        }
        _ => UnauthorizedReason::Generic,
    }
}
