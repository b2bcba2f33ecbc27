//! Token endpoint requests and responses.

use beacon_domain::{BeaconError, Credential, IdentityKind, Module, PlatformConfig, Result, TokenGrant};

use crate::http::{HttpRequest, HttpResponse};

const TOKEN_PATH: &str = "token";
const VALIDATE_PATH: &str = "validate";

/// OAuth grant sent to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    ClientCredentials,
    Password,
    RefreshToken,
}

impl GrantType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Application identities, and user identities without a username and
    /// password, log in with client credentials.
    pub fn for_login(credential: &Credential) -> Self {
        if credential.kind == IdentityKind::Application || !credential.has_user_credentials() {
            Self::ClientCredentials
        } else {
            Self::Password
        }
    }
}

/// `GET /validate` with the current access token.
pub fn validate_request(config: &PlatformConfig, access_token: &str) -> HttpRequest {
    HttpRequest::get(config.endpoint_url(Module::Authentication, VALIDATE_PATH))
        .with_bearer(access_token)
}

/// `POST /token` exchanging a refresh token.
pub fn refresh_request(config: &PlatformConfig, refresh_token: &str) -> HttpRequest {
    HttpRequest::post(config.endpoint_url(Module::Authentication, TOKEN_PATH)).with_form([
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("grant_type", GrantType::RefreshToken.as_str()),
        ("refresh_token", refresh_token),
    ])
}

/// `POST /token` for a fresh login, choosing the grant from the credential.
pub fn login_request(config: &PlatformConfig, credential: &Credential) -> (HttpRequest, GrantType) {
    let grant = GrantType::for_login(credential);
    let mut fields = vec![
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("grant_type", grant.as_str()),
    ];
    if grant == GrantType::Password {
        fields.push(("username", credential.username.as_deref().unwrap_or_default()));
        fields.push(("password", credential.password.as_deref().unwrap_or_default()));
    }

    let request = HttpRequest::post(config.endpoint_url(Module::Authentication, TOKEN_PATH))
        .with_form(fields);
    (request, grant)
}

/// Read the tokens out of a 200 token response.
///
/// # Errors
/// Returns `BeaconError::Parse` when the access token is missing or empty,
/// or when a user identity did not receive a refresh token.
pub fn parse_grant(kind: IdentityKind, response: &HttpResponse) -> Result<TokenGrant> {
    let grant: TokenGrant = response.parse()?;

    if grant.access_token.is_empty() {
        return Err(BeaconError::Parse("token response has an empty access_token".into()));
    }
    if kind.is_user() && grant.refresh_token.as_deref().map_or(true, str::is_empty) {
        return Err(BeaconError::Parse(format!("token response for {kind} has no refresh_token")));
    }

    Ok(grant)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig {
            client_id: "client".into(),
            client_secret: "secret".into(),
            application_id: 1,
            project_id: 2,
            company_id: 3,
            sdk_user_role: 4,
            ..PlatformConfig::default()
        }
    }

    #[test]
    fn login_grant_selection() {
        let app = Credential::with_user_credentials(IdentityKind::Application, "u", "p");
        assert_eq!(GrantType::for_login(&app), GrantType::ClientCredentials);

        let unset = Credential::empty(IdentityKind::ServiceUser);
        assert_eq!(GrantType::for_login(&unset), GrantType::ClientCredentials);

        let user = Credential::with_user_credentials(IdentityKind::InteractiveUser, "dev", "Pa55word");
        assert_eq!(GrantType::for_login(&user), GrantType::Password);
    }

    #[test]
    fn password_login_sends_user_material() {
        let user = Credential::with_user_credentials(IdentityKind::ServiceUser, "svc", "Abc123xyZ");
        let (request, grant) = login_request(&config(), &user);

        assert_eq!(grant, GrantType::Password);
        assert_eq!(request.url, "https://authentication.phoenixplatform.com/v2/token");
        assert_eq!(request.form_value("grant_type"), Some("password"));
        assert_eq!(request.form_value("username"), Some("svc"));
        assert_eq!(request.form_value("password"), Some("Abc123xyZ"));
        assert_eq!(request.form_value("client_secret"), Some("secret"));
    }

    #[test]
    fn client_credentials_login_omits_user_material() {
        let (request, _) = login_request(&config(), &Credential::empty(IdentityKind::Application));
        assert_eq!(request.form_value("grant_type"), Some("client_credentials"));
        assert_eq!(request.form_value("username"), None);
        assert_eq!(request.form_value("password"), None);
    }

    #[test]
    fn validate_carries_bearer() {
        let request = validate_request(&config(), "tok");
        assert_eq!(request.path(), "/v2/validate");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn user_grants_require_refresh_token() {
        let access_only = HttpResponse::json(200, &json!({ "access_token": "A" }));
        assert!(parse_grant(IdentityKind::Application, &access_only).is_ok());
        assert!(matches!(
            parse_grant(IdentityKind::ServiceUser, &access_only),
            Err(BeaconError::Parse(_))
        ));

        let both = HttpResponse::json(200, &json!({ "access_token": "A", "refresh_token": "R" }));
        let grant = parse_grant(IdentityKind::InteractiveUser, &both).unwrap();
        assert_eq!(grant.refresh_token.as_deref(), Some("R"));
    }

    #[test]
    fn empty_or_missing_access_token_is_a_parse_error() {
        for body in [json!({}), json!({ "access_token": "" })] {
            let response = HttpResponse::json(200, &body);
            assert!(parse_grant(IdentityKind::Application, &response).is_err());
        }
    }
}
