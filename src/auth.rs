// src/auth.rs
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthSettings;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: Option<String>,
    pub exp: usize,
    pub iat: Option<usize>,
    pub iss: Option<String>,
}

/// Verification material for bearer tokens, managed as Rocket state.
pub struct AuthConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthConfig {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// `None` when no secret is configured.
    pub fn from_settings(settings: &AuthSettings) -> Option<Self> {
        let secret = settings.jwt_secret.as_deref().map(str::trim)?;
        if secret.is_empty() {
            return None;
        }
        Some(Self::new(secret, settings.issuer.as_deref()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims.into())
    }
}

/// The caller behind a request. Downstream credit accounting keys on `user_id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::NotConfigured)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let token = match req.headers().get_one("Authorization") {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) => token.trim(),
                None => {
                    warn!("Invalid Authorization header format");
                    return Outcome::Error((Status::Unauthorized, AuthError::InvalidToken));
                }
            },
            None => {
                warn!("Missing Authorization header");
                return Outcome::Error((Status::Unauthorized, AuthError::MissingToken));
            }
        };

        match auth_config.verify(token) {
            Ok(user) => {
                debug!("Authenticated user {}", user.user_id);
                Outcome::Success(user)
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                Outcome::Error((Status::Unauthorized, AuthError::TokenVerificationFailed))
            }
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenVerificationFailed,
    NotConfigured,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidToken => "Invalid authorization token format",
            AuthError::TokenVerificationFailed => "Token verification failed",
            AuthError::NotConfigured => "Authentication is not configured",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str, exp: usize) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("user@example.com".to_string()),
            exp,
            iat: None,
            iss: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn test_valid_token_yields_user() {
        let config = AuthConfig::new("secret", None);
        let user = config.verify(&token("secret", "user-42", far_future())).unwrap();
        assert_eq!(user.user_id, "user-42");
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = AuthConfig::new("secret", None);
        assert!(config.verify(&token("other", "user-42", far_future())).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = AuthConfig::new("secret", None);
        assert!(config.verify(&token("secret", "user-42", 1_000)).is_err());
    }

    #[test]
    fn test_missing_secret_disables_auth() {
        assert!(AuthConfig::from_settings(&AuthSettings::default()).is_none());
    }
}
