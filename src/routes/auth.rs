use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub role: Role,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Checks the HS256 tokens handed out by the identity service.
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Accepts the token with or without its `Bearer ` prefix.
    pub fn verify_token(&self, token: &str) -> Result<Principal, AuthError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let mut validation = jsonwebtoken::Validation::default();
        validation.leeway = 10;
        validation.validate_exp = true;
        validation.algorithms = vec![jsonwebtoken::Algorithm::HS256];

        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|err| {
            tracing::warn!("Error decoding token: {:?}", err);
            AuthError::InvalidToken(err)
        })?;

        Ok(Principal {
            user_id: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }

    pub fn issue_token(&self, user_id: Uuid, role: Role, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            role,
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(AuthError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_with_and_without_prefix() {
        let service = AuthService::new("secret".into());
        let user = Uuid::new_v4();
        let token = service.issue_token(user, Role::Admin, Duration::from_secs(60)).unwrap();

        let principal = service.verify_token(&token).unwrap();
        assert_eq!(principal.user_id, user);
        assert!(principal.is_admin());

        let principal = service.verify_token(&format!("Bearer {token}")).unwrap();
        assert_eq!(principal.user_id, user);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = AuthService::new("one".into())
            .issue_token(Uuid::new_v4(), Role::Customer, Duration::from_secs(60))
            .unwrap();
        assert!(matches!(
            AuthService::new("two".into()).verify_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn role_defaults_to_customer() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": Uuid::nil(),
            "exp": 0,
            "iat": 0,
        }))
        .unwrap();
        assert_eq!(claims.role, Role::Customer);
    }
}
