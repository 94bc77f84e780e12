use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::auth::{AuthError, AuthService, Principal};
use super::error::ApiError;

#[inline]
pub fn validate_auth_token(headers: &HeaderMap, service: &AuthService) -> Result<Principal, ApiError> {
    let jwt_header_token = match headers.get(AUTHORIZATION).map(|token| token.to_str()) {
        Some(Ok(token)) => token,
        _ => return Err(AuthError::MissingToken.into()),
    };
    Ok(service.verify_token(jwt_header_token)?)
}

#[inline]
pub fn require_admin(headers: &HeaderMap, service: &AuthService) -> Result<Principal, ApiError> {
    let principal = validate_auth_token(headers, service)?;
    if !principal.is_admin() {
        tracing::warn!("Non-admin user {} called an admin route", principal.user_id);
        return Err(ApiError::Forbidden);
    }
    Ok(principal)
}
