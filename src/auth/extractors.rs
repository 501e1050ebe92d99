use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};

use crate::{
    auth::jwt::{JwtKeys, TokenError, TokenSubject},
    error::AppError,
};

/// Extracts and validates the bearer JWT, yielding the authenticated subject.
pub struct AuthUser(pub TokenSubject);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        // Expect "Bearer <token>"
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .ok_or(AppError::TokenInvalid(TokenError::Malformed))?;

        let subject = keys.verify(token.trim()).map_err(|e| {
            warn!(reason = %e, "bearer token rejected");
            AppError::TokenInvalid(e)
        })?;
        debug!(subject = %subject.subject, expires_at = %subject.expires_at, "bearer token accepted");

        Ok(AuthUser(subject))
    }
}
