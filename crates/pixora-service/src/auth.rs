//! Authentication extractor.
//!
//! Authentication proper (sessions, sign-up, token issuance) lives outside
//! this service; all we require is a stable user identity, carried as the
//! `sub` claim of an HS256 bearer token.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use pixora_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user extracted from a bearer JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID from the token's `sub` claim.
    pub user_id: UserId,
}

/// JWT claims validated on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let mut validation = Validation::new(Algorithm::HS256);
            validation.set_audience(&[&state.config.jwt_audience]);

            let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
            let data = jsonwebtoken::decode::<JwtClaims>(token, &key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized
            })?;

            let user_id = data
                .claims
                .sub
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthorized)?;

            Ok(AuthUser { user_id })
        })
    }
}
