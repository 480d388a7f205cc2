use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::token::TokenType;
use crate::db::repository;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// The caller behind a valid `Authorization: Bearer <access>` header.
///
/// Handlers that take this extractor are protected; a missing, malformed,
/// expired or orphaned token short-circuits with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("Authorization header must contain a Bearer token.".to_string())
            })?;

        let claims = state.tokens.verify(token, TokenType::Access)?;
        let user = repository::find_user_by_id(&state.db, claims.user_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok(AuthUser(user))
    }
}
