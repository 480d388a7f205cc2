use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use cookie::{Cookie, SameSite};
use tracing::{info, warn};

use crate::api::extract::{AppJson, validated};
use crate::auth::{AuthUser, TokenType, hash_password, verify_password};
use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::notifications::Notification;
use crate::state::AppState;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

/// Serves both `/register/` and `/register/simple/`.
pub async fn register(
    State(state): State<AppState>,
    body: AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = validated(body)?;
    let username = req.username.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    if repository::username_taken(&state.db, &username, None).await? {
        return Err(AppError::field("username", USERNAME_TAKEN));
    }

    let password_hash = hash_password(&password)?;
    let user = repository::insert_user(&state.db, &username, &email, &password_hash)
        .await
        .map_err(username_conflict)?;
    info!("registered user {} ({})", user.username, user.id);

    let tokens = state.tokens.issue_pair(user.id)?;
    let profile = UserProfile::from(&user);
    state.notifier.notify(Notification::Welcome {
        user: profile.clone(),
    });

    let cookie = Cookie::build(("access_token", tokens.access.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build();

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie.to_string())],
        Json(RegisterResponse {
            user: profile,
            message: "User created successfully".to_string(),
            tokens,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = validated(body)?;
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = repository::find_user_by_username(&state.db, &username)
        .await?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| {
            warn!("failed login for {}", username);
            AppError::Unauthorized(BAD_CREDENTIALS.to_string())
        })?;

    let tokens = state.tokens.issue_pair(user.id)?;
    Ok(Json(LoginResponse {
        refresh: tokens.refresh,
        access: tokens.access,
        user: UserProfile::from(&user),
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    body: AppJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let req = validated(body)?;
    let claims = state
        .tokens
        .verify(&req.refresh.unwrap_or_default(), TokenType::Refresh)?;

    let user = repository::find_user_by_id(&state.db, claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let access = state.tokens.issue(user.id, TokenType::Access)?;
    Ok(Json(AccessTokenResponse { access }))
}

pub async fn profile(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// Partial update of the caller's own account.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: AppJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let req = validated(body)?;

    if let Some(username) = &req.username {
        if repository::username_taken(&state.db, username, Some(user.id)).await? {
            return Err(AppError::field("username", USERNAME_TAKEN));
        }
    }

    let password_hash = req.password.as_deref().map(hash_password).transpose()?;

    let updated = repository::update_user(
        &state.db,
        user.id,
        req.username.as_deref(),
        req.email.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(username_conflict)?
    .ok_or(AppError::NotFound)?;

    Ok(Json(UserProfile::from(&updated)))
}

// Catches the race where the name was claimed between the check and the write.
fn username_conflict(e: sqlx::Error) -> AppError {
    let unique_violation = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique_violation {
        AppError::field("username", USERNAME_TAKEN)
    } else {
        AppError::Database(e)
    }
}
