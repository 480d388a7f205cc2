use axum::extract::{FromRequest, FromRequestParts};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// `axum::Json` with malformed bodies reported as 400 `AppError`s instead of
/// axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path` where an id that does not parse is simply not found.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// `axum::extract::Query` with malformed query strings reported as JSON 400s.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Runs the `validator` rules of a request body.
pub fn validated<T: Validate + DeserializeOwned>(AppJson(value): AppJson<T>) -> Result<T, AppError> {
    value.validate()?;
    Ok(value)
}
