pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notifications;
pub mod state;

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

use crate::auth::TokenManager;
use crate::notifications::{EmailRenderer, Mailer, NotificationWorker, RetryPolicy};
use crate::state::AppState;

/// Wires the router to its notification queue. The returned worker must be
/// spawned for queued emails to go out.
pub fn build_app(
    db: SqlitePool,
    tokens: TokenManager,
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
) -> Result<(Router, NotificationWorker), tera::Error> {
    let (notifier, worker) = notifications::channel(mailer, EmailRenderer::new()?, policy);

    let state = AppState {
        db,
        tokens: Arc::new(tokens),
        notifier,
    };

    Ok((api::router(state), worker))
}
