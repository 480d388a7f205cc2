use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::TokenManager;
use crate::notifications::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenManager>,
    pub notifier: Notifier,
}
