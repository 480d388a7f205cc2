pub mod accounts;
pub mod extract;
pub mod todos;

use axum::routing::{get, post, put};
use axum::{Router, extract::State, http::StatusCode};

use crate::error::AppError;
use crate::state::AppState;

/// Route table. Handlers that take an `AuthUser` require a bearer access
/// token; `/register/`, `/register/simple/`, `/token/`, `/token/refresh/` and
/// `/health` are open.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos/", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/by_category/", get(todos::todos_by_category))
        .route("/todos/categories/", get(todos::list_categories))
        .route(
            "/todos/{id}/",
            get(todos::retrieve_todo)
                .put(todos::replace_todo)
                .patch(todos::patch_todo)
                .delete(todos::delete_todo),
        )
        .route("/todos/{id}/toggle_complete/", post(todos::toggle_complete))
        .route("/register/", post(accounts::register))
        .route("/register/simple/", post(accounts::register))
        .route("/profile/", get(accounts::profile))
        .route("/profile/update/", put(accounts::update_profile))
        .route("/token/", post(accounts::login))
        .route("/token/refresh/", post(accounts::refresh_token))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}
