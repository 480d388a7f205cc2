use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::info;

use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::auth::AuthUser;
use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::notifications::Notification;
use crate::state::AppState;

pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = repository::fetch_todos(&state.db, user.id).await?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<NewTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    req.check()?;
    let todo = repository::insert_todo(&state.db, user.id, req).await?;
    info!("user {} created todo {}", user.id, todo.id);

    state.notifier.notify(Notification::TodoCreated {
        user: UserProfile::from(&user),
        todo: todo.clone(),
    });

    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn retrieve_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Todo>, AppError> {
    let todo = repository::find_todo(&state.db, user.id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(todo))
}

/// PUT: like PATCH, but `title` must be present.
pub async fn replace_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    req.check()?;
    if req.title.is_none() {
        return Err(AppError::field("title", "This field is required."));
    }
    update(&state, user.id, id, req).await
}

pub async fn patch_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    req.check()?;
    update(&state, user.id, id, req).await
}

async fn update(
    state: &AppState,
    owner_id: i64,
    id: i64,
    req: UpdateTodoRequest,
) -> Result<Json<Todo>, AppError> {
    let todo = repository::update_todo(&state.db, owner_id, id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_todo(&state.db, user.id, id).await?;
    if ok {
        info!("user {} deleted todo {}", user.id, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn toggle_complete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    let ok = repository::toggle_todo(&state.db, user.id, id).await?;
    if ok {
        Ok(Json(StatusResponse {
            status: "todo updated".to_string(),
        }))
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn todos_by_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(params): AppQuery<CategoryQuery>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let category = params
        .category
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Category parameter is required".to_string()))?;

    let todos = repository::fetch_todos_by_category(&state.db, user.id, &category).await?;
    Ok(Json(todos))
}

pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<String>>, AppError> {
    let categories = repository::fetch_categories(&state.db, user.id).await?;
    Ok(Json(categories))
}
