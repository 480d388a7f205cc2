use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{NewTodoRequest, Todo, UpdateTodoRequest, User};

const TODO_COLUMNS: &str = "id, title, description, created_at, updated_at, due_date, completed, priority, category";

const USER_COLUMNS: &str = "id, username, email, password_hash, date_joined";

pub async fn fetch_todos(db: &SqlitePool, owner_id: i64) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_todos_by_category(
    db: &SqlitePool,
    owner_id: i64,
    category: &str,
) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? AND category = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(owner_id)
    .bind(category)
    .fetch_all(db)
    .await
}

pub async fn fetch_categories(db: &SqlitePool, owner_id: i64) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT category
        FROM todos
        WHERE user_id = ? AND category IS NOT NULL AND category != ''
        "#,
    )
    .bind(owner_id)
    .fetch_all(db)
    .await
}

pub async fn find_todo(
    db: &SqlitePool,
    owner_id: i64,
    id: i64,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
}

/// Expects a request that already passed validation.
pub async fn insert_todo(
    db: &SqlitePool,
    owner_id: i64,
    req: NewTodoRequest,
) -> Result<Todo, sqlx::Error> {
    let now = Utc::now();
    let priority = req.priority();
    let completed = req.completed.unwrap_or(false);
    let title = req.title.unwrap_or_default();

    let id = sqlx::query(
        r#"
        INSERT INTO todos
            (user_id, title, description, created_at, updated_at,
            due_date, completed, priority, category)
        VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(owner_id)
    .bind(&title)
    .bind(&req.description)
    .bind(now)
    .bind(req.due_date)
    .bind(completed)
    .bind(priority)
    .bind(&req.category)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Todo {
        id,
        title,
        description: req.description,
        created_at: now,
        updated_at: now,
        due_date: req.due_date,
        completed,
        priority,
        category: req.category,
    })
}

pub async fn update_todo(
    db: &SqlitePool,
    owner_id: i64,
    id: i64,
    req: UpdateTodoRequest,
) -> Result<Option<Todo>, sqlx::Error> {
    let mut current = match find_todo(db, owner_id, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(priority) = req.priority() {
        current.priority = priority;
    }
    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(due_date) = req.due_date {
        current.due_date = due_date;
    }
    if let Some(category) = req.category {
        current.category = category;
    }
    if let Some(completed) = req.completed {
        current.completed = completed;
    }
    current.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE todos
        SET title = ?1,
            description = ?2,
            due_date = ?3,
            completed = ?4,
            priority = ?5,
            category = ?6,
            updated_at = ?7
        WHERE id = ?8 AND user_id = ?9
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.due_date)
    .bind(current.completed)
    .bind(current.priority)
    .bind(&current.category)
    .bind(current.updated_at)
    .bind(id)
    .bind(owner_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn toggle_todo(db: &SqlitePool, owner_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE todos
        SET completed = NOT completed,
            updated_at = ?1
        WHERE id = ?2 AND user_id = ?3
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(owner_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_todo(db: &SqlitePool, owner_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn find_user_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(db)
    .await
}

/// `except` lets a user keep their own name during a profile update.
pub async fn username_taken(
    db: &SqlitePool,
    username: &str,
    except: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND id != ?",
    )
    .bind(username)
    .bind(except.unwrap_or(-1))
    .fetch_one(db)
    .await?;

    Ok(count > 0)
}

pub async fn insert_user(
    db: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, date_joined)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        date_joined: now,
    })
}

/// Fields left as `None` keep their stored value.
pub async fn update_user(
    db: &SqlitePool,
    id: i64,
    username: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET username = COALESCE(?1, username),
            email = COALESCE(?2, email),
            password_hash = COALESCE(?3, password_hash)
        WHERE id = ?4
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    if result == 0 {
        return Ok(None);
    }
    find_user_by_id(db, id).await
}
