use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            other => Err(ValidationError::new("invalid_choice")
                .with_message(format!("\"{}\" is not a valid choice.", other).into())),
        }
    }
}

/// A stored to-do as it goes over the wire. The owner is implied by the query
/// that loaded it and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub priority: Priority,
    pub category: Option<String>,
}

/// Body of POST. `title` and `priority` are optional here only so that their
/// absence surfaces as a field error; run `check()` before using the values.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTodoRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "This field is required."),
        custom(function = "validate_title")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl NewTodoRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        check_priority(self.validate(), &self.priority)
    }

    /// Only meaningful after `check()` succeeded.
    pub fn priority(&self) -> Priority {
        parse_priority(&self.priority).unwrap_or_default()
    }
}

/// Body of PUT/PATCH. Nullable columns use `Option<Option<_>>` so an explicit
/// `null` clears the value while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl UpdateTodoRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        check_priority(self.validate(), &self.priority)
    }

    pub fn priority(&self) -> Option<Priority> {
        parse_priority(&self.priority)
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::new("blank").with_message("This field may not be blank.".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::new("max_length").with_message(
            format!(
                "Ensure this field has no more than {} characters.",
                TITLE_MAX_CHARS
            )
            .into(),
        ));
    }
    Ok(())
}

/// `priority` is not nullable: an explicit `null` is rejected rather than
/// falling back to the default.
fn check_priority(
    result: Result<(), ValidationErrors>,
    priority: &Option<Option<String>>,
) -> Result<(), ValidationErrors> {
    let error = match priority {
        None => None,
        Some(None) => Some(
            ValidationError::new("null").with_message("This field may not be null.".into()),
        ),
        Some(Some(value)) => value.parse::<Priority>().err(),
    };

    let Some(error) = error else {
        return result;
    };
    let mut errors = result.err().unwrap_or_default();
    errors.add("priority", error);
    Err(errors)
}

fn parse_priority(priority: &Option<Option<String>>) -> Option<Priority> {
    priority.as_ref()?.as_deref()?.parse().ok()
}

fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
