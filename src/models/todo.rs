use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the priority of a todo.
/// Corresponds to the `todo_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "todo_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A todo item as stored in the database and returned by the API.
///
/// `position` is server-managed: it is assigned on creation (append) and
/// rewritten by the reorder endpoint, and is unique and contiguous within
/// one user's todo set.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: i32,
    pub task: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set when `completed` transitions to true, cleared when it
    /// transitions back to false.
    pub completed_at: Option<DateTime<Utc>>,
    pub position: i32,
    pub user_id: i32,
    pub category_id: Option<i32>,
}

/// Input structure for creating a todo. `position` is not accepted from the
/// client; the server appends at the end of the list.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoInput {
    #[validate(length(min = 1, max = 200))]
    pub task: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to medium when omitted.
    pub priority: Option<Priority>,

    pub due_date: Option<DateTime<Utc>>,

    /// Must reference one of the caller's own categories when provided.
    pub category_id: Option<i32>,
}

/// Deserializes a field that was present, keeping `null` distinct from
/// absent: the outer `Option` is `Some` whenever the key appeared at all.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial-update payload for a todo.
///
/// Every field distinguishes absent from present; the nullable columns
/// (`description`, `due_date`, `category_id`) use a double `Option` so a
/// client can also clear them by sending an explicit `null`. Fields that
/// were absent leave the stored value untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    pub task: Option<String>,

    // Same cap as on creation; absent and null skip the check.
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub completed: Option<bool>,

    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i32>>,
}

/// Query parameters for filtering the todo list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TodoQuery {
    pub completed: Option<bool>,
    pub category_id: Option<i32>,
    pub priority: Option<Priority>,
    pub due_date_from: Option<DateTime<Utc>>,
    pub due_date_to: Option<DateTime<Utc>>,
}
