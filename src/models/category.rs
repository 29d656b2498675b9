use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Color assigned to a category when the client does not pick one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

/// A category as stored and returned by the API. Categories are scoped to
/// their owning user.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub user_id: i32,
}

/// Input for creating or fully updating a category.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Hex color like `#3B82F6`; defaults when omitted.
    #[validate(length(min = 4, max = 9))]
    pub color: Option<String>,
}

impl CategoryInput {
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR)
    }
}
