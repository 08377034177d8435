use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The parts of a user that appear on a generated site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub full_name: Option<String>,
}

impl Profile {
    /// Full name when set and non-blank, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

impl From<&UserRow> for Profile {
    fn from(user: &UserRow) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
        }
    }
}
