use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::render::slugify;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TemplateRow {
    /// Directory name of this template under the templates root.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}
