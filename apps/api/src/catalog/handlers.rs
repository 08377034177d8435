//! Axum route handlers for the Template catalog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::template::TemplateRow;
use crate::render::store::ENTRY_FILE;
use crate::render::slugify;
use crate::state::AppState;

const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub description: Option<String>,
    pub version: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if slugify(name).is_empty() {
        return Err(AppError::Validation(
            "name must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// GET /api/v1/templates
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<TemplateRow>>, AppError> {
    let rows = sqlx::query_as::<_, TemplateRow>(
        "SELECT * FROM portfolio_templates WHERE is_active ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// POST /api/v1/templates
pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateRow>), AppError> {
    let name = validate_name(&req.name)?;

    let row = sqlx::query_as::<_, TemplateRow>(
        r#"INSERT INTO portfolio_templates (id, name, description, version, is_active)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&req.description)
    .bind(req.version.as_deref().unwrap_or(DEFAULT_VERSION))
    .bind(req.is_active.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(format!("A template named '{name}' already exists"))
        }
        _ => AppError::Database(e),
    })?;

    let entry = state
        .generator
        .templates()
        .directory_for(&row.slug())
        .join(ENTRY_FILE);
    if tokio::fs::metadata(&entry).await.is_err() {
        warn!(
            "Template '{}' has no {} on disk; generation will use the default",
            row.name,
            entry.display()
        );
    }

    info!("Created template '{}' ({})", row.name, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/v1/templates/:id
///
/// Absent fields keep their current value.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateRow>, AppError> {
    let row = sqlx::query_as::<_, TemplateRow>(
        r#"UPDATE portfolio_templates
           SET description = COALESCE($2, description),
               version = COALESCE($3, version),
               is_active = COALESCE($4, is_active)
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(&req.description)
    .bind(&req.version)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))?;

    Ok(Json(row))
}
