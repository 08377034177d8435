//! Axum route handlers for the Resume API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::records::fetch_user;
use crate::models::resume::ResumeRow;
use crate::resumes::storage::{delete_resume, put_resume, resume_key};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// Fields collected from the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    user_id: Option<Uuid>,
    name: Option<String>,
    file_name: Option<String>,
    file: Option<Bytes>,
}

fn is_pdf_name(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// POST /api/v1/resumes
///
/// Multipart form: `user_id`, optional `name`, and a PDF `file`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        match field.name() {
            Some("user_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let id = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                form.user_id = Some(id);
            }
            Some("name") => {
                form.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?,
                );
            }
            Some("file") => {
                form.file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                form.file = Some(data);
            }
            _ => {}
        }
    }

    let user_id = form
        .user_id
        .ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let bytes = form
        .file
        .ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    let file_name = form.file_name.unwrap_or_default();
    if !is_pdf_name(&file_name) {
        return Err(AppError::Validation(
            "Only PDF resumes are supported".to_string(),
        ));
    }

    fetch_user(&state.db, user_id).await?;

    let name = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(file_name);

    let resume_id = Uuid::new_v4();
    let s3_key = resume_key(user_id, resume_id);
    let size_bytes = bytes.len() as i64;

    put_resume(&state.s3, &state.config.s3_bucket, &s3_key, bytes)
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;

    let row = sqlx::query_as::<_, ResumeRow>(
        r#"INSERT INTO resumes (id, user_id, name, s3_key, size_bytes)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(resume_id)
    .bind(user_id)
    .bind(&name)
    .bind(&s3_key)
    .bind(size_bytes)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Uploaded resume {resume_id} ({size_bytes} bytes) for user {user_id}");
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/resumes?user_id=
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let rows = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE user_id = $1 ORDER BY uploaded_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// DELETE /api/v1/resumes/:id?user_id=
///
/// Sites generated from this resume survive; their `resume_id` is nulled by the schema.
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let row = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
    )
    .bind(resume_id)
    .bind(params.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    delete_resume(&state.s3, &state.config.s3_bucket, &row.s3_key)
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;

    sqlx::query("DELETE FROM resumes WHERE id = $1")
        .bind(resume_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
