//! Database access for generation runs and the rows they depend on.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::models::site::{GeneratedContent, GeneratedSiteRow};
use crate::models::template::TemplateRow;
use crate::models::user::UserRow;

pub async fn fetch_user(db: &PgPool, user_id: Uuid) -> Result<UserRow, AppError> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

pub async fn fetch_active_template(db: &PgPool, template_id: Uuid) -> Result<TemplateRow, AppError> {
    sqlx::query_as::<_, TemplateRow>(
        "SELECT * FROM portfolio_templates WHERE id = $1 AND is_active",
    )
    .bind(template_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Template {template_id} not found")))
}

pub async fn fetch_resume(db: &PgPool, resume_id: Uuid, user_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

pub async fn fetch_site(db: &PgPool, site_id: Uuid, user_id: Uuid) -> Result<GeneratedSiteRow, AppError> {
    find_site(db, site_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio {site_id} not found")))
}

pub async fn find_site(
    db: &PgPool,
    site_id: Uuid,
    user_id: Uuid,
) -> Result<Option<GeneratedSiteRow>, sqlx::Error> {
    sqlx::query_as::<_, GeneratedSiteRow>(
        "SELECT * FROM generated_sites WHERE id = $1 AND user_id = $2",
    )
    .bind(site_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn list_sites(db: &PgPool, user_id: Uuid) -> Result<Vec<GeneratedSiteRow>, sqlx::Error> {
    sqlx::query_as::<_, GeneratedSiteRow>(
        "SELECT * FROM generated_sites WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Inserts the placeholder row a client polls while the run is in flight.
pub async fn insert_pending_site(
    db: &PgPool,
    site_id: Uuid,
    user: &UserRow,
    template: &TemplateRow,
    resume: &ResumeRow,
) -> Result<GeneratedSiteRow, sqlx::Error> {
    sqlx::query_as::<_, GeneratedSiteRow>(
        r#"INSERT INTO generated_sites (id, user_id, template_id, resume_id, title, description)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(site_id)
    .bind(user.id)
    .bind(template.id)
    .bind(resume.id)
    .bind(format!("{}'s Portfolio", user.username))
    .bind("Portfolio generation in progress...")
    .fetch_one(db)
    .await
}

pub async fn save_generated(
    db: &PgPool,
    site_id: Uuid,
    content: &GeneratedContent,
    output_dir: &str,
    description: &str,
) -> Result<(), AppError> {
    let content = serde_json::to_value(content).map_err(|e| AppError::Internal(e.into()))?;
    sqlx::query(
        r#"UPDATE generated_sites
           SET content = $2, output_dir = $3, description = $4, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(site_id)
    .bind(content)
    .bind(output_dir)
    .bind(description)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn replace_content(db: &PgPool, site_id: Uuid, content: Value) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE generated_sites SET content = $2, updated_at = NOW() WHERE id = $1")
        .bind(site_id)
        .bind(content)
        .execute(db)
        .await?;
    Ok(())
}

/// Persists the publish fields set by `GeneratedSiteRow::record_publication`.
pub async fn save_publication(db: &PgPool, site: &GeneratedSiteRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE generated_sites
           SET is_published = $2, remote_site_id = $3, remote_deploy_id = $4,
               public_url = $5, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(site.id)
    .bind(site.is_published)
    .bind(&site.remote_site_id)
    .bind(&site.remote_deploy_id)
    .bind(&site.public_url)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_site(db: &PgPool, site_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM generated_sites WHERE id = $1")
        .bind(site_id)
        .execute(db)
        .await?;
    Ok(())
}
