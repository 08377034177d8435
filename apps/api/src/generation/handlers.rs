//! Axum route handlers for the Sites API: trigger generation, poll it, then view, edit or
//! delete the result.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::pipeline::GenerationJob;
use crate::generation::records;
use crate::generation::status::{RunStatus, StatusReport, StatusStore};
use crate::models::resume::ResumeRow;
use crate::models::site::GeneratedSiteRow;
use crate::models::template::TemplateRow;
use crate::models::user::{Profile, UserRow};
use crate::render::clean_html;
use crate::resumes::storage::get_resume;
use crate::site::{remove_site, write_index};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub resume_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub site_id: Uuid,
    pub status_url: String,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EditHtmlRequest {
    pub user_id: Uuid,
    pub html_content: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sites
///
/// Reserves a worker, records a pending site and returns immediately; the client polls
/// `status_url`. Rejected with 503 when every worker is busy.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    let slot = state.workers.try_reserve().ok_or(AppError::Busy)?;

    let user = records::fetch_user(&state.db, request.user_id).await?;
    let template = records::fetch_active_template(&state.db, request.template_id).await?;
    let resume = records::fetch_resume(&state.db, request.resume_id, user.id).await?;

    let site_id = Uuid::new_v4();
    records::insert_pending_site(&state.db, site_id, &user, &template, &resume).await?;
    if let Err(e) = state
        .statuses
        .set(user.id, site_id, StatusReport::processing())
        .await
    {
        // Without a status the run cannot be polled; drop the pending row with it.
        if let Err(delete_err) = records::delete_site(&state.db, site_id).await {
            error!("Run {site_id}: could not remove pending record: {delete_err}");
        }
        return Err(e.into());
    }

    info!(
        "Run {site_id}: generating '{}' for {} ({} workers free)",
        template.name,
        user.username,
        state.workers.available()
    );

    let user_id = user.id;
    let task_state = state.clone();
    state.workers.spawn(slot, async move {
        execute_run(task_state, site_id, user, template, resume).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            site_id,
            status_url: format!("/api/v1/sites/{site_id}/status?user_id={user_id}"),
        }),
    ))
}

/// Background body of one run. A failed run leaves an `error` status and no record.
async fn execute_run(
    state: AppState,
    site_id: Uuid,
    user: UserRow,
    template: TemplateRow,
    resume: ResumeRow,
) {
    let report = match run_generation(&state, site_id, &user, &template, &resume).await {
        Ok(()) => {
            info!("Run {site_id}: completed");
            StatusReport::completed()
        }
        Err(e) => {
            error!("Run {site_id}: failed: {e}");
            if let Err(e) = records::delete_site(&state.db, site_id).await {
                error!("Run {site_id}: could not remove pending record: {e}");
            }
            StatusReport::new(RunStatus::Error, e.to_string())
        }
    };

    if let Err(e) = state.statuses.set(user.id, site_id, report).await {
        warn!("Run {site_id}: could not record status: {e}");
    }
}

async fn run_generation(
    state: &AppState,
    site_id: Uuid,
    user: &UserRow,
    template: &TemplateRow,
    resume: &ResumeRow,
) -> Result<(), AppError> {
    let resume_bytes = get_resume(&state.s3, &state.config.s3_bucket, &resume.s3_key)
        .await
        .map_err(|e| AppError::S3(e.to_string()))?;

    let portfolio = state
        .generator
        .run(GenerationJob {
            site_id,
            profile: Profile::from(user),
            template_name: template.name.clone(),
            resume_bytes,
        })
        .await
        .map_err(|e| AppError::Generation(e.to_string()))?;

    records::save_generated(
        &state.db,
        site_id,
        &portfolio.content,
        &portfolio.output_dir.to_string_lossy(),
        &format!("Portfolio generated from {}", resume.name),
    )
    .await
}

/// GET /api/v1/sites/:id/status?user_id=
pub async fn handle_status(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<StatusReport>, AppError> {
    let stored = state.statuses.get(params.user_id, site_id).await?;
    let site = match &stored {
        Some(_) => None,
        None => records::find_site(&state.db, site_id, params.user_id).await?,
    };
    Ok(Json(resolve_status(stored, site.as_ref())))
}

/// A stored status wins. Without one, a finished record reads as completed, and a record
/// still pending has lost its run (status expired or never written).
fn resolve_status(stored: Option<StatusReport>, site: Option<&GeneratedSiteRow>) -> StatusReport {
    match (stored, site) {
        (Some(report), _) => report,
        (None, Some(site)) if site.is_pending() => StatusReport::new(
            RunStatus::Error,
            "Portfolio generation did not finish; please try again",
        ),
        (None, Some(_)) => StatusReport::completed(),
        (None, None) => StatusReport::not_found(),
    }
}

/// GET /api/v1/sites?user_id=
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<GeneratedSiteRow>>, AppError> {
    Ok(Json(records::list_sites(&state.db, params.user_id).await?))
}

/// GET /api/v1/sites/:id/view?user_id=
///
/// Serves the stored page. Framing is limited to the same origin so the app can preview it.
pub async fn handle_view(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site = records::fetch_site(&state.db, site_id, params.user_id).await?;
    let content = site
        .generated()
        .ok_or_else(|| AppError::NotFound(format!("Portfolio {site_id} is not ready yet")))?;

    Ok((
        [(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        )],
        Html(content.html_content),
    ))
}

/// PUT /api/v1/sites/:id/html
///
/// Replaces the page with user-edited HTML. Scripts are stripped and head-less fragments
/// wrapped before the page is stored and rewritten on disk.
pub async fn handle_edit_html(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(request): Json<EditHtmlRequest>,
) -> Result<Json<GeneratedSiteRow>, AppError> {
    if request.html_content.trim().is_empty() {
        return Err(AppError::Validation(
            "html_content cannot be empty".to_string(),
        ));
    }

    let mut site = records::fetch_site(&state.db, site_id, request.user_id).await?;
    let mut content = site
        .generated()
        .ok_or_else(|| AppError::NotFound(format!("Portfolio {site_id} is not ready yet")))?;

    content.html_content = clean_html(&request.html_content);

    if let Some(dir) = site.output_dir.clone() {
        let html = content.html_content.clone();
        tokio::task::spawn_blocking(move || write_index(std::path::Path::new(&dir), &html))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("write task failed: {e}")))??;
    }

    let value = serde_json::to_value(&content).map_err(|e| AppError::Internal(e.into()))?;
    records::replace_content(&state.db, site_id, value.clone()).await?;
    site.content = Some(value);

    info!("Portfolio {site_id}: HTML replaced by user edit");
    Ok(Json(site))
}

/// DELETE /api/v1/sites/:id?user_id=
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let site = records::fetch_site(&state.db, site_id, params.user_id).await?;

    if let Some(dir) = &site.output_dir {
        remove_site(std::path::Path::new(dir)).await?;
    }
    records::delete_site(&state.db, site_id).await?;

    info!("Portfolio {site_id}: deleted");
    Ok(StatusCode::NO_CONTENT)
}
