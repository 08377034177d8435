//! Axum route handler for publishing a generated site.

use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::deploy::{DeployError, DeployState};
use crate::errors::AppError;
use crate::generation::records;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub url: Option<String>,
    pub site_id: String,
    pub deploy_id: Option<String>,
    pub state: DeployState,
}

/// POST /api/v1/sites/:id/deploy
///
/// Blocks until the hosting API reports a terminal state. Only a `ready` deploy is
/// recorded; anything else is a 502 and the site can be deployed again.
pub async fn handle_deploy(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(request): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, AppError> {
    let mut site = records::fetch_site(&state.db, site_id, request.user_id).await?;
    let output_dir = match (&site.output_dir, site.is_pending()) {
        (Some(dir), false) => PathBuf::from(dir),
        _ => {
            return Err(AppError::Validation(format!(
                "Portfolio {site_id} has not finished generating"
            )))
        }
    };
    let user = records::fetch_user(&state.db, site.user_id).await?;

    let report = state.deployer.deploy(&user.username, output_dir).await?;

    if !site.record_publication(&report) {
        return Err(DeployError::Unsuccessful {
            deploy_id: report.deploy_id.unwrap_or_default(),
            state: report.state,
        }
        .into());
    }
    records::save_publication(&state.db, &site).await?;

    info!("Portfolio {site_id}: published at {:?}", report.url);
    Ok(Json(DeployResponse {
        url: report.url,
        site_id: report.site_id,
        deploy_id: report.deploy_id,
        state: report.state,
    }))
}
