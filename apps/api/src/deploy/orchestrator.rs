//! Deploy orchestration: resolve the user's site, upload the archive, poll to a terminal
//! state.
//!
//! ```text
//! not_deployed → site_resolved → uploading → {building|processing|uploading}* → ready
//!                                                                           ↘ error | failed | timeout | polling_error
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::deploy::archive::{build_archive_blocking, ArchiveError};
use crate::deploy::client::{CreateSite, HostingApi, HostingError, RemoteDeploy};

/// Wait before re-listing sites after a name conflict on create.
const CONFLICT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    NotDeployed,
    SiteResolved,
    Uploading,
    Building,
    Processing,
    Ready,
    Error,
    Failed,
    Timeout,
    PollingError,
}

impl DeployState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Error | Self::Failed | Self::Timeout | Self::PollingError
        )
    }

    /// Maps a remote deploy state string. `None` for states we do not know.
    fn from_remote(state: &str) -> Option<Self> {
        match state {
            "building" => Some(Self::Building),
            "uploading" => Some(Self::Uploading),
            "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready),
            "error" => Some(Self::Error),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeployState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotDeployed => "not_deployed",
            Self::SiteResolved => "site_resolved",
            Self::Uploading => "uploading",
            Self::Building => "building",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::PollingError => "polling_error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeploySettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Outcome of a deploy that got as far as an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployReport {
    pub state: DeployState,
    pub site_id: String,
    pub deploy_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("could not resolve hosting site '{name}': {reason}")]
    SiteResolution { name: String, reason: String },

    #[error("packaging failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("upload failed: {0}")]
    Upload(HostingError),

    #[error("deploy {deploy_id} ended in state '{state}'")]
    Unsuccessful { deploy_id: String, state: DeployState },
}

pub struct Deployer {
    api: Arc<dyn HostingApi>,
    settings: DeploySettings,
}

/// Hosting site name for a user: `<username>-site`, lowercased, `_` → `-`.
pub fn site_name(username: &str) -> String {
    format!("{username}-site").to_lowercase().replace('_', "-")
}

impl Deployer {
    pub fn new(api: Arc<dyn HostingApi>, settings: DeploySettings) -> Self {
        Self { api, settings }
    }

    /// Publishes `site_dir` under the user's site. Returns a report for every run that
    /// reached the upload, successful or not; callers persist only `Ready` reports.
    pub async fn deploy(
        &self,
        username: &str,
        site_dir: PathBuf,
    ) -> Result<DeployReport, DeployError> {
        let name = site_name(username);
        let site_id = self.resolve_site(&name).await?;
        info!("Deploy [{}]: '{name}' → {site_id}", DeployState::SiteResolved);

        let archive = build_archive_blocking(site_dir).await?;
        info!(
            "Deploy [{}]: {} byte archive to {site_id}",
            DeployState::Uploading,
            archive.len()
        );

        let uploaded = self
            .api
            .upload_deploy(&site_id, archive)
            .await
            .map_err(DeployError::Upload)?;

        let (state, last_seen) = self.poll(&uploaded.id).await;
        let url = last_seen
            .as_ref()
            .and_then(RemoteDeploy::public_url)
            .or_else(|| uploaded.public_url())
            .map(str::to_string);

        if state == DeployState::Ready {
            info!("Deploy {} is live at {:?}", uploaded.id, url);
        } else {
            warn!("Deploy {} ended in state '{state}'", uploaded.id);
        }

        Ok(DeployReport {
            state,
            site_id,
            deploy_id: Some(uploaded.id),
            url,
        })
    }

    async fn resolve_site(&self, name: &str) -> Result<String, DeployError> {
        let resolution_error = |reason: String| DeployError::SiteResolution {
            name: name.to_string(),
            reason,
        };

        if let Some(id) = self.find_site(name).await.map_err(|e| resolution_error(e.to_string()))? {
            return Ok(id);
        }

        match self
            .api
            .create_site(name)
            .await
            .map_err(|e| resolution_error(e.to_string()))?
        {
            CreateSite::Created(site) => Ok(site.id),
            CreateSite::Conflict => {
                warn!("Site '{name}' was created concurrently; re-listing");
                tokio::time::sleep(CONFLICT_RETRY_DELAY).await;
                self.find_site(name)
                    .await
                    .map_err(|e| resolution_error(e.to_string()))?
                    .ok_or_else(|| resolution_error("name is taken by another account".to_string()))
            }
        }
    }

    async fn find_site(&self, name: &str) -> Result<Option<String>, HostingError> {
        Ok(self
            .api
            .list_sites()
            .await?
            .into_iter()
            .find(|site| site.name == name)
            .map(|site| site.id))
    }

    /// Polls until a terminal state. Returns the state and the last decoded payload.
    async fn poll(&self, deploy_id: &str) -> (DeployState, Option<RemoteDeploy>) {
        let started = Instant::now();
        let mut last_seen = None;

        loop {
            if started.elapsed() >= self.settings.timeout {
                warn!("Deploy {deploy_id} timed out after {:?}", self.settings.timeout);
                return (DeployState::Timeout, last_seen);
            }

            match self.api.get_deploy(deploy_id).await {
                Ok(deploy) => {
                    let remote = deploy.state.clone().unwrap_or_default();
                    let state = DeployState::from_remote(&remote);
                    last_seen = Some(deploy);
                    match state {
                        Some(state) if state.is_terminal() => return (state, last_seen),
                        Some(state) => info!("Deploy {deploy_id} is {state}"),
                        None => warn!("Deploy {deploy_id} reported unknown state '{remote}'"),
                    }
                }
                Err(HostingError::Decode(e)) => {
                    warn!("Deploy {deploy_id} status could not be decoded: {e}");
                    return (DeployState::PollingError, last_seen);
                }
                Err(e) => warn!("Polling deploy {deploy_id} failed: {e}; will retry"),
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}
