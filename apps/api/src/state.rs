use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::deploy::Deployer;
use crate::generation::pipeline::PortfolioGenerator;
use crate::generation::status::StatusStore;
use crate::generation::worker::GenerationWorkers;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Extract → synthesize → render → materialize, shared by all runs.
    pub generator: Arc<PortfolioGenerator>,
    pub deployer: Arc<Deployer>,
    /// Per-run status with expiry. Redis in production.
    pub statuses: Arc<dyn StatusStore>,
    /// Bounds concurrent generation runs; a full pool rejects new runs.
    pub workers: GenerationWorkers,
}
