mod catalog;
mod config;
mod db;
mod deploy;
mod errors;
mod generation;
mod llm_client;
mod models;
mod render;
mod resumes;
mod routes;
mod site;
mod state;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::deploy::{DeploySettings, Deployer, NetlifyClient};
use crate::generation::pipeline::PortfolioGenerator;
use crate::generation::status::RedisStatusStore;
use crate::generation::synthesizer::{ContentSynthesizer, RetryPolicy};
use crate::generation::worker::GenerationWorkers;
use crate::llm_client::LlmClient;
use crate::render::TemplateStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis-backed run status store
    let redis = redis::Client::open(config.redis_url.clone())?;
    let statuses = RedisStatusStore::connect(&redis, Duration::from_secs(config.status_ttl_secs))
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis status store initialized (ttl {}s)", config.status_ttl_secs);

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone())
        .context("GEMINI_API_KEY is required for content generation")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let templates = TemplateStore::new(&config.templates_dir);
    info!("Templates root: {}", templates.root().display());

    let generator = PortfolioGenerator::new(
        ContentSynthesizer::new(Arc::new(llm), RetryPolicy::default()),
        templates,
        &config.media_root,
    );

    // Initialize hosting client
    let netlify = NetlifyClient::new(config.netlify_token.clone())
        .context("NETLIFY_TOKEN is required for publishing")?;
    let deployer = Deployer::new(
        Arc::new(netlify),
        DeploySettings {
            poll_interval: Duration::from_secs(config.deploy_poll_interval_secs),
            timeout: Duration::from_secs(config.deploy_timeout_secs),
        },
    );

    let workers = GenerationWorkers::new(config.max_concurrent_generations);
    info!("Generation workers: {}", workers.capacity());

    // Build app state
    let state = AppState {
        db,
        s3,
        config: config.clone(),
        generator: Arc::new(generator),
        deployer: Arc::new(deployer),
        statuses: Arc::new(statuses),
        workers,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "folio-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
