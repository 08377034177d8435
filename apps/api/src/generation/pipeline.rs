//! Generation pipeline: extract → synthesize → render → materialize, strictly in order.
//! Persistence and status bookkeeping live with the caller (see `handlers`).

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::generation::extractor::extract_text_blocking;
use crate::generation::synthesizer::{ContentSynthesizer, GenerationError};
use crate::models::site::GeneratedContent;
use crate::models::user::Profile;
use crate::render::{render_portfolio, RenderOptions, TemplateError, TemplateStore};
use crate::site::{self, SiteError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("template rendering failed: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Site(#[from] SiteError),
}

/// Everything one run needs, owned so it can move into a background task.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub site_id: Uuid,
    pub profile: Profile,
    pub template_name: String,
    pub resume_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GeneratedPortfolio {
    pub content: GeneratedContent,
    pub output_dir: PathBuf,
    /// Slug of the template actually rendered (differs from the request after a fallback).
    pub template_slug: String,
}

pub struct PortfolioGenerator {
    synthesizer: ContentSynthesizer,
    templates: TemplateStore,
    media_root: PathBuf,
}

impl PortfolioGenerator {
    pub fn new(
        synthesizer: ContentSynthesizer,
        templates: TemplateStore,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            templates,
            media_root: media_root.into(),
        }
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub async fn run(&self, job: GenerationJob) -> Result<GeneratedPortfolio, PipelineError> {
        let GenerationJob {
            site_id,
            profile,
            template_name,
            resume_bytes,
        } = job;

        let resume_text = extract_text_blocking(resume_bytes).await;
        info!(
            "Run {site_id}: extracted {} characters of resume text",
            resume_text.len()
        );

        let synthesis = self
            .synthesizer
            .synthesize(&resume_text, &profile, &template_name)
            .await?;

        let options = RenderOptions::current();
        let mut loaded = self.templates.load(&template_name).await?;
        let html = loop {
            match render_portfolio(&loaded.template, &synthesis.sections, &profile, &options) {
                Ok(html) => break html,
                Err(e) => match self.templates.fallback_after(&loaded).await {
                    Some(next) => {
                        let next = next?;
                        warn!(
                            "Run {site_id}: template '{}' failed to render ({e}); trying {}",
                            loaded.slug,
                            if next.asset_dir.is_some() { "default" } else { "embedded default" }
                        );
                        loaded = next;
                    }
                    None => return Err(e.into()),
                },
            }
        };

        let output_dir = site::output_dir(&self.media_root, &profile.username, &loaded.slug, site_id);
        site::materialize_blocking(html.clone(), loaded.asset_dir.clone(), output_dir.clone())
            .await?;

        Ok(GeneratedPortfolio {
            content: GeneratedContent {
                html_content: html,
                raw_content: synthesis.sections,
                model_used: synthesis.model_used,
                fallback: synthesis.fallback,
            },
            output_dir,
            template_slug: loaded.slug,
        })
    }
}
