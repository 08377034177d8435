use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::deploy::{DeployReport, DeployState};
use crate::generation::sections::SectionPayload;

/// A generated portfolio. Inserted pending (no `content`) before the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedSiteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<Value>,
    pub output_dir: Option<String>,
    pub is_published: bool,
    pub remote_site_id: Option<String>,
    pub remote_deploy_id: Option<String>,
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// JSON stored in `generated_sites.content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub html_content: String,
    pub raw_content: SectionPayload,
    pub model_used: String,
    #[serde(default)]
    pub fallback: bool,
}

impl GeneratedSiteRow {
    /// Decoded content, `None` while the run is still pending.
    pub fn generated(&self) -> Option<GeneratedContent> {
        let value = self.content.clone()?;
        match serde_json::from_value(value) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!("Site {} has undecodable content: {e}", self.id);
                None
            }
        }
    }

    pub fn deploy_state(&self) -> DeployState {
        if self.is_published {
            DeployState::Ready
        } else {
            DeployState::NotDeployed
        }
    }

    pub fn is_pending(&self) -> bool {
        self.content.is_none()
    }

    /// Copies a successful publish onto the record. Any non-ready outcome leaves it
    /// untouched; returns whether the record changed.
    pub fn record_publication(&mut self, report: &DeployReport) -> bool {
        if report.state != DeployState::Ready {
            return false;
        }
        self.remote_site_id = Some(report.site_id.clone());
        self.remote_deploy_id = report.deploy_id.clone();
        self.public_url = report.url.clone();
        self.is_published = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_site() -> GeneratedSiteRow {
        let now = Utc::now();
        GeneratedSiteRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            resume_id: None,
            title: "Portfolio".to_string(),
            description: None,
            content: None,
            output_dir: None,
            is_published: false,
            remote_site_id: None,
            remote_deploy_id: None,
            public_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn report(state: DeployState) -> DeployReport {
        DeployReport {
            state,
            site_id: "site-1".to_string(),
            deploy_id: Some("dep-1".to_string()),
            url: Some("https://ada-site.netlify.app".to_string()),
        }
    }

    #[test]
    fn test_ready_report_marks_published() {
        let mut site = pending_site();
        assert!(site.record_publication(&report(DeployState::Ready)));
        assert!(site.is_published);
        assert_eq!(site.deploy_state(), DeployState::Ready);
        assert_eq!(site.remote_site_id.as_deref(), Some("site-1"));
        assert_eq!(site.remote_deploy_id.as_deref(), Some("dep-1"));
        assert_eq!(
            site.public_url.as_deref(),
            Some("https://ada-site.netlify.app")
        );
    }

    #[test]
    fn test_failed_report_leaves_record_untouched() {
        for state in [
            DeployState::Error,
            DeployState::Failed,
            DeployState::Timeout,
            DeployState::PollingError,
        ] {
            let mut site = pending_site();
            assert!(!site.record_publication(&report(state)));
            assert!(!site.is_published);
            assert!(site.remote_site_id.is_none());
            assert!(site.public_url.is_none());
        }
    }

    #[test]
    fn test_generated_content_roundtrip() {
        let mut site = pending_site();
        assert!(site.is_pending());
        assert!(site.generated().is_none());

        let content = GeneratedContent {
            html_content: "<html></html>".to_string(),
            raw_content: SectionPayload::fallback(),
            model_used: "gemini-1.5-pro".to_string(),
            fallback: true,
        };
        site.content = Some(serde_json::to_value(&content).unwrap());
        assert_eq!(site.generated(), Some(content));
    }
}
