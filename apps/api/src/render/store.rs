//! Template store: resolves a template name to its parsed entry document and asset tree.
//!
//! Layout: `<root>/<slug>/index.html` plus any CSS/JS/image assets beside it.
//! A missing or unparsable template falls back to `creative_professional`; if that is
//! absent on disk too, the copy compiled into the binary is used (without assets).

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::render::template::{Template, TemplateError};

pub const DEFAULT_TEMPLATE: &str = "creative_professional";
pub const ENTRY_FILE: &str = "index.html";

const EMBEDDED_DEFAULT: &str =
    include_str!("../../templates/portfolios/creative_professional/index.html");

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("template file not found at {path}: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template at {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

/// A template ready for rendering.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub slug: String,
    /// Directory whose files are copied next to the rendered page. `None` for the embedded default.
    pub asset_dir: Option<PathBuf>,
    pub template: Template,
    /// True when the requested template could not be used.
    pub fell_back: bool,
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

/// Normalizes a name (template or username) into a filesystem-safe slug:
/// lowercase, spaces → `_`, anything outside `[a-z0-9_-]` dropped.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directory_for(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    /// Loads the named template, falling back to the default. Only fails if the embedded
    /// default itself cannot be parsed.
    pub async fn load(&self, name: &str) -> Result<LoadedTemplate, TemplateError> {
        let slug = slugify(name);
        if !slug.is_empty() && slug != DEFAULT_TEMPLATE {
            match self.read(&slug).await {
                Ok(template) => {
                    return Ok(LoadedTemplate {
                        asset_dir: Some(self.directory_for(&slug)),
                        slug,
                        template,
                        fell_back: false,
                    })
                }
                Err(e) => warn!("{e}; falling back to '{DEFAULT_TEMPLATE}'"),
            }
        }

        let mut loaded = self.load_default().await?;
        loaded.fell_back |= slug != DEFAULT_TEMPLATE;
        Ok(loaded)
    }

    /// Loads the canonical default template from disk, or the embedded copy.
    pub async fn load_default(&self) -> Result<LoadedTemplate, TemplateError> {
        match self.read(DEFAULT_TEMPLATE).await {
            Ok(template) => Ok(LoadedTemplate {
                slug: DEFAULT_TEMPLATE.to_string(),
                asset_dir: Some(self.directory_for(DEFAULT_TEMPLATE)),
                template,
                fell_back: false,
            }),
            Err(e) => {
                warn!("{e}; using embedded default template");
                Self::load_embedded()
            }
        }
    }

    /// The default template compiled into the binary. It has no assets.
    pub fn load_embedded() -> Result<LoadedTemplate, TemplateError> {
        Ok(LoadedTemplate {
            slug: DEFAULT_TEMPLATE.to_string(),
            asset_dir: None,
            template: Template::parse(EMBEDDED_DEFAULT)?,
            fell_back: true,
        })
    }

    /// Next template to try after `failed` could not be rendered: the default, then the
    /// embedded copy. `None` once the embedded copy itself has failed.
    pub async fn fallback_after(
        &self,
        failed: &LoadedTemplate,
    ) -> Option<Result<LoadedTemplate, TemplateError>> {
        if failed.asset_dir.is_none() {
            None
        } else if failed.slug != DEFAULT_TEMPLATE {
            Some(self.load_default().await)
        } else {
            Some(Self::load_embedded())
        }
    }

    async fn read(&self, slug: &str) -> Result<Template, TemplateLoadError> {
        let path = self.directory_for(slug).join(ENTRY_FILE);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateLoadError::Missing {
                path: path.clone(),
                source,
            })?;
        Template::parse(&source).map_err(|source| TemplateLoadError::Invalid { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_template(root: &Path, slug: &str, html: &str) {
        let dir = root.join(slug);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ENTRY_FILE), html).unwrap();
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Creative Professional"), "creative_professional");
        assert_eq!(slugify("  Dark Mode v2! "), "dark_mode_v2");
        assert_eq!(slugify("../../etc"), "etc");
    }

    #[test]
    fn test_embedded_default_is_valid() {
        let template = Template::parse(EMBEDDED_DEFAULT).unwrap();
        let regions: Vec<_> = template.region_names().into_iter().collect();
        assert_eq!(regions, vec!["experience", "projects", "skills"]);
    }

    #[tokio::test]
    async fn test_load_named_template() {
        let root = tempfile::tempdir().unwrap();
        write_template(root.path(), "minimal_dark", "<h1>{{ about.title }}</h1>");

        let store = TemplateStore::new(root.path());
        let loaded = store.load("Minimal Dark").await.unwrap();
        assert_eq!(loaded.slug, "minimal_dark");
        assert!(!loaded.fell_back);
        assert_eq!(loaded.asset_dir, Some(root.path().join("minimal_dark")));
    }

    #[tokio::test]
    async fn test_missing_template_falls_back_to_default_on_disk() {
        let root = tempfile::tempdir().unwrap();
        write_template(root.path(), DEFAULT_TEMPLATE, "<p>{{ about.description }}</p>");

        let loaded = TemplateStore::new(root.path())
            .load("Does Not Exist")
            .await
            .unwrap();
        assert_eq!(loaded.slug, DEFAULT_TEMPLATE);
        assert!(loaded.fell_back);
        assert_eq!(loaded.asset_dir, Some(root.path().join(DEFAULT_TEMPLATE)));
    }

    #[tokio::test]
    async fn test_fallback_chain_ends_at_embedded_copy() {
        let root = tempfile::tempdir().unwrap();
        write_template(root.path(), "minimal_dark", "<h1>{{ about.title }}</h1>");
        write_template(root.path(), DEFAULT_TEMPLATE, "<p>{{ about.description }}</p>");
        let store = TemplateStore::new(root.path());

        let requested = store.load("Minimal Dark").await.unwrap();
        let default = store.fallback_after(&requested).await.unwrap().unwrap();
        assert_eq!(default.asset_dir, Some(root.path().join(DEFAULT_TEMPLATE)));

        let embedded = store.fallback_after(&default).await.unwrap().unwrap();
        assert_eq!(embedded.slug, DEFAULT_TEMPLATE);
        assert!(embedded.asset_dir.is_none());
        assert!(embedded.fell_back);

        assert!(store.fallback_after(&embedded).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_template_falls_back() {
        let root = tempfile::tempdir().unwrap();
        write_template(root.path(), "broken", "{% for x in xs %}never closed");

        let loaded = TemplateStore::new(root.path()).load("broken").await.unwrap();
        assert!(loaded.fell_back);
        assert_eq!(loaded.slug, DEFAULT_TEMPLATE);
        // Nothing on disk for the default either, so the embedded copy is used.
        assert!(loaded.asset_dir.is_none());
    }
}
