//! Site materialization: a rendered page plus the template's static assets, laid out in a
//! per-run output directory.
//!
//! Layout: `<media_root>/portfolios/<user_slug>/<template_slug>/<site_id>/`
//! - `index.html` is always the rendered page; a template's own `index.html` is never copied.
//! - every other file under the template directory is copied byte-for-byte to the same
//!   relative path.
//!
//! Writes overwrite in place, so re-materializing a run is idempotent.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::render::slugify;

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("site task failed: {0}")]
    Join(String),
}

impl SiteError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSite {
    pub output_dir: PathBuf,
    pub assets_copied: usize,
}

/// Per-run output directory for a generated site.
pub fn output_dir(media_root: &Path, username: &str, template_slug: &str, site_id: Uuid) -> PathBuf {
    let user_slug = match slugify(username) {
        slug if slug.is_empty() => "user".to_string(),
        slug => slug,
    };
    media_root
        .join("portfolios")
        .join(user_slug)
        .join(template_slug)
        .join(site_id.to_string())
}

/// Writes `html` as the site's `index.html` and mirrors every other file from `asset_dir`.
pub fn materialize(
    html: &str,
    asset_dir: Option<&Path>,
    output_dir: &Path,
) -> Result<MaterializedSite, SiteError> {
    write_index(output_dir, html)?;

    let mut assets_copied = 0;
    if let Some(asset_dir) = asset_dir {
        for relative in site_files(asset_dir)? {
            if relative == Path::new(INDEX_FILE) {
                continue;
            }
            let from = asset_dir.join(&relative);
            let to = output_dir.join(&relative);
            if let Some(parent) = to.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SiteError::io(parent, e))?;
            }
            std::fs::copy(&from, &to).map_err(|e| SiteError::io(&from, e))?;
            debug!("Copied asset {}", relative.display());
            assets_copied += 1;
        }
    }

    info!(
        "Materialized site at {} ({assets_copied} assets)",
        output_dir.display()
    );

    Ok(MaterializedSite {
        output_dir: output_dir.to_path_buf(),
        assets_copied,
    })
}

/// [`materialize`] on the blocking pool.
pub async fn materialize_blocking(
    html: String,
    asset_dir: Option<PathBuf>,
    output_dir: PathBuf,
) -> Result<MaterializedSite, SiteError> {
    tokio::task::spawn_blocking(move || materialize(&html, asset_dir.as_deref(), &output_dir))
        .await
        .map_err(|e| SiteError::Join(e.to_string()))?
}

/// Replaces only the page of an existing site.
pub fn write_index(output_dir: &Path, html: &str) -> Result<(), SiteError> {
    std::fs::create_dir_all(output_dir).map_err(|e| SiteError::io(output_dir, e))?;
    let index = output_dir.join(INDEX_FILE);
    std::fs::write(&index, html).map_err(|e| SiteError::io(&index, e))
}

/// Deletes a site directory. A directory that is already gone is not an error.
pub async fn remove_site(output_dir: &Path) -> Result<(), SiteError> {
    match tokio::fs::remove_dir_all(output_dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SiteError::io(output_dir, e)),
    }
}

/// All regular files under `root`, as sorted paths relative to `root`.
pub fn site_files(root: &Path) -> Result<Vec<PathBuf>, SiteError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| SiteError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SiteError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| SiteError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
