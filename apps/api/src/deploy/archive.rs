//! Deploy packaging: an in-memory deflated zip of a materialized site.

use std::io::{Cursor, Write};
use std::path::{Component, Path};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::site::{site_files, SiteError, INDEX_FILE};

pub const HEADERS_FILE: &str = "_headers";
pub const HEADERS_RULES: &str = "/*\n  Content-Type: text/html; charset=utf-8\n";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("site has no {INDEX_FILE} at {0}")]
    MissingIndex(String),

    #[error(transparent)]
    Site(#[from] SiteError),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Zips `site_dir`: the `_headers` rules first, then `index.html`, then every other file
/// at its relative path with `/` separators.
pub fn build_archive(site_dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    let files = site_files(site_dir)?;
    if !files.iter().any(|f| f == Path::new(INDEX_FILE)) {
        return Err(ArchiveError::MissingIndex(site_dir.display().to_string()));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(HEADERS_FILE, options)?;
    zip.write_all(HEADERS_RULES.as_bytes())?;

    zip.start_file(INDEX_FILE, options)?;
    zip.write_all(&std::fs::read(site_dir.join(INDEX_FILE))?)?;

    for relative in files.iter().filter(|f| *f != Path::new(INDEX_FILE)) {
        zip.start_file(archive_name(relative), options)?;
        zip.write_all(&std::fs::read(site_dir.join(relative))?)?;
    }

    Ok(zip.finish()?.into_inner())
}

pub async fn build_archive_blocking(site_dir: std::path::PathBuf) -> Result<Vec<u8>, ArchiveError> {
    tokio::task::spawn_blocking(move || build_archive(&site_dir))
        .await
        .map_err(|e| ArchiveError::Site(SiteError::Join(e.to_string())))?
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut out = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_archive_layout() {
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join(INDEX_FILE), "<p>Ada</p>").unwrap();
        std::fs::create_dir_all(site.path().join("css")).unwrap();
        std::fs::write(site.path().join("css/style.css"), "body{}").unwrap();

        let bytes = build_archive(site.path()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names.len(), 3);
        assert_eq!(archive.by_index(0).unwrap().name(), HEADERS_FILE);
        assert_eq!(archive.by_index(1).unwrap().name(), INDEX_FILE);
        assert_eq!(
            archive.by_index(2).unwrap().compression(),
            CompressionMethod::Deflated
        );

        assert_eq!(read_entry(&mut archive, HEADERS_FILE), HEADERS_RULES);
        assert_eq!(read_entry(&mut archive, INDEX_FILE), "<p>Ada</p>");
        assert_eq!(read_entry(&mut archive, "css/style.css"), "body{}");
    }

    #[test]
    fn test_missing_index_is_rejected() {
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join("about.html"), "x").unwrap();
        assert!(matches!(
            build_archive(site.path()),
            Err(ArchiveError::MissingIndex(_))
        ));
    }

    #[test]
    fn test_archive_name_uses_forward_slashes() {
        let path: std::path::PathBuf = ["img", "icons", "logo.png"].iter().collect();
        assert_eq!(archive_name(&path), "img/icons/logo.png");
    }
}
