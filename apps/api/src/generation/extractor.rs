//! Document text extraction. Never fails: unreadable input yields an empty string.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

/// Extracts all text from PDF bytes, in page order. Corrupt, encrypted or empty documents
/// (and panics inside the PDF parser) produce `""`.
///
/// CPU-bound; call through [`extract_text_blocking`] from async code.
pub fn extract_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        warn!("Resume document is empty; nothing to extract");
        return String::new();
    }

    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => {
            debug!("Extracted {} characters from resume", text.len());
            text
        }
        Ok(Err(e)) => {
            warn!("Failed to extract resume text: {e}");
            String::new()
        }
        Err(_) => {
            warn!("PDF parser panicked while extracting resume text");
            String::new()
        }
    }
}

pub async fn extract_text_blocking(bytes: Vec<u8>) -> String {
    match tokio::task::spawn_blocking(move || extract_text(&bytes)).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Extraction task failed: {e}");
            String::new()
        }
    }
}
