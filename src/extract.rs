//! Per-page PDF text extraction.
//!
//! One PDF page becomes one retrieval unit. Extraction is the only thing
//! this module does; deciding what to do with blank pages is the
//! ingestion layer's call.

use anyhow::Result;
use std::path::Path;

/// Extract the text of each page, in page order.
///
/// Pages without extractable text come back as empty (or
/// whitespace-only) strings; callers filter them.
pub fn pdf_pages(path: &Path) -> Result<Vec<String>> {
    pdf_extract::extract_text_by_pages(path)
        .map_err(|e| anyhow::anyhow!("PDF extraction failed for {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn invalid_pdf_returns_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        assert!(pdf_pages(&path).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(pdf_pages(&dir.path().join("absent.pdf")).is_err());
    }
}
