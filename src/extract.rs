//! PDF text extraction.
//!
//! Produces the plain UTF-8 text of every page, in page order. A file that
//! cannot be read or parsed is reported as an [`ExtractError`] and the
//! ingestion pipeline skips it; extraction never panics.

use std::path::Path;

/// Lowercase extension of the files the pipeline accepts.
pub const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Whether `path` names a PDF, judged by a case-insensitive `.pdf` extension.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(PDF_EXTENSION))
        .unwrap_or(false)
}

/// Extract the text of an in-memory PDF.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

pub fn extract_pdf_file(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    extract_pdf(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf(Path::new("policy.pdf")));
        assert!(is_pdf(Path::new("REPORT.PDF")));
        assert!(is_pdf(Path::new("dir/Mixed.Pdf")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn garbage_bytes_are_an_error_not_a_panic() {
        let err = extract_pdf(b"this is not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = extract_pdf_file(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
