//! PDF ingestion pipeline.
//!
//! Scans the upload directory (top level only) for `*.pdf` files, extracts
//! their text, and hands every non-empty document to the store in a single
//! upsert. Files that yield no text or fail to extract are logged and
//! skipped; they never abort the batch.

use anyhow::{bail, Context, Result};
use askit_core::{Document, DocumentStore};
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract::{self, is_pdf};
use crate::store::SqliteStore;

/// Why a file was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyText,
    ExtractFailed(String),
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

fn pdf_matcher() -> Result<GlobMatcher> {
    Ok(GlobBuilder::new("*.pdf")
        .case_insensitive(true)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// PDF files directly inside `dir`, sorted by file name.
pub fn scan_upload_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Upload directory does not exist: {}", dir.display());
    }

    let matcher = pdf_matcher()?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Extract each file into a [`Document`] titled with its file name.
pub fn load_documents(paths: &[PathBuf]) -> IngestReport {
    let mut report = IngestReport::default();

    for path in paths {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match extract::extract_pdf_file(path) {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(file = %title, "no text extracted, skipping");
                report.skipped.push((path.clone(), SkipReason::EmptyText));
            }
            Ok(text) => report.documents.push(Document::new(title, text)),
            Err(e) => {
                tracing::warn!(file = %title, error = %e, "extraction failed, skipping");
                report
                    .skipped
                    .push((path.clone(), SkipReason::ExtractFailed(e.to_string())));
            }
        }
    }

    report
}

/// Ingest every PDF in `dir` into `store`. Returns the report of what was
/// ingested and what was skipped.
pub async fn ingest_dir(store: &dyn DocumentStore, dir: &Path) -> Result<IngestReport> {
    let paths = scan_upload_dir(dir)?;
    tracing::debug!(dir = %dir.display(), files = paths.len(), "scanned upload directory");

    let report = load_documents(&paths);
    if !report.documents.is_empty() {
        store
            .upsert(&report.documents)
            .await
            .context("Failed to add documents to the store")?;
    }

    tracing::info!(
        ingested = report.documents.len(),
        skipped = report.skipped.len(),
        "ingestion finished"
    );
    Ok(report)
}

/// The summary line printed after an ingestion run.
pub fn summary_line(report: &IngestReport) -> String {
    if report.documents.is_empty() {
        "No documents were ingested.".to_string()
    } else {
        format!(
            "Ingested {} document(s) into the vector store.",
            report.documents.len()
        )
    }
}

/// `askit ingest [DIR]`.
pub async fn run_ingest(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.ingest.upload_dir.clone());
    let store = SqliteStore::open(config).await?;

    let report = ingest_dir(&store, &dir).await?;
    for (path, reason) in &report.skipped {
        let file = path.display();
        match reason {
            SkipReason::EmptyText => println!("No text extracted from {}.", file),
            SkipReason::ExtractFailed(e) => println!("Error processing {}: {}", file, e),
        }
    }
    println!("{}", summary_line(&report));
    println!("  collection: {}", store.collection());

    store.close().await;
    Ok(())
}

/// Copy PDFs into `upload_dir`, returning the destination paths. Non-PDF
/// arguments are skipped with a warning.
pub fn upload_files(upload_dir: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(upload_dir).with_context(|| {
        format!("Failed to create upload directory: {}", upload_dir.display())
    })?;

    let mut copied = Vec::new();
    for file in files {
        if !is_pdf(file) {
            tracing::warn!(file = %file.display(), "not a PDF, skipping");
            continue;
        }
        let name = file
            .file_name()
            .with_context(|| format!("Not a file: {}", file.display()))?;
        let dest = upload_dir.join(name);
        std::fs::copy(file, &dest)
            .with_context(|| format!("Failed to copy {} to {}", file.display(), dest.display()))?;
        tracing::debug!(from = %file.display(), to = %dest.display(), "uploaded");
        copied.push(dest);
    }
    Ok(copied)
}

/// `askit upload FILE... [--ingest]`.
pub async fn run_upload(config: &Config, files: &[PathBuf], ingest: bool) -> Result<()> {
    let upload_dir = &config.ingest.upload_dir;
    let copied = upload_files(upload_dir, files)?;
    println!(
        "Uploaded {} file(s) to {}",
        copied.len(),
        upload_dir.display()
    );

    if ingest {
        run_ingest(config, Some(upload_dir.clone())).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_finds_top_level_pdfs_only() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("b.pdf"), b"x").unwrap();
        fs::write(root.join("A.PDF"), b"x").unwrap();
        fs::write(root.join("notes.txt"), b"x").unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested/c.pdf"), b"x").unwrap();
        fs::create_dir(root.join("dir.pdf")).unwrap();

        let names: Vec<String> = scan_upload_dir(root)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn scan_missing_dir_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_upload_dir(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn corrupt_pdf_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, b"not really a pdf").unwrap();

        let report = load_documents(&[path.clone()]);
        assert!(report.documents.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, path);
        assert!(matches!(report.skipped[0].1, SkipReason::ExtractFailed(_)));
    }

    #[test]
    fn summary_lines() {
        let mut report = IngestReport::default();
        assert_eq!(summary_line(&report), "No documents were ingested.");
        report.documents.push(Document::new("a.pdf", "text"));
        assert_eq!(
            summary_line(&report),
            "Ingested 1 document(s) into the vector store."
        );
    }

    #[test]
    fn upload_copies_pdfs_and_skips_others() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let pdf = src.path().join("policy.pdf");
        let txt = src.path().join("notes.txt");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        fs::write(&txt, b"hello").unwrap();

        let upload_dir = dest.path().join("uploaded_files");
        let copied = upload_files(&upload_dir, &[pdf, txt]).unwrap();

        assert_eq!(copied, vec![upload_dir.join("policy.pdf")]);
        assert!(upload_dir.join("policy.pdf").exists());
        assert!(!upload_dir.join("notes.txt").exists());
    }
}
