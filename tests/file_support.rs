//! CLI tests for PDF handling: upload, ingest, re-ingest, skip-on-failure,
//! and document listing, driven through the `askit` binary.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("uploaded_files")).unwrap();

    let config = format!(
        r#"provider = "huggingface"

[db]
path = "{root}/data/askit.sqlite"

[chunking]
max_tokens = 700

[retrieval]
top_k = 3

[embedding]
provider = "disabled"

[ingest]
upload_dir = "{root}/uploaded_files"
"#,
        root = root.display()
    );
    let config_path = root.join("config/askit.toml");
    fs::write(&config_path, config).unwrap();

    (tmp, config_path)
}

fn run_askit(root: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_askit"))
        .current_dir(root)
        .env_remove("USE_PROVIDER")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run askit binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn init_is_idempotent() {
    let (tmp, config) = setup_env();
    for _ in 0..2 {
        let (stdout, stderr, ok) = run_askit(tmp.path(), &config, &["init"]);
        assert!(ok, "init failed: {stderr}");
        assert!(stdout.contains("Database initialized successfully."));
    }
    assert!(tmp.path().join("data/askit.sqlite").exists());
}

#[test]
fn ingest_pdf_then_list() {
    let (tmp, config) = setup_env();
    let uploads = tmp.path().join("uploaded_files");
    common::write_pdf(&uploads, "policy.pdf", "Refunds are allowed within 30 days.");

    let (stdout, stderr, ok) = run_askit(tmp.path(), &config, &["ingest"]);
    assert!(ok, "ingest failed: {stderr}");
    assert!(stdout.contains("Ingested 1 document(s)"), "stdout: {stdout}");
    assert!(stdout.contains("huggingface_embeddings"));

    let (stdout, _, ok) = run_askit(tmp.path(), &config, &["docs"]);
    assert!(ok);
    assert!(stdout.contains("policy.pdf"));
    assert!(stdout.contains("1 document(s)"));
}

#[test]
fn reingest_does_not_duplicate() {
    let (tmp, config) = setup_env();
    let uploads = tmp.path().join("uploaded_files");
    common::write_pdf(&uploads, "policy.pdf", "Refunds are allowed within 30 days.");

    assert!(run_askit(tmp.path(), &config, &["ingest"]).2);
    common::write_pdf(&uploads, "policy.pdf", "Refunds are allowed within 14 days.");
    assert!(run_askit(tmp.path(), &config, &["ingest"]).2);

    let (stdout, _, ok) = run_askit(tmp.path(), &config, &["docs"]);
    assert!(ok);
    assert_eq!(stdout.matches("policy.pdf").count(), 1);
}

#[test]
fn broken_and_empty_pdfs_are_skipped() {
    let (tmp, config) = setup_env();
    let uploads = tmp.path().join("uploaded_files");
    fs::write(uploads.join("broken.pdf"), b"%PDF-1.4 garbage").unwrap();
    common::write_pdf(&uploads, "blank.pdf", "");

    let (stdout, stderr, ok) = run_askit(tmp.path(), &config, &["ingest"]);
    assert!(ok, "ingest must not fail on bad files: {stderr}");
    assert!(stdout.contains("No documents were ingested."), "stdout: {stdout}");
    assert!(stdout.contains("broken.pdf"));
}

#[test]
fn upload_with_ingest() {
    let (tmp, config) = setup_env();
    let outside = tmp.path().join("downloads");
    fs::create_dir_all(&outside).unwrap();
    common::write_pdf(&outside, "Handbook.PDF", "Vacation requests need two weeks notice.");
    fs::write(outside.join("readme.txt"), b"skip me").unwrap();

    let handbook = outside.join("Handbook.PDF");
    let readme = outside.join("readme.txt");
    let (stdout, stderr, ok) = run_askit(
        tmp.path(),
        &config,
        &[
            "upload",
            handbook.to_str().unwrap(),
            readme.to_str().unwrap(),
            "--ingest",
        ],
    );
    assert!(ok, "upload failed: {stderr}");
    assert!(stdout.contains("Uploaded 1 file(s)"));
    assert!(stdout.contains("Ingested 1 document(s)"));
    assert!(tmp.path().join("uploaded_files/Handbook.PDF").exists());
    assert!(!tmp.path().join("uploaded_files/readme.txt").exists());
}

#[test]
fn unknown_provider_env_is_rejected() {
    let (tmp, config) = setup_env();
    let output = Command::new(env!("CARGO_BIN_EXE_askit"))
        .current_dir(tmp.path())
        .env("USE_PROVIDER", "nonsense")
        .arg("--config")
        .arg(&config)
        .arg("docs")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("USE_PROVIDER"));
}

#[test]
fn extracted_text_contains_phrase() {
    let text = askit::extract::extract_pdf(&common::minimal_pdf("refund test phrase")).unwrap();
    assert!(text.contains("refund test phrase"), "extracted: {text:?}");
}
