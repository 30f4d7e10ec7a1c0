// src/services/file_service.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::{common::error::AppError, models::customer::DocumentType};

/// Hard ceiling for a single uploaded document.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
];

// =============================================================================
//  CARD-NUMBER POLICY
// =============================================================================

static AADHAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{12}$").unwrap());
static PAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static PASSPORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9]{6,9}$").unwrap());
static LICENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9]{8,20}$").unwrap());

fn strip_separators(card_number: &str) -> String {
    card_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Per-type format check. Spaces and hyphens are not significant.
pub fn validate_card_number(doc_type: DocumentType, card_number: &str) -> bool {
    let clean = strip_separators(card_number);
    match doc_type {
        DocumentType::Aadhar => AADHAR_RE.is_match(&clean),
        DocumentType::Pan => PAN_RE.is_match(&clean),
        DocumentType::Passport => PASSPORT_RE.is_match(&clean),
        DocumentType::Licence => LICENCE_RE.is_match(&clean),
    }
}

/// Canonical storage form: AADHAR grouped 4-4-4, everything else uppercased
/// with separators stripped.
pub fn format_card_number(doc_type: DocumentType, card_number: &str) -> String {
    let clean = strip_separators(card_number);
    match doc_type {
        DocumentType::Aadhar if clean.len() == 12 => {
            format!("{} {} {}", &clean[0..4], &clean[4..8], &clean[8..12])
        }
        _ => clean,
    }
}

/// Checks an upload's name and content type against the accepted document
/// media formats (JPEG, PNG, WebP, PDF). Returns the lowercased extension.
pub fn validate_upload(file_name: &str, content_type: &str) -> Result<String, AppError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str())
        || !ALLOWED_CONTENT_TYPES.contains(&content_type.to_lowercase().as_str())
    {
        return Err(AppError::InvalidUpload(
            "Invalid file type. Only JPG, PNG, WebP, and PDF files are allowed.".to_string(),
        ));
    }
    Ok(ext)
}

// =============================================================================
//  FILE STORE
// =============================================================================

/// A stored upload as recorded on the Document row.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
}

/// Persists document payloads on disk, addressed by an opaque relative path.
/// The database is the source of truth for existence; this store is kept
/// consistent by the CustomerService's compensation logic.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir: {}", e))?;
        Ok(())
    }

    fn full_path(&self, stored_path: &str) -> PathBuf {
        self.root.join(stored_path)
    }

    /// Writes the payload under a collision-resistant name
    /// (sanitized original + timestamp + random suffix). `create_new`
    /// guarantees an existing path is never overwritten.
    pub async fn save(&self, bytes: &[u8], original_name: &str) -> Result<StoredFile, AppError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let stem = Path::new(original_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let clean: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        // A timestamp+random collision is already vanishingly unlikely; the
        // retry loop covers it anyway instead of clobbering the file.
        for _ in 0..3 {
            let suffix: u32 = rand::rng().random();
            let file_name = format!(
                "{}-{}-{}.{}",
                clean,
                chrono::Utc::now().timestamp_millis(),
                suffix,
                ext
            );
            let target = self.full_path(&file_name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to write upload: {}", e))?;
                    file.flush()
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to flush upload: {}", e))?;
                    return Ok(StoredFile {
                        file_path: file_name.clone(),
                        file_name,
                        file_size: bytes.len() as i64,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(anyhow::anyhow!("Failed to store upload: {}", e).into()),
            }
        }
        Err(anyhow::anyhow!("Could not allocate a unique file name").into())
    }

    /// Idempotent, best-effort delete. A missing file or an I/O failure is
    /// logged and swallowed: the primary (database) outcome already
    /// determines the caller's response.
    pub async fn delete(&self, stored_path: &str) {
        let target = self.full_path(stored_path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => tracing::info!("File deleted: {}", stored_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("File already absent: {}", stored_path);
            }
            Err(e) => tracing::warn!("Failed to delete file {}: {}", stored_path, e),
        }
    }

    pub async fn exists(&self, stored_path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(stored_path))
            .await
            .unwrap_or(false)
    }

    pub async fn read(&self, stored_path: &str) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(self.full_path(stored_path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound),
            Err(e) => Err(anyhow::anyhow!("Failed to read file {}: {}", stored_path, e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aadhar_must_be_twelve_digits() {
        assert!(validate_card_number(DocumentType::Aadhar, "123456789012"));
        assert!(validate_card_number(DocumentType::Aadhar, "1234 5678 9012"));
        assert!(!validate_card_number(DocumentType::Aadhar, "12345"));
        assert!(!validate_card_number(DocumentType::Aadhar, "12345678901a"));
    }

    #[test]
    fn pan_format() {
        assert!(validate_card_number(DocumentType::Pan, "ABCDE1234F"));
        assert!(validate_card_number(DocumentType::Pan, "abcde1234f"));
        assert!(!validate_card_number(DocumentType::Pan, "AB1DE1234F"));
        assert!(!validate_card_number(DocumentType::Pan, "ABCDE12345"));
    }

    #[test]
    fn passport_and_licence_lengths() {
        assert!(validate_card_number(DocumentType::Passport, "A1234567"));
        assert!(!validate_card_number(DocumentType::Passport, "A123"));
        assert!(!validate_card_number(DocumentType::Passport, "A123456789X"));

        assert!(validate_card_number(DocumentType::Licence, "DL-0420110149646"));
        assert!(!validate_card_number(DocumentType::Licence, "SHORT1"));
    }

    #[test]
    fn aadhar_formats_into_groups_of_four() {
        assert_eq!(
            format_card_number(DocumentType::Aadhar, "123456789012"),
            "1234 5678 9012"
        );
    }

    #[test]
    fn pan_is_uppercased_but_otherwise_unchanged() {
        assert_eq!(
            format_card_number(DocumentType::Pan, "123456789012"),
            "123456789012"
        );
        assert_eq!(
            format_card_number(DocumentType::Pan, "abcde1234f"),
            "ABCDE1234F"
        );
    }

    #[test]
    fn upload_validation_checks_extension_and_content_type() {
        assert_eq!(validate_upload("scan.PDF", "application/pdf").unwrap(), "pdf");
        assert!(validate_upload("scan.exe", "application/pdf").is_err());
        assert!(validate_upload("scan.pdf", "application/zip").is_err());
        assert!(validate_upload("no_extension", "image/png").is_err());
    }

    #[tokio::test]
    async fn save_read_exists_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.save(b"hello", "aadhar scan.png").await.unwrap();
        assert_eq!(stored.file_size, 5);
        assert!(stored.file_name.ends_with(".png"));
        // sanitized: no space survives into the stored name
        assert!(!stored.file_name.contains(' '));

        assert!(store.exists(&stored.file_path).await);
        assert_eq!(store.read(&stored.file_path).await.unwrap(), b"hello");

        store.delete(&stored.file_path).await;
        assert!(!store.exists(&stored.file_path).await);
        assert!(matches!(
            store.read(&stored.file_path).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_of_missing_path_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // must not panic or surface anything
        store.delete("never-existed.pdf").await;
    }

    #[tokio::test]
    async fn saves_of_the_same_name_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let a = store.save(b"one", "doc.pdf").await.unwrap();
        let b = store.save(b"two", "doc.pdf").await.unwrap();
        assert_ne!(a.file_path, b.file_path);
        assert_eq!(store.read(&a.file_path).await.unwrap(), b"one");
        assert_eq!(store.read(&b.file_path).await.unwrap(), b"two");
    }
}
