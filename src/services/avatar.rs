use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::db::Store;
use crate::models::Account;
use crate::services::member_service::MemberError;

/// Public URL prefix that maps onto the avatar directory.
pub const AVATAR_URL_PREFIX: &str = "/uploads/avatars";

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub content_type: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct AvatarService {
    store: Store,
    avatar_dir: PathBuf,
    max_bytes: usize,
}

impl AvatarService {
    #[must_use]
    pub fn new(store: Store, uploads: &UploadConfig) -> Self {
        Self {
            store,
            avatar_dir: uploads.avatar_dir(),
            max_bytes: uploads.max_avatar_bytes,
        }
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check_content_type(content_type: &str) -> Result<(), MemberError> {
        if content_type.starts_with("image/") {
            Ok(())
        } else {
            Err(MemberError::Validation("File must be an image".to_string()))
        }
    }

    pub fn check_size(&self, len: usize) -> Result<(), MemberError> {
        if len > self.max_bytes {
            return Err(self.too_large());
        }
        Ok(())
    }

    #[must_use]
    pub fn too_large(&self) -> MemberError {
        MemberError::Validation(format!(
            "File size must be less than {}MB",
            self.max_bytes / (1024 * 1024)
        ))
    }

    /// Store the image and point the account's member profile at it.
    /// Returns the public reference path.
    pub async fn attach(&self, account: &Account, upload: AvatarUpload) -> Result<String, MemberError> {
        Self::check_content_type(&upload.content_type)?;
        self.check_size(upload.bytes.len())?;

        let member = self
            .store
            .get_member_by_user(&account.id)
            .await?
            .ok_or_else(|| MemberError::NotFound("Member profile not found".to_string()))?;

        let extension = file_extension(upload.file_name.as_deref(), &upload.content_type);
        let filename = format!(
            "{}_{}{}",
            account.id,
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            extension
        );
        let reference = format!("{AVATAR_URL_PREFIX}/{filename}");

        fs::create_dir_all(&self.avatar_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.avatar_dir.display()))?;
        let file_path = self.avatar_dir.join(&filename);

        write_then_commit(&file_path, &upload.bytes, || async {
            self.store
                .set_member_avatar(&member.id, &reference)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Member profile {} disappeared", member.id))
        })
        .await
        .map_err(|e| MemberError::Internal(format!("Upload failed: {e}")))?;

        info!(username = %account.username, path = %file_path.display(), "Stored avatar");
        Ok(reference)
    }
}

/// Write `bytes` to `path`, then run `commit`. If the commit fails the file
/// is removed so no upload is left without a referencing record.
pub async fn write_then_commit<F, Fut, T>(path: &Path, bytes: &[u8], commit: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    match commit().await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
            }
            Err(e)
        }
    }
}

/// Extension (with leading dot) from the client file name, falling back to
/// the content type. Non-alphanumeric extensions are dropped.
fn file_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_string);

    let from_mime = || {
        mime_guess::get_mime_extensions_str(content_type)
            .and_then(|exts| exts.first())
            .map(|ext| (*ext).to_string())
    };

    from_name
        .or_else(from_mime)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("roster-avatar-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_content_type_check() {
        assert!(AvatarService::check_content_type("image/png").is_ok());
        assert!(AvatarService::check_content_type("image/jpeg").is_ok());
        assert!(AvatarService::check_content_type("text/plain").is_err());
        assert!(AvatarService::check_content_type("application/pdf").is_err());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(Some("me.PNG"), "image/png"), ".png");
        assert_eq!(file_extension(Some("photo.jpeg"), "image/jpeg"), ".jpeg");
        assert_eq!(file_extension(Some("../../etc/x.p/ng"), "image/png"), ".png");
        assert!(file_extension(None, "image/png").starts_with('.'));
        assert_eq!(file_extension(None, "image/unknown-kind"), "");
    }

    #[tokio::test]
    async fn test_failed_commit_removes_file() {
        let path = temp_path("fail.png");

        let result: Result<()> = write_then_commit(&path, b"png", || async {
            Err(anyhow::anyhow!("database went away"))
        })
        .await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_successful_commit_keeps_file() {
        let path = temp_path("ok.png");

        let value = write_then_commit(&path, b"png", || async { Ok(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
        std::fs::remove_file(&path).unwrap();
    }
}
