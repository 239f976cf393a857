//! Binary file storage.
//!
//! Receipts and avatars are uploaded under deterministic paths and addressed
//! afterwards by the public URL the store hands back.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{EngineError, ResultEngine};

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Stores `bytes` at `path`, overwriting, and returns the public URL.
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> ResultEngine<String>;
}

/// `name` with path separators replaced, safe to use as one path segment.
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => cleaned,
    }
}

fn check_segment(segment: &str, label: &str) -> ResultEngine<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(EngineError::InvalidFile(format!("invalid {label} in path")));
    }
    Ok(())
}

/// `receipts/{owner}/{receipt}/{file}`.
pub fn receipt_file_path(
    owner_user_id: &str,
    receipt_id: &str,
    file_name: &str,
) -> ResultEngine<String> {
    check_segment(owner_user_id, "owner")?;
    check_segment(receipt_id, "receipt")?;
    Ok(format!(
        "receipts/{owner_user_id}/{receipt_id}/{}",
        safe_file_name(file_name)
    ))
}

/// `profile/{user}/avatar.{ext}`, extension lowercased and `jpg` by default.
pub fn avatar_path(user_id: &str, file_name: &str) -> ResultEngine<String> {
    check_segment(user_id, "user")?;
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());
    Ok(format!("profile/{user_id}/avatar.{ext}"))
}

/// Keeps blobs in memory. Used by tests and `storage = "memory"`.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content type and bytes stored at `path`.
    pub async fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> ResultEngine<String> {
        self.blobs
            .write()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("memory://{path}"))
    }
}

/// Writes blobs below `root`; URLs are `public_url` joined with the path.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, _content_type: &str, bytes: Vec<u8>) -> ResultEngine<String> {
        if path.split('/').any(|s| s == ".." || s.is_empty()) {
            return Err(EngineError::InvalidFile(format!("invalid blob path: {path}")));
        }
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EngineError::Storage(err.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|err| EngineError::Storage(err.to_string()))?;
        Ok(format!("{}/{path}", self.public_url.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_paths_flatten_separators_in_file_names() {
        assert_eq!(
            receipt_file_path("alice", "r1", "scans/2024\\march.pdf").unwrap(),
            "receipts/alice/r1/scans_2024_march.pdf"
        );
        assert_eq!(
            receipt_file_path("alice", "r1", "..").unwrap(),
            "receipts/alice/r1/file"
        );
        assert!(receipt_file_path("../etc", "r1", "a.pdf").is_err());
    }

    #[test]
    fn avatar_extension_is_lowercased_with_jpg_default() {
        assert_eq!(avatar_path("u1", "Me.PNG").unwrap(), "profile/u1/avatar.png");
        assert_eq!(avatar_path("u1", "portrait").unwrap(), "profile/u1/avatar.jpg");
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryBlobStore::new();
        let url = store
            .put("receipts/a/b/c.pdf", "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "memory://receipts/a/b/c.pdf");
        let (ct, bytes) = store.get("receipts/a/b/c.pdf").await.unwrap();
        assert_eq!(ct, "application/pdf");
        assert_eq!(bytes, b"%PDF");
    }
}
