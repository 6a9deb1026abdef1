//! Local filesystem history storage.
//!
//! Keeps the post history at `{root}/history.json`. Writes go to a temp file
//! first and are renamed into place, so a crash mid-write leaves the previous
//! version intact.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::PostHistory;
use crate::storage::HistoryStore;

const HISTORY_FILE: &str = "history.json";

/// Local filesystem history backend.
#[derive(Debug, Clone)]
pub struct LocalHistory {
    root_dir: PathBuf,
}

impl LocalHistory {
    /// Create a history store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.root_dir.join(HISTORY_FILE)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let path = self.path();
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl HistoryStore for LocalHistory {
    async fn load(&self) -> Result<PostHistory> {
        match self.read_bytes().await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                log::debug!("No history at {:?}, starting empty", self.path());
                Ok(PostHistory::default())
            }
        }
    }

    async fn save(&self, history: &PostHistory) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(history)?;
        self.write_bytes(&bytes).await
    }
}
