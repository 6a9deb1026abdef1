//! Storage abstractions for post history persistence.
//!
//! The history is a single JSON document, read fully and rewritten fully on
//! each update. The design assumes one running watcher per store: the
//! read-modify-write sequence is not guarded by any lock, so pointing two
//! instances at the same directory can lose or duplicate trims.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::PostHistory;

// Re-export for convenience
pub use local::LocalHistory;

/// Trait for post history backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the post history, or an empty one if none has been written yet.
    async fn load(&self) -> Result<PostHistory>;

    /// Persist the post history, replacing any previous version.
    async fn save(&self, history: &PostHistory) -> Result<()>;
}
