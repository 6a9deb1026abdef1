//! Post history data structures.
//!
//! `PostHistory` is the durable memory of what has already been published.
//! It backs two behaviors: the time-windowed duplicate check that gates
//! publishing, and the capacity bound that keeps the persisted document small.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successfully published message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Exact text that was sent
    pub text: String,

    /// UTC time of the successful send
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of recently published messages, oldest first.
///
/// Serialized as `{"posts": [{"text": ..., "timestamp": ...}, ...]}` with
/// ISO-8601 UTC timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHistory {
    /// Records in publish order
    #[serde(default)]
    pub posts: Vec<PostRecord>,
}

impl PostHistory {
    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Append a record for a message sent at `now`.
    pub fn record(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.posts.push(PostRecord {
            text: text.into(),
            timestamp: now,
        });
    }

    /// Drop oldest records until at most `capacity` remain.
    pub fn trim(&mut self, capacity: usize) {
        if self.posts.len() > capacity {
            let excess = self.posts.len() - capacity;
            self.posts.drain(..excess);
        }
    }

    /// Whether `text` was already published strictly less than `window_secs`
    /// seconds before `now`.
    ///
    /// Equality is exact string match; no normalization is applied. A record
    /// exactly `window_secs` old no longer counts as a duplicate.
    pub fn is_duplicate(&self, text: &str, now: DateTime<Utc>, window_secs: i64) -> bool {
        self.posts.iter().any(|p| {
            p.text == text && now.signed_duration_since(p.timestamp).num_seconds() < window_secs
        })
    }

    /// The most recent `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &PostRecord> {
        self.posts.iter().rev().take(limit)
    }
}
