//! Service layer for the line watcher.
//!
//! This module contains the external collaborators:
//! - Status feed client (`StatusFeed`)
//! - Bluesky posting client (`BlueskyClient` behind the `PostClient` trait)

mod bluesky;
mod feed;

pub use bluesky::{BlueskyClient, PostClient, Session};
pub use feed::{Feed, StatusFeed};
