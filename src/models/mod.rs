// src/models/mod.rs

//! Domain models for the line watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod history;
mod line;

// Re-export all public types
pub use config::{BlueskyConfig, Config, FeedConfig, WatcherConfig};
pub use history::{PostHistory, PostRecord};
pub use line::{ChangeEvent, LineStatus, GOOD_SERVICE};
