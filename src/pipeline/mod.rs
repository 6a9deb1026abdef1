//! Pipeline stages between a fetched snapshot and delivered posts.
//!
//! - `diff`: change detection with silent recovery handling
//! - `compose`: message rendering, truncation, and batching
//! - `publish`: dedup gate, sending, history bookkeeping
//! - `watch`: the poll loop driving the stages

pub mod compose;
pub mod diff;
pub mod publish;
pub mod watch;

pub use compose::{combine, compose};
pub use diff::StatusDiff;
pub use publish::{DeliveryReport, Publisher};
pub use watch::{CycleReport, Watcher};
