//! Utility functions and helpers.

pub mod backoff;
pub mod http;
