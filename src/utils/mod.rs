//! Shared utility functions.

pub mod format;

pub use format::{format_count, CountFormat};
