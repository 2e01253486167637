//! Utility functions for string comparison and display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{cmp_ignore_case, contains_ignore_case, format_hours, truncate_string};
