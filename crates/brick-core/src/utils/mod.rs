//! Utility functions and helpers.
//!
//! Common functionality used across multiple brick crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::ContentHasher;
pub use path::{is_safe_path, safe_join};
