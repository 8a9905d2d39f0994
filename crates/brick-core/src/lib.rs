//! # brick-core
//!
//! Core types and utilities shared across all brick crates.
//!
//! This crate provides:
//! - Version parsing and the constraint (query) engine used for version selection
//! - Canonical manifest, dependency and definition types
//! - BrickError enum for unified error handling
//! - Hashing and path helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Query, Manifest, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{BrickError, BrickResult};
pub use types::{
    parse_constraint, parse_partial, BuildOptions, Definitions, Dependency, DependencyOptions,
    Manifest, ProjectType, Query, Standard, Version, Visibility,
};
