//! Core data types for brick.
//!
//! This module provides the fundamental types used throughout brick:
//! - Version types and the constraint (query) engine
//! - Manifest and dependency specifications
//! - Preprocessor definitions and language standards

pub mod definitions;
pub mod dependency;
pub mod package;
pub mod query;
pub mod standard;
pub mod version;

// Re-export all public types
pub use definitions::{definition_key, definition_value, Definitions};
pub use dependency::{
    Dependency, DependencyList, DependencyOptions, DependencySpec, DetailedSpec, Visibility,
};
pub use package::{BuildOptions, Manifest, ProjectType, SharedLibrary};
pub use query::{parse_constraint, Bound, Op, Query};
pub use standard::{Language, Standard};
pub use version::{parse_partial, PartialVersion, Version};
