//! Dependency resolution and build plan construction for brick
//!
//! This crate turns a project's declared dependencies into a resolved
//! dependency tree and then into a build plan: a deduplicated set of build
//! targets with propagated flags, definitions and link edges.
//!
//! - `locator`: finds packages in the vendor directory and module cache
//! - `session`: one resolution session with its caches
//! - `graph`: build target graph construction

pub mod graph;
pub mod locator;
pub mod session;

// Re-export main types
pub use graph::{build_plan, BuildPlan, LinkEdge, Target, TargetId, TargetSet};
pub use locator::{Locator, Package, PackageId, PackageSource};
pub use session::{Node, Resolution, Session};

use brick_core::error::BrickError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, BrickError>;
