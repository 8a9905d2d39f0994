//! Error types and result aliases for brick operations.
//!
//! Provides a unified error type that covers all failure kinds of version
//! parsing, dependency resolution and build-plan construction. Every variant
//! carries enough context to attribute the failure to a package.

use thiserror::Error;

/// Unified error type for all brick operations
#[derive(Error, Debug)]
pub enum BrickError {
    // Version engine errors
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version constraint '{input}': {reason}")]
    InvalidConstraint { input: String, reason: String },

    // Config errors
    #[error("Failed to parse {file}: {message} at line {line}, column {column}")]
    TomlParse {
        file: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse registry response: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    #[error("No brick.toml found in {path}")]
    ManifestNotFound { path: String },

    #[error("Path '{path}' escapes its base directory")]
    PathTraversal { path: String },

    // Registry errors
    #[error("Package '{name}' not found")]
    PackageNotFound { name: String, version: Option<String> },

    #[error("Registry returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Resolution errors
    #[error("No version of '{package}' satisfies '{constraint}'")]
    NoSatisfyingVersion { package: String, constraint: String },

    #[error("Vendor package '{package}@{version}' not found in the vendor directory")]
    VendorPackageNotFound { package: String, version: String },

    #[error("Manifest at {path} declares name '{found}', expected '{expected}'")]
    NameMismatch {
        expected: String,
        found: String,
        path: String,
    },

    #[error("Manifest at {path} for '{package}' declares version {found}, expected {expected}")]
    VersionMismatch {
        package: String,
        expected: String,
        found: String,
        path: String,
    },

    #[error("Manifest at {path} for '{package}' is an application, expected a package")]
    WrongProjectType { package: String, path: String },

    #[error("Circular dependency detected: {cycle}")]
    DependencyCycle { cycle: String },

    // Build plan errors
    #[error("'{consumer}' links '{package}', which its manifest does not declare")]
    DependencyNotDeclared { package: String, consumer: String },

    #[error("'{package}' requires definition '{key}' but its consumer '{consumer}' supplies none")]
    MissingRequiredDefinition {
        package: String,
        consumer: String,
        key: String,
    },

    #[error("Definition placeholder '${{{token}}}' for '{package}' has no value in '{consumer}'")]
    UnresolvedPlaceholder {
        package: String,
        consumer: String,
        token: String,
    },

    #[error("Global definition '{key}' is not accepted by any dependency")]
    UnrecognizedGlobalDefinition { key: String },

    #[error("Invalid language standard '{token}' requested by '{package}'")]
    InvalidStandard { package: String, token: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for brick operations
pub type BrickResult<T> = Result<T, BrickError>;

impl BrickError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BrickError::Network { .. } | BrickError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            BrickError::PackageNotFound { .. } => {
                Some("Check the package name spelling or the configured registry")
            },
            BrickError::VendorPackageNotFound { .. } => {
                Some("Place the package under vendor/<name> or drop `vendor = true`")
            },
            BrickError::NoSatisfyingVersion { .. } => {
                Some("Relax the version constraint or publish a matching version")
            },
            BrickError::Network { .. } => Some("Check your internet connection and try again"),
            BrickError::DependencyCycle { .. } => {
                Some("Remove circular dependencies by restructuring your packages")
            },
            BrickError::MissingRequiredDefinition { .. } => {
                Some("Add the definition to the dependency entry's `definitions` list")
            },
            BrickError::DependencyNotDeclared { .. } => {
                Some("The manifest changed since resolution; resolve the project again")
            },
            _ => None,
        }
    }
}
