//! Error taxonomy for patchlock.
//! Parse failures are raised at construction time; resolution failures carry the
//! solver's report plus the policy flags that produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type PatchResult<T> = Result<T, PatchError>;

/// Main error type for patchlock operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchError {
    /// Malformed version string
    Version {
        input: String,
        reason: String,
    },
    /// Malformed requirement string
    Requirement {
        input: String,
        reason: String,
    },
    /// The solver could not find a set of versions satisfying every constraint
    Resolution {
        package: Option<String>,
        policy: Option<String>,
        report: String,
    },
    /// Configuration errors
    Config {
        operation: String,
        field: Option<String>,
        source: String,
    },
    /// I/O related errors
    Io {
        operation: String,
        path: Option<String>,
        source: String,
    },
    /// Bundle snapshot could not be interpreted
    Snapshot {
        field: String,
        source: String,
    },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Version { input, reason } => {
                write!(f, "Malformed version '{}': {}", input, reason)
            }
            PatchError::Requirement { input, reason } => {
                write!(f, "Malformed requirement '{}': {}", input, reason)
            }
            PatchError::Resolution { package, policy, report } => {
                write!(f, "Resolution failed: {}", report)?;
                if let Some(package) = package {
                    write!(f, " (package: {})", package)?;
                }
                if let Some(policy) = policy {
                    write!(f, " (policy: {})", policy)?;
                }
                Ok(())
            }
            PatchError::Config { operation, field, source } => {
                write!(f, "Configuration error in {}: {}", operation, source)?;
                if let Some(field) = field {
                    write!(f, " (field: {})", field)?;
                }
                Ok(())
            }
            PatchError::Io { operation, path, source } => {
                write!(f, "I/O error in {}: {}", operation, source)?;
                if let Some(path) = path {
                    write!(f, " (path: {})", path)?;
                }
                Ok(())
            }
            PatchError::Snapshot { field, source } => {
                write!(f, "Invalid snapshot at {}: {}", field, source)
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// Utility functions for common error patterns
pub mod utils {
    use super::*;

    /// Convert std::io::Error to PatchError
    pub fn io_error(operation: &str, path: Option<&str>, source: std::io::Error) -> PatchError {
        PatchError::Io {
            operation: operation.to_string(),
            path: path.map(String::from),
            source: source.to_string(),
        }
    }

    /// Create a resolution error naming the package and policy involved
    pub fn resolution_error(package: Option<&str>, policy: Option<&str>, report: &str) -> PatchError {
        PatchError::Resolution {
            package: package.map(String::from),
            policy: policy.map(String::from),
            report: report.to_string(),
        }
    }

    pub fn snapshot_error(field: &str, source: impl fmt::Display) -> PatchError {
        PatchError::Snapshot {
            field: field.to_string(),
            source: source.to_string(),
        }
    }

    pub fn config_error(operation: &str, field: Option<&str>, source: impl fmt::Display) -> PatchError {
        PatchError::Config {
            operation: operation.to_string(),
            field: field.map(String::from),
            source: source.to_string(),
        }
    }
}
