//! Unified error types for the domain layer.
//!
//! Provides common error types used across all domain operations, enabling
//! consistent error handling without forcing callers onto String or anyhow.

use thiserror::Error;

/// Unified error type for state operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Entity not found
    #[error("Entity not found: {kind} with id {id}")]
    EntityNotFound { kind: &'static str, id: String },

    /// A move targeted an id that is not a known container
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// The world has reached a state no further input can safely mutate.
    /// The rendered message carries the corruption-latch prefix.
    #[error("INCONSISTENT STATE: {0}")]
    InconsistentState(String),

    /// Business rule violation
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DomainError {
    /// Create an entity-not-found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a container-not-found error
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::ContainerNotFound(id.into())
    }

    /// Create an inconsistent-state error
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentState(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }
}

/// Error raised when structural validation of a world fails. Every offence
/// found in one pass is accumulated so authors fix a world file in one trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl ValidationError {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.len() == 1 {
            f.write_str(&self.errors[0])
        } else {
            writeln!(f, "{} validation errors:", self.errors.len())?;
            for (i, err) in self.errors.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "  - {err}")?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error raised while reading or writing a world file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("World file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A structural field had the wrong shape or was missing
    #[error("Malformed world data: {0}")]
    Shape(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl LoadError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistent_state_carries_latch_prefix() {
        let err = DomainError::inconsistent("item item_bag cannot contain itself");
        assert!(err.to_string().starts_with("INCONSISTENT STATE:"));
        assert!(err.to_string().contains("item_bag"));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let err = DomainError::not_found("item", "item_sword");
        assert!(err.to_string().contains("item"));
        assert!(err.to_string().contains("item_sword"));
    }

    #[test]
    fn single_validation_error_displays_bare() {
        let err = ValidationError::single("Duplicate ID 'loc_a'");
        assert_eq!(err.to_string(), "Duplicate ID 'loc_a'");
    }

    #[test]
    fn aggregated_validation_errors_are_listed() {
        let err = ValidationError::new(vec!["first".to_string(), "second".to_string()]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("2 validation errors:"));
        assert!(rendered.contains("  - first"));
        assert!(rendered.contains("  - second"));
    }
}
