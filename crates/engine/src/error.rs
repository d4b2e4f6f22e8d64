//! Engine-layer error types.

use thiserror::Error;

use fabula_domain::ValidationError;

/// Error raised while loading behavior modules or finalising the registry.
/// Finalisation runs every gate and reports all offences together; the
/// engine never starts in partial validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryError {
    pub errors: Vec<String>,
}

impl RegistryError {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.len() == 1 {
            f.write_str(&self.errors[0])
        } else {
            writeln!(f, "{} behavior registry errors:", self.errors.len())?;
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

impl std::error::Error for RegistryError {}

/// Error raised while constructing a protocol handler.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Turn phase cycle: {0}")]
    PhaseCycle(String),
}
