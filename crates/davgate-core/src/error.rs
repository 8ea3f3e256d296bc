//! Error type shared by configuration loading and depot lookups.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The configuration file, environment, or a secret reference is unusable.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// State that startup guarantees is missing at request time.
    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
