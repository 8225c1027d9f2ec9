//! Errors

use thiserror::Error;

use crate::validate::ValidationReport;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by mapping, rendering and persistence operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A single-row finder required a row and found none.
    #[error("{0}")]
    NotFound(String),

    /// `save` was blocked by failed field validators. Carries the full
    /// per-field error report.
    #[error("validation failed on save")]
    Validation(ValidationReport),

    /// No connection or provider could be resolved for an entity type.
    #[error("{0}")]
    Configuration(String),

    /// Expression or value handling encountered an unsupported or
    /// unconvertible value.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A metadata lookup named an unknown column or association, or a
    /// required declaration (such as a primary key) is missing.
    #[error("{0}")]
    Metadata(String),

    /// An opaque driver failure, propagated unmodified from the
    /// connection collaborator. Never retried at this layer.
    #[error(transparent)]
    Connection(#[from] anyhow::Error),
}

impl Error {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Shorthand for a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for an `InvalidValue` error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Shorthand for a `Metadata` error.
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }
}
