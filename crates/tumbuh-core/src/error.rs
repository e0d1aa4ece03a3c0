//! Error types for Tumbuh

use crate::models::{AreaId, AreaStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TumbuhError {
    // Admission errors (rejected before any area state exists)
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // Area errors
    #[error("Area not found: {id}")]
    AreaNotFound { id: AreaId },

    #[error("Area {id} is already being processed")]
    AreaBusy { id: AreaId },

    #[error("Area {id} is not complete (status {status})")]
    AreaNotReady { id: AreaId, status: AreaStatus },

    #[error("Invalid status transition for area {id}: {from} -> {to}")]
    InvalidTransition {
        id: AreaId,
        from: AreaStatus,
        to: AreaStatus,
    },

    // Pipeline stage errors
    #[error("Tiling failed: {0}")]
    Tiling(String),

    #[error("Variable collection failed: {0}")]
    Collection(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Pipeline failed: {0}")]
    Pipeline(String),

    // Provider errors
    #[error("Provider unavailable: {reason}. Try: {remediation}")]
    ProviderUnavailable { reason: String, remediation: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TumbuhError {
    /// Build a validation error for a request field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), reason: reason.into() }
    }

    /// Whether this error is a synchronous admission rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error must move an in-flight area to `FAILED`.
    ///
    /// Collection and enrichment failures are isolated by their stages and
    /// never reach the orchestrator's fatal path.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Validation { .. } | Self::Collection(_) | Self::Enrichment(_))
    }
}

impl From<serde_json::Error> for TumbuhError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TumbuhError>;
