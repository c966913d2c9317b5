//! Error types for the health engine.
//!
//! Errors are classified by how the caller should react:
//! - Configuration: a provider credential is absent — the feature reports
//!   itself as "not configured" instead of failing the whole request.
//! - Integration: a provider call failed — treated as a missing signal.
//! - Validation: malformed request input — reject, no retry.
//! - Persistence: store read/write failure — surfaced, but a batch run
//!   continues with the remaining accounts.
//! - Advisory: the AI advisory call failed — callers fall back to the
//!   neutral advisory result.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{feature} is not configured: {detail}")]
    Configuration { feature: &'static str, detail: String },

    #[error("Provider call failed ({provider}): {detail}")]
    Integration { provider: &'static str, detail: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    #[error("Advisory error: {0}")]
    Advisory(String),
}

impl EngineError {
    /// Integration and advisory failures are transient by nature;
    /// everything else needs a code or config change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Integration { .. } | EngineError::Advisory(_)
        )
    }

    /// Whether this error should abort the surrounding batch run.
    /// Only validation errors do — they indicate a caller bug, not a
    /// per-account condition.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn not_configured(feature: &'static str, detail: impl Into<String>) -> Self {
        EngineError::Configuration {
            feature,
            detail: detail.into(),
        }
    }

    pub fn integration(provider: &'static str, detail: impl Into<String>) -> Self {
        EngineError::Integration {
            provider,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_is_retryable() {
        let err = EngineError::integration("billing", "timeout");
        assert!(err.is_retryable());
        assert!(!err.aborts_batch());
    }

    #[test]
    fn test_validation_aborts_batch() {
        let err = EngineError::Validation("missing accountId".into());
        assert!(err.aborts_batch());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_configuration_is_not_retryable() {
        let err = EngineError::not_configured("advisory", "no API key");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("not configured"));
    }
}
