use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised by the engine.
///
/// `UnknownAttribute` and `InvalidSortConfiguration` indicate a broken
/// configuration and are never retried. `BackendFailure` wraps whatever the
/// adapter returned; the provider that observed it is left unprepared so the
/// caller may try again.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Unknown sort attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("Invalid sort configuration: {0}")]
    InvalidSortConfiguration(String),

    #[error("Backend failure: {source}")]
    BackendFailure {
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },
}

impl EngineError {
    pub fn unknown_attribute(attribute: impl Into<String>) -> Self {
        EngineError::UnknownAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        EngineError::BackendFailure {
            source: Arc::new(err),
        }
    }

    /// Whether a caller-level retry could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::BackendFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[test]
    fn backend_failure_keeps_source() {
        let err = EngineError::backend(ConnectionReset);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Backend failure: connection reset");
        assert!(err.source().is_some());
    }

    #[test]
    fn configuration_errors_are_not_retryable() {
        assert!(!EngineError::unknown_attribute("title").is_retryable());
        assert!(
            !EngineError::InvalidSortConfiguration("x".into()).is_retryable()
        );
    }
}
