//! Error types shared by the cache, providers and pipeline stages.
//!
//! A cache miss is not an error: lookups return `Option`. Translation failures
//! never reach this type either, translators fall back to the input text.

/// Errors surfaced by the flight-spy pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SpyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl SpyError {
    /// Build a [`SpyError::Provider`] from anything displayable.
    pub fn provider(provider: &str, message: impl std::fmt::Display) -> Self {
        SpyError::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = SpyError::provider("openstreetmap", "HTTP 509");
        assert_eq!(err.to_string(), "openstreetmap request failed: HTTP 509");
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<Vec<u8>> {
            Ok(std::fs::read("/definitely/not/here/flight-spy")?)
        }
        assert!(matches!(open_missing(), Err(SpyError::Io(_))));
    }
}
