//! Error types for the typeahead engine
//!
//! Two families exist: configuration errors are fatal and surfaced at setup
//! time, remote fetch errors are recovered locally by the pipeline and only
//! escape through the explicit prefetch entry point.

use thiserror::Error;

/// Errors surfaced by the typeahead engine
#[derive(Debug, Error)]
pub enum TypeaheadError {
    /// The identifier field name was configured as an empty string
    #[error("identifier field name must not be empty")]
    EmptyIdentifier,

    /// No data source was configured at all
    #[error("no data source configured: at least one of local, prefetch or remote is required")]
    NoDataSource,

    /// A pre-structured record lacks the configured identifier field
    #[error("record at position {index} is missing identifier field `{field}`")]
    MissingIdentifier { field: String, index: usize },

    /// The remote URL template does not contain its wildcard token
    #[error("remote url `{url}` does not contain wildcard `{wildcard}`")]
    MissingWildcard { url: String, wildcard: String },

    /// A configured URL does not parse
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client backing a configured remote source failed to initialize
    #[error("remote data source initialization failed: {reason}")]
    RemoteInit { reason: String },

    /// A remote request failed (network or transport)
    #[error("remote fetch for `{url}` failed: {reason}")]
    RemoteFetch { url: String, reason: String },
}

impl TypeaheadError {
    /// Whether this error belongs to the fatal setup-time configuration family
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::RemoteFetch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let config_err = TypeaheadError::NoDataSource;
        assert!(config_err.is_configuration());

        let fetch_err = TypeaheadError::RemoteFetch {
            url: "https://example.com".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(!fetch_err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = TypeaheadError::MissingIdentifier {
            field: "label".to_string(),
            index: 2,
        };
        assert_eq!(
            err.to_string(),
            "record at position 2 is missing identifier field `label`"
        );
    }
}
