//! Engine configuration
//!
//! Configuration is plain data supplied by the consumer; callable hooks
//! (identity, transform) are injected through the engine builder so these
//! types stay serde-friendly.

use crate::error::TypeaheadError;
use crate::{DEFAULT_DEBOUNCE_MS, DEFAULT_LIMIT, DEFAULT_MIN_LENGTH};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default identifier field for records
pub const DEFAULT_IDENTIFIER: &str = "label";

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeaheadConfig {
    /// Minimum query length before any lookup fires
    pub min_length: usize,
    /// Maximum rendered candidates, distinct from the true match count
    pub limit: usize,
    /// Debounce delay for remote lookups, in milliseconds
    pub debounce_ms: u64,
    /// Enable diacritic-insensitive matching
    pub diacritics: bool,
    /// Mark the first ranked candidate as selected on every recomputation
    pub auto_select: bool,
    /// Data sources feeding the index
    pub source: SourceConfig,
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            limit: DEFAULT_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            diacritics: false,
            auto_select: false,
            source: SourceConfig::default(),
        }
    }
}

impl TypeaheadConfig {
    /// Debounce delay as a [`Duration`]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate the fail-fast preconditions: a usable identifier, at least
    /// one data source, and well-formed remote/prefetch URLs.
    pub fn validate(&self) -> Result<(), TypeaheadError> {
        if self.source.identifier.is_empty() {
            return Err(TypeaheadError::EmptyIdentifier);
        }

        if self.source.local.is_none()
            && self.source.remote.is_none()
            && self.source.prefetch.is_none()
        {
            return Err(TypeaheadError::NoDataSource);
        }

        if let Some(remote) = &self.source.remote {
            if remote.wildcard.is_empty() || !remote.url.contains(&remote.wildcard) {
                return Err(TypeaheadError::MissingWildcard {
                    url: remote.url.clone(),
                    wildcard: remote.wildcard.clone(),
                });
            }
            let probe = remote.url.replace(&remote.wildcard, "probe");
            Url::parse(&probe).map_err(|e| TypeaheadError::InvalidUrl {
                url: remote.url.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(prefetch) = &self.source.prefetch {
            Url::parse(&prefetch.url).map_err(|e| TypeaheadError::InvalidUrl {
                url: prefetch.url.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Field that identifies and displays a record
    pub identifier: String,
    /// Optional field used to group candidates
    pub group_identifier: Option<String>,
    /// Extra fields whose tokens are indexed alongside the identifier
    pub data_tokens: Vec<String>,
    /// Items indexed at startup
    pub local: Option<Vec<Value>>,
    /// Per-query remote lookup source
    pub remote: Option<RemoteConfig>,
    /// One-shot bulk prefetch source
    pub prefetch: Option<PrefetchConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            group_identifier: None,
            data_tokens: Vec::new(),
            local: None,
            remote: None,
            prefetch: None,
        }
    }
}

/// Remote lookup source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// URL template containing the wildcard token
    pub url: String,
    /// Token in `url` replaced by the percent-encoded query
    pub wildcard: String,
}

/// One-shot prefetch source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// URL fetched once to bulk-load the index
    pub url: String,
    /// When the consumer should trigger the prefetch
    #[serde(default)]
    pub when: PrefetchWhen,
}

/// Consumer-side trigger policy for the prefetch source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrefetchWhen {
    /// Prefetch as soon as the engine is created
    #[default]
    OnInit,
    /// Prefetch when the input first gains focus
    OnFocus,
}
