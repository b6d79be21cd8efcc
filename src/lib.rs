//! Typeahead-RS: an incremental prefix-search and autocomplete engine
//!
//! An in-memory character trie with idempotent multi-key insertion and
//! subtree-limited retrieval, layered with a query resolution pipeline that
//! reconciles local candidates with a debounced, cached remote lookup into a
//! single deduplicated, ranked result set.

pub mod config;
pub mod error;
pub mod network;
pub mod normalize;
pub mod pipeline;
pub mod results;
pub mod trie;

pub use config::{PrefetchConfig, PrefetchWhen, RemoteConfig, SourceConfig, TypeaheadConfig};
pub use error::TypeaheadError;
pub use network::{HttpFetcher, RemoteFetcher};
pub use normalize::{normalize, Record};
pub use pipeline::{IdentityFn, TransformFn, Typeahead, TypeaheadBuilder};
pub use results::ResultSet;
pub use trie::Trie;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum number of rendered candidates
pub const DEFAULT_LIMIT: usize = 5;

/// Default minimum query length before any lookup fires
pub const DEFAULT_MIN_LENGTH: usize = 1;

/// Default debounce delay for remote lookups, in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default timeout for remote requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 5;
