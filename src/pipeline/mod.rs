//! Query resolution pipeline
//!
//! Reconciles locally indexed candidates with a debounced, cached remote
//! lookup, producing one deduplicated, ranked result set per query. All
//! mutation of the result set, the caches and the trie happens behind one
//! lock held only across synchronous sections; the suspension points are
//! the debounce timer and the network request.

use crate::config::TypeaheadConfig;
use crate::error::TypeaheadError;
use crate::network::{expand_url, HttpFetcher, RemoteFetcher};
use crate::normalize::{collapse_whitespace, display_string, normalize, Record};
use crate::results::{merge_by_identity, sort_by_group, sort_by_starting_letter, ResultSet};
use crate::trie::Trie;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Computes the identity key that determines logical equality of records
pub type IdentityFn = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// Applied to raw remote/prefetch payloads before normalization
pub type TransformFn = Arc<dyn Fn(Value) -> Vec<Value> + Send + Sync>;

/// The typeahead engine: a prefix index plus the query resolution pipeline
/// driving it.
///
/// [`Typeahead::resolve_query`] is the single entry point for input-change
/// events; consumers observe updates through [`Typeahead::subscribe`] or
/// [`Typeahead::results`]. When a remote source is configured the engine
/// schedules work on the ambient tokio runtime.
pub struct Typeahead {
    shared: Arc<Shared>,
}

/// Builder injecting the callable hooks the serde-friendly config cannot
/// carry.
pub struct TypeaheadBuilder {
    config: TypeaheadConfig,
    identity: Option<IdentityFn>,
    transform: Option<TransformFn>,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
}

struct Shared {
    config: TypeaheadConfig,
    group_field: Option<String>,
    identity: IdentityFn,
    transform: TransformFn,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
    state: Mutex<PipelineState>,
    updates: watch::Sender<ResultSet>,
}

struct PipelineState {
    trie: Trie,
    results: ResultSet,
    /// Frozen queries for which a request was already attempted
    sent_queries: HashSet<String>,
    /// Normalized responses keyed by the exact frozen query
    response_cache: HashMap<String, Vec<Record>>,
    fetch_in_flight: bool,
    debounce: Option<JoinHandle<()>>,
    prefetch_done: bool,
    stored_input: String,
}

impl TypeaheadBuilder {
    fn new(config: TypeaheadConfig) -> Self {
        Self {
            config,
            identity: None,
            transform: None,
            fetcher: None,
        }
    }

    /// Override the identity function (default: the identifier field's
    /// display string)
    pub fn identity<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        self.identity = Some(Arc::new(f));
        self
    }

    /// Override the payload transform (default: an array payload yields its
    /// elements, anything else yields nothing)
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Vec<Value> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Substitute the fetcher backing remote and prefetch sources
    pub fn fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Validate the configuration and build the engine, indexing any local
    /// data immediately.
    pub fn build(self) -> Result<Typeahead, TypeaheadError> {
        let config = self.config;
        config.validate()?;

        let identifier = config.source.identifier.clone();
        let identity: IdentityFn = self.identity.unwrap_or_else(|| {
            let field = identifier.clone();
            Arc::new(move |record: &Record| display_string(record, &field))
        });
        let transform: TransformFn = self.transform.unwrap_or_else(|| {
            Arc::new(|payload: Value| match payload {
                Value::Array(items) => items,
                _ => {
                    warn!("remote payload is not an array; configure a transform");
                    Vec::new()
                }
            })
        });

        let fetcher = match self.fetcher {
            Some(f) => Some(f),
            None if config.source.remote.is_some() || config.source.prefetch.is_some() => {
                let http = HttpFetcher::new().map_err(|e| TypeaheadError::RemoteInit {
                    reason: e.to_string(),
                })?;
                Some(Arc::new(http) as Arc<dyn RemoteFetcher>)
            }
            None => None,
        };

        let group_field = config
            .source
            .group_identifier
            .clone()
            .filter(|g| !g.is_empty());

        let mut trie = Trie::new(config.diacritics);
        if let Some(local) = &config.source.local {
            let records = normalize(local, &identifier)?;
            index_into(
                &mut trie,
                &records,
                &identifier,
                &config.source.data_tokens,
                &identity,
            );
        }

        let results = ResultSet::new(config.limit);
        let (updates, _) = watch::channel(results.clone());

        Ok(Typeahead {
            shared: Arc::new(Shared {
                config,
                group_field,
                identity,
                transform,
                fetcher,
                state: Mutex::new(PipelineState {
                    trie,
                    results,
                    sent_queries: HashSet::new(),
                    response_cache: HashMap::new(),
                    fetch_in_flight: false,
                    debounce: None,
                    prefetch_done: false,
                    stored_input: String::new(),
                }),
                updates,
            }),
        })
    }
}

impl Typeahead {
    /// Start building an engine from `config`
    pub fn builder(config: TypeaheadConfig) -> TypeaheadBuilder {
        TypeaheadBuilder::new(config)
    }

    /// Build an engine with the default hooks
    pub fn new(config: TypeaheadConfig) -> Result<Self, TypeaheadError> {
        Self::builder(config).build()
    }

    /// Resolve a raw input change into an updated result set.
    ///
    /// Queries shorter than the configured minimum clear the state without
    /// touching the index or the network. Otherwise the index answers
    /// synchronously, a cached remote response merges in if one exists, and
    /// a debounced remote lookup is (re)scheduled.
    pub fn resolve_query(&self, raw_input: &str) {
        Arc::clone(&self.shared).resolve(raw_input);
    }

    /// Snapshot of the live result set
    pub fn results(&self) -> ResultSet {
        self.shared.state.lock().unwrap().results.clone()
    }

    /// Subscribe to result-set snapshots published on every update
    pub fn subscribe(&self) -> watch::Receiver<ResultSet> {
        self.shared.updates.subscribe()
    }

    /// Last raw input passed to [`Typeahead::resolve_query`]; consumers use
    /// it to restore the input box when navigation cancels a selection
    pub fn stored_input(&self) -> String {
        self.shared.state.lock().unwrap().stored_input.clone()
    }

    /// Drop the per-query request and response caches. Queries attempted
    /// before the reset become eligible for a fresh remote lookup.
    pub fn reset_remote_cache(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.sent_queries.clear();
        state.response_cache.clear();
    }

    /// Fetch and index the one-shot prefetch source, returning the number of
    /// records indexed. Runs at most once per engine lifetime; later calls
    /// (and calls without a configured prefetch source) return `Ok(0)`.
    pub async fn run_prefetch(&self) -> Result<usize, TypeaheadError> {
        let shared = &self.shared;
        let Some(prefetch) = shared.config.source.prefetch.clone() else {
            return Ok(0);
        };
        {
            let mut state = shared.state.lock().unwrap();
            if state.prefetch_done {
                return Ok(0);
            }
            // even a failed prefetch is not retried
            state.prefetch_done = true;
        }
        let Some(fetcher) = shared.fetcher.clone() else {
            return Ok(0);
        };

        match fetcher.fetch(&prefetch.url).await {
            Ok(payload) => {
                let raw = (shared.transform)(payload);
                let records = normalize(&raw, &shared.config.source.identifier)?;
                let mut state = shared.state.lock().unwrap();
                shared.index_records(&mut state, &records);
                Ok(records.len())
            }
            Err(e) => {
                warn!(url = %prefetch.url, error = %e, "prefetch failed");
                Err(TypeaheadError::RemoteFetch {
                    url: prefetch.url.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Drop for Typeahead {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
        }
    }
}

impl Shared {
    fn resolve(self: Arc<Self>, raw_input: &str) {
        let mut state = self.state.lock().unwrap();

        // a keystroke atomically cancels-and-reschedules the debounce timer
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
        state.stored_input = raw_input.to_string();

        let value = collapse_whitespace(raw_input);
        if value.chars().count() < self.config.min_length {
            state.results.clear();
            state.stored_input.clear();
            self.publish(&state);
            return;
        }

        state.results.query = value.clone();
        self.recompute(&mut state, None);

        // consult the response cache for this exact query before any render
        if self.config.source.remote.is_some() && state.results.items.len() < state.results.limit
        {
            if let Some(cached) = state.response_cache.get(&value).filter(|c| !c.is_empty()) {
                let cached = cached.clone();
                self.recompute(&mut state, Some(&cached));
            }
        }

        self.refresh_no_match(&mut state, false);
        self.publish(&state);

        if self.config.source.remote.is_some() {
            let shared = Arc::clone(&self);
            state.debounce = Some(tokio::spawn(async move {
                tokio::time::sleep(shared.config.debounce()).await;
                shared.debounce_fired();
            }));
        }
    }

    /// Runs when the debounce delay elapses without another keystroke. The
    /// fetch targets whatever query is live at this point, not the one that
    /// scheduled the timer.
    fn debounce_fired(self: Arc<Self>) {
        let should_fetch = {
            let state = self.state.lock().unwrap();
            state.results.items.len() < state.results.limit && !state.fetch_in_flight
        };
        if should_fetch {
            tokio::spawn(Arc::clone(&self).fetch_from_remote());
        }
    }

    async fn fetch_from_remote(self: Arc<Self>) {
        let Some(remote) = self.config.source.remote.clone() else {
            return;
        };
        let Some(fetcher) = self.fetcher.clone() else {
            return;
        };

        let mut chained = false;
        loop {
            let frozen = {
                let mut state = self.state.lock().unwrap();
                if !chained {
                    // a single request may be in flight at a time
                    if state.fetch_in_flight {
                        return;
                    }
                    state.fetch_in_flight = true;
                }
                let frozen = state.results.query.clone();
                if frozen.is_empty() || state.sent_queries.contains(&frozen) {
                    state.fetch_in_flight = false;
                    self.refresh_no_match(&mut state, true);
                    self.publish(&state);
                    return;
                }
                frozen
            };

            let url = expand_url(&remote.url, &remote.wildcard, &frozen);
            debug!(query = %frozen, "remote lookup started");

            let records = match fetcher.fetch(&url).await {
                Ok(payload) => {
                    let raw = (self.transform)(payload);
                    match normalize(&raw, &self.config.source.identifier) {
                        Ok(records) => records,
                        Err(e) => {
                            warn!(query = %frozen, error = %e, "remote payload rejected");
                            Vec::new()
                        }
                    }
                }
                Err(e) => {
                    warn!(query = %frozen, error = %e, "remote lookup failed");
                    Vec::new()
                }
            };

            {
                let mut state = self.state.lock().unwrap();

                // cache the attempt and its response, success or failure, so
                // an unanswerable query is never retried
                state.sent_queries.insert(frozen.clone());
                state.response_cache.insert(frozen.clone(), records.clone());
                state.fetch_in_flight = false;

                if !records.is_empty() && !state.results.query.is_empty() {
                    self.index_records(&mut state, &records);
                    self.recompute(&mut state, Some(&records));
                }

                // the live query moved on while the request was in flight:
                // keep the merged view and chain a catch-up lookup
                chained = !state.results.query.is_empty() && state.results.query != frozen;
                if chained {
                    state.fetch_in_flight = true;
                }

                self.refresh_no_match(&mut state, true);
                self.publish(&state);
            }

            if !chained {
                return;
            }
            debug!("chaining catch-up lookup for the live query");
        }
    }

    /// Recompute the candidate list for the live query, optionally merging
    /// freshly received (and already indexed) remote records.
    fn recompute(&self, state: &mut PipelineState, remote_records: Option<&[Record]>) {
        let query = state.results.query.clone();
        let limit = state.results.limit;

        let (mut suggestions, mut count) = state.trie.search(&query, limit);

        if let Some(remote) = remote_records.filter(|r| !r.is_empty()) {
            suggestions = merge_by_identity(remote, &suggestions, |r| (self.identity)(r));
            count = suggestions.len();
        }

        sort_by_starting_letter(&mut suggestions, &query, &self.config.source.identifier);
        if let Some(group) = &self.group_field {
            sort_by_group(&mut suggestions, group);
        }

        state.results.items = suggestions;
        state.results.count = count;
        state.results.selected = None;
        if self.config.auto_select {
            state.results.selected = state.results.items.first().cloned();
        }
    }

    /// A query has no matches only once a remote answer can no longer
    /// arrive for it.
    fn refresh_no_match(&self, state: &mut PipelineState, async_completion: bool) {
        let no_matches = !state.results.query.is_empty()
            && state.results.items.is_empty()
            && (self.config.source.remote.is_none()
                || state.sent_queries.contains(&state.results.query)
                || (async_completion && !state.fetch_in_flight));
        state.results.no_matches = no_matches;
    }

    fn index_records(&self, state: &mut PipelineState, records: &[Record]) {
        index_into(
            &mut state.trie,
            records,
            &self.config.source.identifier,
            &self.config.source.data_tokens,
            &self.identity,
        );
    }

    fn publish(&self, state: &PipelineState) {
        self.updates.send_replace(state.results.clone());
    }
}

/// Index records under the identifier field plus every extra token field
fn index_into(
    trie: &mut Trie,
    records: &[Record],
    identifier: &str,
    data_tokens: &[String],
    identity: &IdentityFn,
) {
    if records.is_empty() {
        return;
    }
    trie.add(records, identifier, |r| identity(r));
    for field in data_tokens {
        trie.add(records, field, |r| identity(r));
    }
    debug!(
        count = records.len(),
        nodes = trie.node_count(),
        "index updated"
    );
}
