// crates/qlog-schemas/src/cache.rs
// ============================================================================
// Module: Schema Cache
// Description: Process-lifetime memo of dataset schemas.
// Purpose: Resolve each dataset's schema at most once, including failures.
// Dependencies: qlog-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! The cache maps each dataset to a slot. The first request for a dataset
//! locks its slot and introspects; concurrent requests for the same dataset
//! wait on that slot and see the stored result, while requests for other
//! datasets proceed independently.
//!
//! A successful fetch stores the schema. A definitive failure (the dataset
//! answered with errors or a malformed result) stores a negative entry that is
//! never retried. A transport failure stores nothing and propagates, so a later
//! request tries again. Entries are never invalidated.
//!
//! # Invariants
//! - At most one fetch is in flight per dataset.
//! - A filled slot is never overwritten.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use qlog_core::DatasetDiscovery;
use qlog_core::DatasetId;
use qlog_core::DiscoveryError;
use qlog_core::Schema;
use qlog_core::SchemaFetchError;
use qlog_core::SchemaResolver;
use qlog_core::SchemaSource;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup warm-up errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarmError {
    /// The indexed snapshot could not be taken.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// A schema fetch failed at the transport level.
    #[error("warming {dataset} failed: {source}")]
    Fetch {
        /// Dataset being warmed.
        dataset: DatasetId,
        /// Underlying failure.
        source: SchemaFetchError,
    },
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Cached resolution of one dataset; `None` inside means "no usable schema".
type CachedSchema = Option<Arc<Schema>>;

/// Per-dataset slot; empty until the first fetch settles.
type Slot = Arc<Mutex<Option<CachedSchema>>>;

/// Single-flight schema cache over a [`SchemaSource`].
pub struct SchemaCache<S> {
    /// Underlying schema source.
    source: S,
    /// Optional dataset discovery snapshot provider.
    discovery: Option<Arc<dyn DatasetDiscovery>>,
    /// Refuse to fetch datasets missing from the indexed snapshot.
    require_indexed: bool,
    /// Slots keyed by dataset.
    slots: Mutex<BTreeMap<DatasetId, Slot>>,
}

impl<S: SchemaSource> SchemaCache<S> {
    /// Creates an empty cache over a schema source.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            discovery: None,
            require_indexed: false,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// Attaches dataset discovery.
    ///
    /// With `require_indexed`, an unseen dataset that is not in the indexed
    /// snapshot resolves to no schema without being cached.
    #[must_use]
    pub fn with_discovery(
        mut self,
        discovery: Arc<dyn DatasetDiscovery>,
        require_indexed: bool,
    ) -> Self {
        self.discovery = Some(discovery);
        self.require_indexed = require_indexed;
        self
    }

    /// Resolves every indexed dataset ahead of ingestion.
    ///
    /// Returns the number of datasets that resolved to a usable schema.
    ///
    /// # Errors
    ///
    /// Returns [`WarmError`] when discovery fails or a fetch fails at the
    /// transport level.
    pub fn warm(&self) -> Result<usize, WarmError> {
        let Some(discovery) = &self.discovery else {
            return Ok(0);
        };
        let indexed = discovery.indexed_datasets()?;
        let mut usable = 0;
        for dataset in &indexed {
            let resolved = self.resolve(dataset).map_err(|source| WarmError::Fetch {
                dataset: dataset.clone(),
                source,
            })?;
            if resolved.is_some() {
                usable += 1;
            }
        }
        info!(indexed = indexed.len(), usable, "schema cache warmed");
        Ok(usable)
    }

    /// Returns true when a dataset has a settled entry.
    ///
    /// A dataset whose first fetch is still in flight counts as not cached.
    #[must_use]
    pub fn is_cached(&self, dataset: &DatasetId) -> bool {
        let Ok(slots) = self.slots.lock() else {
            return false;
        };
        slots.get(dataset).is_some_and(|slot| slot.try_lock().is_ok_and(|cached| cached.is_some()))
    }

    /// Returns the number of settled entries.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        let Ok(slots) = self.slots.lock() else {
            return 0;
        };
        slots.values().filter(|slot| slot.try_lock().is_ok_and(|cached| cached.is_some())).count()
    }

    /// Returns the slot of a dataset, creating it when absent.
    fn slot(&self, dataset: &DatasetId) -> Result<Slot, SchemaFetchError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| SchemaFetchError::Transport("schema cache lock poisoned".to_string()))?;
        Ok(Arc::clone(slots.entry(dataset.clone()).or_default()))
    }

    /// Returns false when discovery rules out fetching an unseen dataset.
    fn may_fetch(&self, dataset: &DatasetId) -> Result<bool, SchemaFetchError> {
        match (&self.discovery, self.require_indexed) {
            (Some(discovery), true) => discovery
                .indexed_datasets()
                .map(|indexed| indexed.contains(dataset))
                .map_err(|err| SchemaFetchError::Transport(err.to_string())),
            _ => Ok(true),
        }
    }
}

impl<S: SchemaSource> SchemaResolver for SchemaCache<S> {
    fn resolve(&self, dataset: &DatasetId) -> Result<Option<Arc<Schema>>, SchemaFetchError> {
        let slot = self.slot(dataset)?;
        let mut entry = slot
            .lock()
            .map_err(|_| SchemaFetchError::Transport("schema slot lock poisoned".to_string()))?;
        if let Some(cached) = entry.as_ref() {
            return Ok(cached.clone());
        }
        if !self.may_fetch(dataset)? {
            warn!(dataset = %dataset, "dataset is not indexed; schema not fetched");
            return Ok(None);
        }
        match self.source.fetch_schema(dataset) {
            Ok(schema) => {
                let schema = Arc::new(schema);
                info!(dataset = %dataset, types = schema.type_count(), "cached dataset schema");
                *entry = Some(Some(Arc::clone(&schema)));
                Ok(Some(schema))
            }
            Err(err) if err.is_definitive() => {
                warn!(dataset = %dataset, error = %err, "cached missing schema for dataset");
                *entry = Some(None);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
