//! Per-version metadata document cache.
//!
//! Each version is fetched at most once for the lifetime of the cache.
//! Concurrent first requests for the same version wait on a single fetch;
//! requests for versions already loaded only take a read lock. A failed
//! fetch leaves nothing behind, so the next request tries again.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::document::MetadataDocument;
use crate::error::ResolveError;

type Slot = Arc<OnceCell<Arc<MetadataDocument>>>;

/// Version-keyed memo of loaded metadata documents.
#[derive(Debug, Default)]
pub struct DocumentCache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached document for `version`, running `fetch` if absent.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns; the error is not cached.
    pub fn get_or_fetch<F>(
        &self,
        version: &str,
        fetch: F,
    ) -> Result<Arc<MetadataDocument>, ResolveError>
    where
        F: FnOnce() -> Result<MetadataDocument, ResolveError>,
    {
        let slot = self.slot(version);
        if let Some(document) = slot.get() {
            debug!(version, "metadata cache hit");
            return Ok(Arc::clone(document));
        }
        slot.get_or_try_init(|| fetch().map(Arc::new))
            .map(Arc::clone)
    }

    /// Number of versions with a loaded document.
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, version: &str) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(version) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(version.to_string()).or_default())
    }
}
