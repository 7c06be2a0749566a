use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::{CollectionLayout, CollectionStore, IndexError};

/// One [`CollectionStore`] per dimensionality, created on first demand and
/// kept for the life of the registry.
#[derive(Debug)]
pub struct StoreRegistry {
    layout: CollectionLayout,
    stores: DashMap<usize, Arc<CollectionStore>>,
}

impl StoreRegistry {
    pub fn new(layout: CollectionLayout) -> Self {
        Self {
            layout,
            stores: DashMap::new(),
        }
    }

    pub fn layout(&self) -> &CollectionLayout {
        &self.layout
    }

    /// Dimensionalities with backing files on disk. Probed on every call so a
    /// collection dropped in after startup becomes visible.
    pub fn available_dimensions(&self) -> BTreeSet<usize> {
        self.layout.available_dimensions()
    }

    /// Store handle for `dimension`, not necessarily loaded.
    pub fn store(&self, dimension: usize) -> Result<Arc<CollectionStore>, IndexError> {
        if let Some(store) = self.stores.get(&dimension) {
            return Ok(Arc::clone(store.value()));
        }
        let store = CollectionStore::from_layout(&self.layout, dimension)?;
        let entry = self
            .stores
            .entry(dimension)
            .or_insert_with(|| Arc::new(store));
        Ok(Arc::clone(entry.value()))
    }

    /// Store for `dimension`, loading it on first use.
    pub async fn get_or_load(&self, dimension: usize) -> Result<Arc<CollectionStore>, IndexError> {
        let store = self.store(dimension)?;
        store.load().await?;
        Ok(store)
    }

    /// Document counts of every loaded store, for health reporting.
    pub fn loaded(&self) -> BTreeMap<usize, usize> {
        self.stores
            .iter()
            .filter(|entry| entry.value().is_loaded())
            .map(|entry| (*entry.key(), entry.value().count()))
            .collect()
    }
}
