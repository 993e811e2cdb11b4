use bson::Document;
use natours_query::{FilterGroup, Query};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Field sets whose combined values must be unique across the collection.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    /// Fields a replace leaves alone: they keep their stored values and only
    /// change through `find_one_and_update`.
    #[serde(default)]
    pub managed: Vec<String>,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
            managed: Vec::new(),
        }
    }

    pub fn unique(mut self, fields: &[&str]) -> Self {
        self.unique
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn managed(mut self, fields: &[&str]) -> Self {
        self.managed.extend(fields.iter().map(|f| f.to_string()));
        self
    }
}

/// The collection-level operations the rest of the system is written against.
///
/// Documents are keyed by a string `_id`. Every stored document carries a
/// `__v` revision counter: 0 on insert, bumped by each write that changes it.
/// All writes on one store are serialized; reads never block writers.
pub trait DocumentStore: Send + Sync {
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError>;

    /// Filter, sort, skip/take, then project.
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    fn count(&self, collection: &str, filter: Option<&FilterGroup>) -> Result<u64, StoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a document, generating an `_id` when it has none. Returns the
    /// stored document.
    fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Replace the whole document stored under `id`, except for the
    /// collection's managed fields. `None` when it does not exist.
    fn replace(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrite the given top-level fields and return the updated document.
    fn find_one_and_update(
        &self,
        collection: &str,
        id: &str,
        set: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove and return the document stored under `id`.
    fn find_one_and_delete(&self, collection: &str, id: &str)
    -> Result<Option<Document>, StoreError>;
}
