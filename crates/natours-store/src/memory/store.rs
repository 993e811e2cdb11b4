use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use arc_swap::ArcSwap;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use imbl::OrdMap;
use natours_query::{FilterGroup, Query};

use crate::error::StoreError;
use crate::eval::matches;
use crate::exec::execute;
use crate::store::{CollectionConfig, DocumentStore};

const VERSION_FIELD: &str = "__v";

pub(crate) type Documents = OrdMap<String, Document>;

struct Collection {
    config: CollectionConfig,
    docs: ArcSwap<Documents>,
}

/// In-memory document store.
///
/// Readers load an immutable snapshot per collection; writers hold a single
/// store-wide lock, clone the collection's map (cheap due to imbl structural
/// sharing), mutate it and swap it back in.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    write_lock: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    fn collection(&self, name: &str) -> Result<Arc<Collection>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))?;
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn snapshot(&self, name: &str) -> Result<Arc<Documents>, StoreError> {
        Ok(self.collection(name)?.docs.load_full())
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }
}

impl DocumentStore for MemoryStore {
    fn create_collection(&self, config: &CollectionConfig) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collections lock poisoned: {e}")))?;
        collections.entry(config.name.clone()).or_insert_with(|| {
            Arc::new(Collection {
                config: config.clone(),
                docs: ArcSwap::from_pointee(OrdMap::new()),
            })
        });
        Ok(())
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.snapshot(collection)?;
        Ok(execute(docs.values(), query))
    }

    fn count(&self, collection: &str, filter: Option<&FilterGroup>) -> Result<u64, StoreError> {
        let docs = self.snapshot(collection)?;
        let count = match filter {
            Some(filter) => docs.values().filter(|d| matches(d, filter)).count(),
            None => docs.len(),
        };
        Ok(count as u64)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.snapshot(collection)?.get(id).cloned())
    }

    fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, StoreError> {
        let coll = self.collection(collection)?;
        let id = normalize_id(&mut doc)?;
        doc.insert(VERSION_FIELD, 0_i32);

        let _guard = self.lock_writes()?;
        let mut data = (**coll.docs.load()).clone();
        if data.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                fields: vec!["_id".to_string()],
                value: id,
            });
        }
        check_unique(&coll.config, &data, &id, &doc)?;
        data.insert(id, doc.clone());
        coll.docs.store(Arc::new(data));
        Ok(doc)
    }

    fn replace(
        &self,
        collection: &str,
        id: &str,
        mut doc: Document,
    ) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection)?;

        let _guard = self.lock_writes()?;
        let mut data = (**coll.docs.load()).clone();
        let Some(existing) = data.get(id) else {
            return Ok(None);
        };
        for field in &coll.config.managed {
            match existing.get(field) {
                Some(value) => doc.insert(field.clone(), value.clone()),
                None => doc.remove(field),
            };
        }
        doc.insert("_id", id);
        doc.insert(VERSION_FIELD, next_version(existing));
        check_unique(&coll.config, &data, id, &doc)?;
        data.insert(id.to_string(), doc.clone());
        coll.docs.store(Arc::new(data));
        Ok(Some(doc))
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        id: &str,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection)?;

        let _guard = self.lock_writes()?;
        let mut data = (**coll.docs.load()).clone();
        let Some(existing) = data.get(id) else {
            return Ok(None);
        };
        let mut doc = existing.clone();
        for (key, value) in set {
            if key == "_id" || key == VERSION_FIELD {
                continue;
            }
            doc.insert(key, value);
        }
        doc.insert(VERSION_FIELD, next_version(existing));
        check_unique(&coll.config, &data, id, &doc)?;
        data.insert(id.to_string(), doc.clone());
        coll.docs.store(Arc::new(data));
        Ok(Some(doc))
    }

    fn find_one_and_delete(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection)?;

        let _guard = self.lock_writes()?;
        let mut data = (**coll.docs.load()).clone();
        let removed = data.remove(id);
        if removed.is_some() {
            coll.docs.store(Arc::new(data));
        }
        Ok(removed)
    }
}

/// Make sure `_id` is a string, generating a fresh ObjectId hex when absent.
fn normalize_id(doc: &mut Document) -> Result<String, StoreError> {
    let id = match doc.get("_id") {
        None | Some(Bson::Null) => ObjectId::new().to_hex(),
        Some(Bson::String(s)) if !s.is_empty() => s.clone(),
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => {
            return Err(StoreError::Storage(format!(
                "_id must be a string or ObjectId, got {other}"
            )));
        }
    };
    doc.insert("_id", id.clone());
    Ok(id)
}

fn next_version(doc: &Document) -> i32 {
    match doc.get(VERSION_FIELD) {
        Some(Bson::Int32(v)) => v.saturating_add(1),
        Some(Bson::Int64(v)) => i32::try_from(*v).unwrap_or(i32::MAX).saturating_add(1),
        _ => 1,
    }
}

/// Reject `doc` when another document already holds the same values for any
/// unique field set. Field sets the document does not fully populate are
/// not checked.
fn check_unique(
    config: &CollectionConfig,
    data: &Documents,
    id: &str,
    doc: &Document,
) -> Result<(), StoreError> {
    for fields in &config.unique {
        let Some(key) = unique_key(doc, fields) else {
            continue;
        };
        let clash = data
            .iter()
            .filter(|(other_id, _)| other_id.as_str() != id)
            .any(|(_, other)| unique_key(other, fields).as_ref() == Some(&key));
        if clash {
            return Err(StoreError::DuplicateKey {
                collection: config.name.clone(),
                fields: fields.clone(),
                value: key
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }
    Ok(())
}

fn unique_key(doc: &Document, fields: &[String]) -> Option<Vec<Bson>> {
    fields
        .iter()
        .map(|f| match crate::exec::get_path(doc, f) {
            None | Some(Bson::Null) => None,
            Some(v) => Some(v.clone()),
        })
        .collect()
}
