use std::collections::HashMap;
use std::sync::Arc;

use bson::Document;
use natours_store::{CollectionConfig, DocumentStore};
use tracing::{debug, info};

use crate::aggregate::RatingAggregate;
use crate::error::DbError;
use crate::hooks::{WriteHook, WriteOp};
use crate::model::Model;
use crate::models::{Booking, Review, Tour, User};
use crate::repository::Repository;

/// The application's collections over one document store, with the write
/// hooks attached to them.
pub struct Db {
    store: Arc<dyn DocumentStore>,
    ratings: Arc<RatingAggregate>,
    hooks: HashMap<&'static str, Vec<Arc<dyn WriteHook>>>,
}

impl Db {
    /// Create the collections (idempotent) and wire the rating aggregate to
    /// review writes.
    pub fn open(store: Arc<dyn DocumentStore>) -> Result<Self, DbError> {
        register::<Tour>(store.as_ref())?;
        register::<User>(store.as_ref())?;
        register::<Review>(store.as_ref())?;
        register::<Booking>(store.as_ref())?;

        let ratings = Arc::new(RatingAggregate::new(Arc::clone(&store)));
        let mut db = Self {
            store,
            ratings: Arc::clone(&ratings),
            hooks: HashMap::new(),
        };
        db.add_hook(Review::COLLECTION, ratings);
        Ok(db)
    }

    pub fn add_hook(&mut self, collection: &'static str, hook: Arc<dyn WriteHook>) {
        self.hooks.entry(collection).or_default().push(hook);
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn ratings(&self) -> &RatingAggregate {
        &self.ratings
    }

    pub fn repo<M: Model>(&self) -> Repository<'_, M> {
        Repository::new(self)
    }

    /// Apply one write with the collection's hooks around it: every hook
    /// captures before the write, and is told about the result only once the
    /// write is committed. Returns the committed document (the removed one
    /// for deletes), `None` when the target did not exist.
    pub(crate) fn write(
        &self,
        collection: &str,
        op: WriteOp<'_>,
    ) -> Result<Option<Document>, DbError> {
        let hooks = self.hooks.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let mut captured = Vec::with_capacity(hooks.len());
        for hook in hooks {
            captured.push(hook.capture(&op)?);
        }

        let committed = match op {
            WriteOp::Insert(doc) => Some(self.store.insert(collection, doc.clone())?),
            WriteOp::Replace { id, doc } => self.store.replace(collection, id, doc.clone())?,
            WriteOp::Update { id, set } => {
                self.store.find_one_and_update(collection, id, set.clone())?
            }
            WriteOp::Delete { id } => self.store.find_one_and_delete(collection, id)?,
        };

        let Some(doc) = committed else {
            debug!(collection, id = ?op.target_id(), "write target not found");
            return Ok(None);
        };
        debug!(collection, id = ?doc.get_str("_id").ok(), "write committed");

        for (hook, ids) in hooks.iter().zip(captured) {
            hook.on_committed(ids, Some(&doc));
        }
        Ok(Some(doc))
    }
}

fn register<M: Model>(store: &dyn DocumentStore) -> Result<(), DbError> {
    let config = M::UNIQUE
        .iter()
        .fold(CollectionConfig::new(M::COLLECTION), |config, fields| {
            config.unique(fields)
        })
        .managed(M::MANAGED);
    store.create_collection(&config)?;
    info!(collection = M::COLLECTION, "collection ready");
    Ok(())
}
