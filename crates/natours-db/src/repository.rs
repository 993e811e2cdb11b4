use std::marker::PhantomData;

use bson::{Bson, Document};
use natours_query::{Filter, FilterGroup, FilterNode, Projection, Query, merge_filters};
use natours_store::{matches, project};

use crate::db::Db;
use crate::error::{DbError, ValidationError};
use crate::hooks::WriteOp;
use crate::model::{Model, Populate, SaveContext, check_object_id};

const PROTECTED_FIELDS: [&str; 2] = ["_id", "__v"];

/// Typed access to one model's collection.
///
/// Reads apply the model's default filter and never return its hidden
/// fields; the `*_model` variants return the full typed model instead.
pub struct Repository<'a, M: Model> {
    db: &'a Db,
    _model: PhantomData<fn() -> M>,
}

impl<'a, M: Model> Repository<'a, M> {
    pub(crate) fn new(db: &'a Db) -> Self {
        Self {
            db,
            _model: PhantomData,
        }
    }

    // ── Reads ───────────────────────────────────────────────

    pub fn find(&self, query: Query) -> Result<Vec<Document>, DbError> {
        let query = Query {
            filter: merge_filters(query.filter, M::default_filter()),
            projection: hide(query.projection, M::HIDDEN),
            ..query
        };
        self.db
            .store()
            .find(M::COLLECTION, &query)?
            .into_iter()
            .map(|doc| self.present(doc))
            .collect()
    }

    /// Documents for the given ids, in storage order.
    pub fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let any_of = FilterGroup::or(
            ids.iter()
                .map(|id| FilterNode::Condition(Filter::eq("_id", id.as_str())))
                .collect(),
        );
        self.find(Query::filtered(any_of))
    }

    /// Typed models matching `query`, hidden fields included.
    pub fn find_models(&self, query: Query) -> Result<Vec<M>, DbError> {
        let query = Query {
            filter: merge_filters(query.filter, M::default_filter()),
            ..query
        };
        self.db
            .store()
            .find(M::COLLECTION, &query)?
            .into_iter()
            .map(|doc| Ok(bson::from_document(doc)?))
            .collect()
    }

    pub fn find_one(&self, filter: FilterGroup) -> Result<Option<M>, DbError> {
        let query = Query {
            filter: Some(filter),
            take: Some(1),
            ..Default::default()
        };
        Ok(self.find_models(query)?.into_iter().next())
    }

    pub fn count(&self, filter: Option<FilterGroup>) -> Result<u64, DbError> {
        let filter = merge_filters(filter, M::default_filter());
        Ok(self.db.store().count(M::COLLECTION, filter.as_ref())?)
    }

    pub fn get(&self, id: &str) -> Result<Document, DbError> {
        let doc = self.visible(id)?;
        self.present(doc)
    }

    pub fn get_model(&self, id: &str) -> Result<M, DbError> {
        Ok(bson::from_document(self.visible(id)?)?)
    }

    // ── Writes ──────────────────────────────────────────────

    /// Build a model from a request body and insert it.
    pub fn create(&self, mut body: Document) -> Result<Document, DbError> {
        for field in PROTECTED_FIELDS.iter().chain(M::MANAGED) {
            body.remove(*field);
        }
        let model: M = bson::from_document(body).map_err(invalid_input)?;
        let stored = self.insert(model)?;
        self.present(stored)
    }

    /// Insert a typed model and return it as stored.
    pub fn create_model(&self, model: M) -> Result<M, DbError> {
        let stored = self.insert(model)?;
        Ok(bson::from_document(stored)?)
    }

    /// Merge `patch` over the current document, validate the result and
    /// replace it. Protected and managed fields in `patch` are ignored.
    pub fn update(&self, id: &str, patch: Document) -> Result<Document, DbError> {
        let mut merged = self.visible(id)?;
        let mut modified = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            if PROTECTED_FIELDS.contains(&key.as_str()) || M::MANAGED.contains(&key.as_str()) {
                continue;
            }
            modified.push(key.clone());
            merged.insert(key, value);
        }

        let mut model: M = bson::from_document(merged).map_err(invalid_input)?;
        let ctx = SaveContext::modifying(modified);
        let stored = self.replace(id, &mut model, &ctx, true)?;
        self.present(stored)
    }

    /// Write back a model loaded by id. Only `modified` fields count as
    /// changed for the save hooks.
    pub fn save(
        &self,
        model: &mut M,
        modified: &[&str],
        validate: bool,
    ) -> Result<Document, DbError> {
        let id = model
            .id()
            .map(str::to_string)
            .ok_or_else(|| DbError::NotFound(format!("unsaved {} document", M::COLLECTION)))?;
        check_object_id(&id)?;
        let ctx = SaveContext::modifying(modified.iter().copied());
        self.replace(&id, model, &ctx, validate)
    }

    pub fn delete(&self, id: &str) -> Result<Document, DbError> {
        self.visible(id)?;
        self.db
            .write(M::COLLECTION, WriteOp::Delete { id })?
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    // ── Internals ───────────────────────────────────────────

    fn insert(&self, mut model: M) -> Result<Document, DbError> {
        let ctx = SaveContext::new_document();
        model.cast();
        model.validate(&ctx)?;
        model.before_save(&ctx)?;
        let mut doc = bson::to_document(&model)?;
        doc.remove("_id");
        self.db
            .write(M::COLLECTION, WriteOp::Insert(&doc))?
            .ok_or_else(|| DbError::NotFound(M::COLLECTION.to_string()))
    }

    fn replace(
        &self,
        id: &str,
        model: &mut M,
        ctx: &SaveContext,
        validate: bool,
    ) -> Result<Document, DbError> {
        model.cast();
        if validate {
            model.validate(ctx)?;
        }
        model.before_save(ctx)?;
        let doc = bson::to_document(&*model)?;
        self.db
            .write(M::COLLECTION, WriteOp::Replace { id, doc: &doc })?
            .ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    /// The raw stored document, if the default filter lets it through.
    fn visible(&self, id: &str) -> Result<Document, DbError> {
        check_object_id(id)?;
        let doc = self
            .db
            .store()
            .get(M::COLLECTION, id)?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        match M::default_filter() {
            Some(filter) if !matches(&doc, &filter) => Err(DbError::NotFound(id.to_string())),
            _ => Ok(doc),
        }
    }

    fn present(&self, mut doc: Document) -> Result<Document, DbError> {
        for field in M::HIDDEN {
            doc.remove(*field);
        }
        M::virtuals(&mut doc);
        for populate in M::POPULATE {
            self.populate(&mut doc, populate)?;
        }
        Ok(doc)
    }

    /// Swap reference ids under `populate.path` for the referenced documents.
    /// Dangling single references become null; dangling array entries are
    /// dropped.
    fn populate(&self, doc: &mut Document, populate: &Populate) -> Result<(), DbError> {
        let projection = hide(Projection::parse(populate.select), populate.hidden);
        let lookup = |id: &str| -> Result<Option<Document>, DbError> {
            Ok(self
                .db
                .store()
                .get(populate.collection, id)?
                .map(|found| project(found, &projection)))
        };

        let replacement = match doc.get(populate.path) {
            Some(Bson::String(id)) => match lookup(id.as_str())? {
                Some(found) => Bson::Document(found),
                None => Bson::Null,
            },
            Some(Bson::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Bson::String(id) => {
                            if let Some(found) = lookup(id.as_str())? {
                                out.push(Bson::Document(found));
                            }
                        }
                        other => out.push(other.clone()),
                    }
                }
                Bson::Array(out)
            }
            _ => return Ok(()),
        };
        doc.insert(populate.path, replacement);
        Ok(())
    }
}

/// Keep hidden fields out of a projection.
fn hide(projection: Projection, hidden: &[&str]) -> Projection {
    match projection {
        Projection::Include(fields) => Projection::Include(
            fields
                .into_iter()
                .filter(|f| !hidden.contains(&f.as_str()))
                .collect(),
        ),
        other => other.excluding(hidden),
    }
}

fn invalid_input(e: bson::de::Error) -> DbError {
    DbError::Validation(ValidationError::single("body", e.to_string()))
}
