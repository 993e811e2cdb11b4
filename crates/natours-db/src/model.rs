use bson::oid::ObjectId;
use bson::Document;
use natours_query::FilterGroup;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DbError, ValidationError};

/// What a save is doing, so validators and save hooks only touch the fields
/// that changed.
#[derive(Debug, Clone, Default)]
pub struct SaveContext {
    pub is_new: bool,
    pub modified: Vec<String>,
}

impl SaveContext {
    pub fn new_document() -> Self {
        Self {
            is_new: true,
            modified: Vec::new(),
        }
    }

    pub fn modifying<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_new: false,
            modified: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// New documents count every field as modified.
    pub fn is_modified(&self, field: &str) -> bool {
        self.is_new || self.modified.iter().any(|f| f == field)
    }
}

/// Replace a reference id stored under `path` with the referenced document.
#[derive(Debug, Clone, Copy)]
pub struct Populate {
    pub path: &'static str,
    pub collection: &'static str,
    /// `fields`-style selection applied to the referenced document.
    pub select: &'static str,
    /// Fields of the referenced collection that are never returned.
    pub hidden: &'static [&'static str],
}

/// A typed document stored in one collection.
///
/// Saving runs `cast`, then `validate`, then `before_save`, then the write.
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    /// Stripped from every read.
    const HIDDEN: &'static [&'static str] = &[];
    /// Field sets whose combined values must be unique.
    const UNIQUE: &'static [&'static [&'static str]] = &[];
    const POPULATE: &'static [Populate] = &[];
    /// Fields kept up to date by write hooks. Request bodies never set them,
    /// and replacing the document keeps their stored values.
    const MANAGED: &'static [&'static str] = &[];

    fn id(&self) -> Option<&str>;

    /// Normalize input values (trim, lower-case, round).
    fn cast(&mut self) {}

    fn validate(&self, ctx: &SaveContext) -> Result<(), ValidationError>;

    fn before_save(&mut self, _ctx: &SaveContext) -> Result<(), DbError> {
        Ok(())
    }

    /// ANDed into every read of this model.
    fn default_filter() -> Option<FilterGroup> {
        None
    }

    /// Derived fields added to documents on the way out.
    fn virtuals(_doc: &mut Document) {}
}

pub fn is_object_id(id: &str) -> bool {
    ObjectId::parse_str(id).is_ok()
}

pub(crate) fn check_object_id(id: &str) -> Result<(), DbError> {
    if is_object_id(id) {
        Ok(())
    } else {
        Err(DbError::InvalidId(id.to_string()))
    }
}

pub(crate) fn now() -> bson::DateTime {
    bson::DateTime::now()
}

/// Serde helpers for dates that arrive either as BSON datetimes (from the
/// store) or as RFC 3339 strings / epoch millis (from request bodies).
pub(crate) mod flexible_date {
    use bson::{Bson, DateTime};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime>, D::Error> {
        match Option::<Bson>::deserialize(d)? {
            None | Some(Bson::Null) => Ok(None),
            Some(value) => from_bson(value).map(Some).map_err(D::Error::custom),
        }
    }

    pub(crate) fn from_bson(value: Bson) -> Result<DateTime, String> {
        match value {
            Bson::DateTime(dt) => Ok(dt),
            Bson::String(s) => DateTime::parse_rfc3339_str(&s)
                .or_else(|_| DateTime::parse_rfc3339_str(format!("{s}T00:00:00Z")))
                .map_err(|_| format!("invalid date: {s}")),
            Bson::Int64(ms) => Ok(DateTime::from_millis(ms)),
            Bson::Int32(ms) => Ok(DateTime::from_millis(ms as i64)),
            Bson::Double(ms) => Ok(DateTime::from_millis(ms as i64)),
            other => Err(format!("invalid date: {other}")),
        }
    }
}

pub(crate) mod flexible_dates {
    use bson::{Bson, DateTime};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::flexible_date::from_bson;

    pub fn serialize<S: Serializer>(value: &[DateTime], s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DateTime>, D::Error> {
        Option::<Vec<Bson>>::deserialize(d)?
            .unwrap_or_default()
            .into_iter()
            .map(|v| from_bson(v).map_err(D::Error::custom))
            .collect()
    }
}
