use std::fmt;

use natours_store::StoreError;

/// Per-field validation failures collected while saving a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(". "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum DbError {
    Store(StoreError),
    NotFound(String),
    /// An id that is not a 24-character ObjectId hex string.
    InvalidId(String),
    Validation(ValidationError),
    DuplicateKey {
        collection: String,
        fields: Vec<String>,
        value: String,
    },
    Serialization(String),
    Hash(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Store(e) => write!(f, "store error: {e}"),
            DbError::NotFound(id) => write!(f, "not found: {id}"),
            DbError::InvalidId(id) => write!(f, "invalid _id: {id}"),
            DbError::Validation(e) => write!(f, "validation failed: {e}"),
            DbError::DuplicateKey { fields, value, .. } => {
                write!(f, "duplicate value for ({}): {value}", fields.join(", "))
            }
            DbError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            DbError::Hash(msg) => write!(f, "password hash error: {msg}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<StoreError> for DbError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey {
                collection,
                fields,
                value,
            } => DbError::DuplicateKey {
                collection,
                fields,
                value,
            },
            other => DbError::Store(other),
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(e: ValidationError) -> Self {
        DbError::Validation(e)
    }
}

impl From<bson::ser::Error> for DbError {
    fn from(e: bson::ser::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<bson::de::Error> for DbError {
    fn from(e: bson::de::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}
