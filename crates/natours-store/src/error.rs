use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    CollectionNotFound(String),
    /// A unique constraint rejected the write.
    DuplicateKey {
        collection: String,
        fields: Vec<String>,
        value: String,
    },
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::CollectionNotFound(name) => write!(f, "collection not found: {name}"),
            StoreError::DuplicateKey {
                collection,
                fields,
                value,
            } => write!(
                f,
                "duplicate key in {collection} on ({}): {value}",
                fields.join(", ")
            ),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
