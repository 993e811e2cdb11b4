use bson::Document;

use crate::error::DbError;

/// A write about to be applied to one collection.
#[derive(Debug, Clone, Copy)]
pub enum WriteOp<'a> {
    Insert(&'a Document),
    Replace { id: &'a str, doc: &'a Document },
    Update { id: &'a str, set: &'a Document },
    Delete { id: &'a str },
}

impl WriteOp<'_> {
    /// Id of the document being changed; `None` for inserts without `_id`.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            WriteOp::Insert(doc) => doc.get_str("_id").ok(),
            WriteOp::Replace { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id } => {
                Some(id)
            }
        }
    }
}

/// Two-phase side effect attached to the writes of one collection.
///
/// `capture` runs before the write and records what the hook will need
/// afterwards (for deletes and updates the pre-write state is gone once the
/// write lands). `on_committed` runs after the write succeeded, with the
/// captured identifiers and the committed document (the removed one for
/// deletes). It is never run for writes that failed.
pub trait WriteHook: Send + Sync {
    fn capture(&self, op: &WriteOp<'_>) -> Result<Vec<String>, DbError>;

    /// Failures are the hook's own business: the write is already committed.
    fn on_committed(&self, captured: Vec<String>, committed: Option<&Document>);
}
