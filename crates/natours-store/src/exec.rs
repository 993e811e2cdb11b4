use std::cmp::Ordering;

use bson::{Bson, Document};
use natours_query::{Projection, Query, Sort, SortDirection};

use crate::eval::matches;

/// Resolve a dotted path (`startLocation.address`) inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(sub) => sub.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Total order over field values used for sorting.
///
/// Missing and null sort first; values of different types order by type so
/// that a sort over mixed data is still deterministic.
pub fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None | Some(Bson::Null), None | Some(Bson::Null)) => Ordering::Equal,
        (None | Some(Bson::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Bson::Null)) => Ordering::Greater,
        (Some(a), Some(b)) => compare_two_values(a, b),
    }
}

fn compare_two_values(a: &Bson, b: &Bson) -> Ordering {
    match (a, b) {
        (Bson::String(a), Bson::String(b)) => a.cmp(b),
        (Bson::Int32(a), Bson::Int32(b)) => a.cmp(b),
        (Bson::Int64(a), Bson::Int64(b)) => a.cmp(b),
        (Bson::Int32(a), Bson::Int64(b)) => (*a as i64).cmp(b),
        (Bson::Int64(a), Bson::Int32(b)) => a.cmp(&(*b as i64)),
        (Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_), Bson::Double(_))
        | (Bson::Double(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let (a, b) = (number(a), number(b));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Bson::Boolean(a), Bson::Boolean(b)) => a.cmp(b),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            a.timestamp_millis().cmp(&b.timestamp_millis())
        }
        (Bson::ObjectId(a), Bson::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
        (Bson::Array(a), Bson::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(Some(x), Some(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn number(v: &Bson) -> f64 {
    match v {
        Bson::Int32(n) => *n as f64,
        Bson::Int64(n) => *n as f64,
        Bson::Double(n) => *n,
        _ => f64::NAN,
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) => 7,
        _ => 8,
    }
}

pub(crate) fn sort_documents(docs: &mut [Document], sorts: &[Sort]) {
    if sorts.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for sort in sorts {
            let ord = compare_values(get_path(a, &sort.field), get_path(b, &sort.field));
            let ord = match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Apply a projection to one document. `_id` is kept unless excluded by name.
pub fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::All => doc,
        Projection::Exclude(fields) => {
            let mut doc = doc;
            for field in fields {
                remove_path(&mut doc, field);
            }
            doc
        }
        Projection::Include(fields) => {
            let mut out = Document::new();
            if let Some(id) = doc.get("_id") {
                out.insert("_id", id.clone());
            }
            for field in fields {
                if let Some(value) = get_path(&doc, field) {
                    insert_path(&mut out, field, value.clone());
                }
            }
            out
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Ok(sub) = doc.get_document_mut(head) {
                remove_path(sub, rest);
            }
        }
    }
}

fn insert_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !std::matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Ok(sub) = doc.get_document_mut(head) {
                insert_path(sub, rest, value);
            }
        }
    }
}

/// Run a query over an in-memory candidate set: filter → sort → skip/take → project.
pub(crate) fn execute<'a>(
    docs: impl Iterator<Item = &'a Document>,
    query: &Query,
) -> Vec<Document> {
    let mut matched: Vec<Document> = match &query.filter {
        Some(filter) => docs.filter(|d| matches(d, filter)).cloned().collect(),
        None => docs.cloned().collect(),
    };

    sort_documents(&mut matched, &query.sort);

    let skip = query.skip.unwrap_or(0);
    let take = query.take.unwrap_or(usize::MAX);
    matched
        .into_iter()
        .skip(skip)
        .take(take)
        .map(|d| project(d, &query.projection))
        .collect()
}
