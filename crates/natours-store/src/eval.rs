use std::cmp::Ordering;

use bson::{Bson, Document};
use natours_query::{Filter, FilterGroup, FilterNode, LogicalOp, Operator};

use crate::exec::get_path;

/// Evaluate whether a document matches the given filter group.
///
/// An empty group matches everything.
pub fn matches(doc: &Document, group: &FilterGroup) -> bool {
    match group.logical {
        LogicalOp::And => group.children.iter().all(|c| node_matches(doc, c)),
        LogicalOp::Or => {
            group.children.is_empty() || group.children.iter().any(|c| node_matches(doc, c))
        }
    }
}

fn node_matches(doc: &Document, node: &FilterNode) -> bool {
    match node {
        FilterNode::Condition(filter) => condition_matches(doc, filter),
        FilterNode::Group(group) => matches(doc, group),
    }
}

fn condition_matches(doc: &Document, filter: &Filter) -> bool {
    let field_value = get_path(doc, &filter.field);

    if filter.operator == Operator::Eq {
        // eq null matches both missing fields and explicit nulls
        if std::matches!(filter.value, Bson::Null) {
            return std::matches!(field_value, None | Some(Bson::Null));
        }
        return match field_value {
            Some(Bson::Array(arr)) => arr.iter().any(|elem| value_eq(elem, &filter.value)),
            Some(v) => value_eq(v, &filter.value),
            None => false,
        };
    }

    let predicate: fn(Ordering) -> bool = match filter.operator {
        Operator::Gt => |o| o == Ordering::Greater,
        Operator::Gte => |o| o != Ordering::Less,
        Operator::Lt => |o| o == Ordering::Less,
        Operator::Lte => |o| o != Ordering::Greater,
        Operator::Eq => unreachable!(),
    };
    match field_value {
        Some(Bson::Array(arr)) => arr
            .iter()
            .any(|elem| value_cmp(elem, &filter.value).is_some_and(predicate)),
        Some(v) => value_cmp(v, &filter.value).is_some_and(predicate),
        None => false,
    }
}

/// Equality: stored value vs query value.
fn value_eq(stored: &Bson, query: &Bson) -> bool {
    match (stored, query) {
        // ── Cross-type coercion: Bson::String → stored type ─
        (Bson::Boolean(a), Bson::String(s)) => match s.as_str() {
            "true" => *a,
            "false" => !*a,
            _ => false,
        },
        (Bson::ObjectId(a), Bson::String(s)) => a.to_hex() == *s,
        _ => value_cmp(stored, query) == Some(Ordering::Equal),
    }
}

/// Ordering of a stored value against a query value, `None` when the two are
/// not comparable (incompatible types are silently excluded).
fn value_cmp(stored: &Bson, query: &Bson) -> Option<Ordering> {
    match (stored, query) {
        // ── Direct type matches ─────────────────────────────────
        (Bson::String(a), Bson::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        (a, b) if as_number(a).is_some() && as_number(b).is_some() => {
            compare_numbers(a, b)
        }

        // ── Cross-type coercion: Bson::String → stored type ─
        (Bson::Int32(_) | Bson::Int64(_), Bson::String(s)) => match s.trim().parse::<i64>() {
            Ok(b) => compare_numbers(stored, &Bson::Int64(b)),
            Err(_) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|b| compare_numbers(stored, &Bson::Double(b))),
        },
        (Bson::Double(a), Bson::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|b| a.partial_cmp(&b)),
        (Bson::DateTime(a), Bson::String(s)) => parse_datetime(s)
            .map(|millis| a.timestamp_millis().cmp(&millis)),

        // ── Cross-type coercion: Int → DateTime (epoch seconds) ─
        (Bson::DateTime(a), Bson::Int64(b)) => Some(a.timestamp_millis().cmp(&(*b * 1000))),
        (Bson::DateTime(a), Bson::Int32(b)) => {
            Some(a.timestamp_millis().cmp(&(*b as i64 * 1000)))
        }

        _ => None,
    }
}

fn as_number(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare_numbers(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Int32(a), Bson::Int32(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int64(b)) => Some((*a as i64).cmp(b)),
        (Bson::Int64(a), Bson::Int32(b)) => Some(a.cmp(&(*b as i64))),
        (Bson::Int64(a), Bson::Int64(b)) => Some(a.cmp(b)),
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates at midnight UTC.
fn parse_datetime(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = bson::DateTime::parse_rfc3339_str(s) {
        return Some(dt.timestamp_millis());
    }
    bson::DateTime::parse_rfc3339_str(format!("{s}T00:00:00Z"))
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn one(filter: Filter) -> FilterGroup {
        FilterGroup::condition(filter)
    }

    fn tour() -> Document {
        doc! {
            "_id": "t1",
            "name": "The Forest Hiker",
            "price": 397_i32,
            "ratingsAverage": 4.7,
            "secretTour": false,
            "startLocation": { "address": "Banff, CAN" },
            "guides": ["u1", "u2"],
            "createdAt": bson::DateTime::from_millis(1_600_000_000_000),
        }
    }

    #[test]
    fn empty_group_matches_everything() {
        assert!(matches(&tour(), &FilterGroup::and(vec![])));
        assert!(matches(&tour(), &FilterGroup::or(vec![])));
    }

    #[test]
    fn string_query_value_coerces_to_number() {
        let doc = tour();
        assert!(matches(&doc, &one(Filter::eq("price", "397"))));
        assert!(matches(&doc, &one(Filter::new("price", Operator::Gte, "397"))));
        assert!(!matches(&doc, &one(Filter::new("price", Operator::Gt, "397"))));
        assert!(matches(&doc, &one(Filter::new("ratingsAverage", Operator::Gte, "4.5"))));
        assert!(matches(&doc, &one(Filter::new("price", Operator::Lt, "397.5"))));
    }

    #[test]
    fn string_query_value_coerces_to_bool() {
        assert!(matches(&tour(), &one(Filter::eq("secretTour", "false"))));
        assert!(!matches(&tour(), &one(Filter::eq("secretTour", "true"))));
    }

    #[test]
    fn non_numeric_text_never_matches_numbers() {
        assert!(!matches(&tour(), &one(Filter::new("price", Operator::Gte, "cheap"))));
    }

    #[test]
    fn dotted_path_reaches_nested_field() {
        assert!(matches(
            &tour(),
            &one(Filter::eq("startLocation.address", "Banff, CAN"))
        ));
    }

    #[test]
    fn array_field_matches_any_element() {
        assert!(matches(&tour(), &one(Filter::eq("guides", "u2"))));
        assert!(!matches(&tour(), &one(Filter::eq("guides", "u3"))));
    }

    #[test]
    fn eq_null_matches_missing() {
        assert!(matches(&tour(), &one(Filter::eq("priceDiscount", Bson::Null))));
        assert!(!matches(&tour(), &one(Filter::eq("price", Bson::Null))));
    }

    #[test]
    fn date_compares_against_text() {
        let doc = tour();
        assert!(matches(&doc, &one(Filter::new("createdAt", Operator::Gte, "2020-01-01"))));
        assert!(!matches(&doc, &one(Filter::new("createdAt", Operator::Gte, "2021-01-01"))));
    }

    #[test]
    fn or_group_matches_any_child() {
        let group = FilterGroup::or(vec![
            FilterNode::Condition(Filter::eq("name", "Nope")),
            FilterNode::Condition(Filter::eq("price", 397_i32)),
        ]);
        assert!(matches(&tour(), &group));
    }
}
