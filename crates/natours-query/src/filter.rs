use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::operator::Operator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: Bson,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, Operator::Eq, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    Condition(Filter),
    Group(FilterGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub logical: LogicalOp,
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn and(children: Vec<FilterNode>) -> Self {
        Self {
            logical: LogicalOp::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        Self {
            logical: LogicalOp::Or,
            children,
        }
    }

    /// A single-condition group, the common shape for `field == value` lookups.
    pub fn condition(filter: Filter) -> Self {
        Self::and(vec![FilterNode::Condition(filter)])
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every field name referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_fields(self, &mut out);
        out
    }
}

fn collect_fields<'a>(group: &'a FilterGroup, out: &mut Vec<&'a str>) {
    for child in &group.children {
        match child {
            FilterNode::Condition(f) => out.push(f.field.as_str()),
            FilterNode::Group(g) => collect_fields(g, out),
        }
    }
}

/// Combine two optional filter groups under a top-level AND.
///
/// - Both None → None
/// - One present → that one
/// - Both present → AND(base, extra); an AND base absorbs the extra children
pub fn merge_filters(base: Option<FilterGroup>, extra: Option<FilterGroup>) -> Option<FilterGroup> {
    let base = base.filter(|g| !g.is_empty());
    let extra = extra.filter(|g| !g.is_empty());
    match (base, extra) {
        (None, None) => None,
        (Some(f), None) | (None, Some(f)) => Some(f),
        (Some(mut base), Some(extra)) => {
            if base.logical == LogicalOp::And {
                if extra.logical == LogicalOp::And {
                    base.children.extend(extra.children);
                } else {
                    base.children.push(FilterNode::Group(extra));
                }
                Some(base)
            } else {
                Some(FilterGroup::and(vec![
                    FilterNode::Group(base),
                    FilterNode::Group(extra),
                ]))
            }
        }
    }
}
