use std::fmt;

use bson::Bson;

use crate::filter::{Filter, FilterGroup, FilterNode, merge_filters};
use crate::operator::Operator;
use crate::params::{QueryParams, split_key};
use crate::projection::Projection;
use crate::query::Query;
use crate::sort::Sort;

/// Control parameters that never become filter conditions.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Internal revision counter kept on every stored document.
pub const VERSION_FIELD: &str = "__v";

/// Appended to every sort so equal keys still have a total order.
pub const TIEBREAK_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Malformed parameters fall back to defaults and are only recorded.
    #[default]
    Lenient,
    /// The first malformed parameter fails [`QueryFeatures::finish`].
    Strict,
}

#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_sort: Vec<Sort>,
    pub mode: ParseMode,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 100,
            default_sort: vec![Sort::desc("createdAt")],
            mode: ParseMode::Lenient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParamError {
    MalformedKey(String),
    UnknownOperator { field: String, operator: String },
    InvalidNumber { key: String, value: String },
    OutOfRange { key: String, value: String },
}

impl fmt::Display for QueryParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParamError::MalformedKey(key) => write!(f, "malformed parameter: {key}"),
            QueryParamError::UnknownOperator { field, operator } => {
                write!(f, "unknown operator '{operator}' on field '{field}'")
            }
            QueryParamError::InvalidNumber { key, value } => {
                write!(f, "invalid {key}: '{value}' is not a number")
            }
            QueryParamError::OutOfRange { key, value } => {
                write!(f, "invalid {key}: {value} must be at least 1")
            }
        }
    }
}

impl std::error::Error for QueryParamError {}

/// Turns request parameters into a [`Query`].
///
/// Each step consumes the builder and returns the next configuration, so a
/// builder is only ever reachable from one owner:
///
/// ```
/// # use natours_query::{Query, QueryFeatures, QueryParams};
/// let params = QueryParams::parse("duration[gte]=5&sort=price&page=2&limit=3");
/// let query = QueryFeatures::new(Query::default(), &params)
///     .filter()
///     .sort()
///     .limit_fields()
///     .paginate()
///     .finish()
///     .unwrap();
/// assert_eq!(query.skip, Some(3));
/// ```
#[derive(Debug)]
pub struct QueryFeatures<'p> {
    params: &'p QueryParams,
    config: FeatureConfig,
    query: Query,
    ignored: Vec<QueryParamError>,
}

impl<'p> QueryFeatures<'p> {
    pub fn new(base: Query, params: &'p QueryParams) -> Self {
        Self {
            params,
            config: FeatureConfig::default(),
            query: base,
            ignored: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Every non-reserved parameter becomes a condition ANDed into the base
    /// filter. Repeated plain values on one field match any of them.
    pub fn filter(mut self) -> Self {
        let params = self.params;
        let mut fields: Vec<FieldTerms> = Vec::new();

        for (key, value) in params.iter() {
            if RESERVED_KEYS.contains(&key) {
                continue;
            }

            let Some((field, op)) = split_key(key) else {
                self.ignored.push(QueryParamError::MalformedKey(key.to_string()));
                continue;
            };

            let operator = match op {
                None => Operator::Eq,
                Some(name) => match Operator::from_param(name) {
                    Some(operator) => operator,
                    None => {
                        self.ignored.push(QueryParamError::UnknownOperator {
                            field: field.to_string(),
                            operator: name.to_string(),
                        });
                        continue;
                    }
                },
            };

            let idx = match fields.iter().position(|t| t.field == field) {
                Some(i) => i,
                None => {
                    fields.push(FieldTerms::new(field));
                    fields.len() - 1
                }
            };
            let terms = &mut fields[idx];
            let value = Bson::String(value.to_string());
            match operator {
                Operator::Eq => terms.equals.push(value),
                _ => terms.bounds.push(Filter::new(field, operator, value)),
            }
        }

        let children: Vec<FilterNode> = fields
            .into_iter()
            .flat_map(FieldTerms::into_nodes)
            .collect();
        if !children.is_empty() {
            self.query.filter =
                merge_filters(self.query.filter.take(), Some(FilterGroup::and(children)));
        }
        self
    }

    /// Requested sorts in order of precedence, or the configured default,
    /// always ending on the tiebreak field.
    pub fn sort(mut self) -> Self {
        let mut sorts = self
            .params
            .get("sort")
            .map(Sort::parse_list)
            .unwrap_or_default();
        if sorts.is_empty() {
            sorts = self.config.default_sort.clone();
        }
        if !sorts.iter().any(|s| s.field == TIEBREAK_FIELD) {
            sorts.push(Sort::asc(TIEBREAK_FIELD));
        }
        self.query.sort = sorts;
        self
    }

    pub fn limit_fields(mut self) -> Self {
        self.query.projection = match self.params.get("fields") {
            Some(list) => match Projection::parse(list) {
                Projection::All => Projection::All.excluding(&[VERSION_FIELD]),
                projection => projection,
            },
            None => Projection::All.excluding(&[VERSION_FIELD]),
        };
        self
    }

    /// Skip/take for the requested page. Pages past the end are not
    /// detected here; they simply match nothing.
    pub fn paginate(mut self) -> Self {
        let page = self.positive("page", 1);
        let limit = self
            .positive("limit", self.config.default_limit)
            .min(self.config.max_limit.max(1));
        self.query.skip = Some((page - 1).saturating_mul(limit));
        self.query.take = Some(limit);
        self
    }

    /// Parameters that were dropped or replaced by a default.
    pub fn ignored(&self) -> &[QueryParamError] {
        &self.ignored
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn finish(mut self) -> Result<Query, QueryParamError> {
        if self.config.mode == ParseMode::Strict && !self.ignored.is_empty() {
            return Err(self.ignored.swap_remove(0));
        }
        Ok(self.query)
    }

    fn positive(&mut self, key: &str, default: usize) -> usize {
        let params = self.params;
        let Some(raw) = params.get(key) else {
            return default;
        };
        match raw.trim().parse::<usize>() {
            Ok(0) => {
                self.ignored.push(QueryParamError::OutOfRange {
                    key: key.to_string(),
                    value: raw.to_string(),
                });
                default
            }
            Ok(n) => n,
            Err(_) => {
                self.ignored.push(QueryParamError::InvalidNumber {
                    key: key.to_string(),
                    value: raw.to_string(),
                });
                default
            }
        }
    }
}

struct FieldTerms {
    field: String,
    equals: Vec<Bson>,
    bounds: Vec<Filter>,
}

impl FieldTerms {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            equals: Vec::new(),
            bounds: Vec::new(),
        }
    }

    fn into_nodes(self) -> Vec<FilterNode> {
        let mut nodes = Vec::with_capacity(self.bounds.len() + 1);
        let mut equals: Vec<FilterNode> = self
            .equals
            .into_iter()
            .map(|v| FilterNode::Condition(Filter::eq(self.field.clone(), v)))
            .collect();
        match equals.len() {
            0 => {}
            1 => nodes.append(&mut equals),
            _ => nodes.push(FilterNode::Group(FilterGroup::or(equals))),
        }
        nodes.extend(self.bounds.into_iter().map(FilterNode::Condition));
        nodes
    }
}
