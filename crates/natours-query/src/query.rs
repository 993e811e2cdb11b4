use serde::{Deserialize, Serialize};

use crate::filter::{FilterGroup, merge_filters};
use crate::projection::Projection;
use crate::sort::Sort;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filter: Option<FilterGroup>,
    #[serde(default)]
    pub sort: Vec<Sort>,
    #[serde(default)]
    pub projection: Projection,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl Query {
    pub fn filtered(filter: FilterGroup) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }

    /// AND another group into the filter. The result never matches more than before.
    pub fn and_filter(mut self, extra: FilterGroup) -> Self {
        self.filter = merge_filters(self.filter.take(), Some(extra));
        self
    }
}
