mod features;
mod filter;
mod operator;
mod params;
mod projection;
mod query;
mod sort;

pub use features::{
    FeatureConfig, ParseMode, QueryFeatures, QueryParamError, RESERVED_KEYS, TIEBREAK_FIELD,
    VERSION_FIELD,
};
pub use filter::{Filter, FilterGroup, FilterNode, LogicalOp, merge_filters};
pub use operator::Operator;
pub use params::QueryParams;
pub use projection::Projection;
pub use query::Query;
pub use sort::{Sort, SortDirection};
