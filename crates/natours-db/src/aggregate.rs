use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bson::{Bson, Document, doc};
use natours_query::{Filter, FilterGroup, Projection, Query};
use natours_store::{DocumentStore, StoreError};
use tracing::{debug, warn};

use crate::error::DbError;
use crate::hooks::{WriteHook, WriteOp};
use crate::model::Model;
use crate::models::{DEFAULT_RATINGS_AVERAGE, Review, Tour, round_rating};

const RATING_FIELD: &str = "rating";
const PARENT_FIELD: &str = "tour";

/// Rating summary kept on a tour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingStats {
    pub quantity: u64,
    pub average: f64,
}

impl RatingStats {
    pub const EMPTY: RatingStats = RatingStats {
        quantity: 0,
        average: DEFAULT_RATINGS_AVERAGE,
    };

    /// Count every review; average over the ones that carry a rating.
    pub fn from_reviews(reviews: &[Document]) -> RatingStats {
        if reviews.is_empty() {
            return RatingStats::EMPTY;
        }
        let ratings: Vec<f64> = reviews
            .iter()
            .filter_map(|r| match r.get(RATING_FIELD) {
                Some(Bson::Double(v)) => Some(*v),
                Some(Bson::Int32(v)) => Some(*v as f64),
                Some(Bson::Int64(v)) => Some(*v as f64),
                _ => None,
            })
            .collect();
        let average = if ratings.is_empty() {
            DEFAULT_RATINGS_AVERAGE
        } else {
            round_rating(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };
        RatingStats {
            quantity: reviews.len() as u64,
            average,
        }
    }

    fn to_update(self) -> Document {
        doc! {
            "ratingsQuantity": self.quantity as i64,
            "ratingsAverage": self.average,
        }
    }
}

/// Keeps `ratingsQuantity` / `ratingsAverage` on tours in line with their
/// reviews.
///
/// Every recompute reads the full current review set, so it is idempotent.
/// Recomputes for one tour run one at a time behind a per-tour gate: the
/// last one to run always observes every committed review write, so
/// concurrent writers converge on the right summary.
pub struct RatingAggregate {
    store: Arc<dyn DocumentStore>,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RatingAggregate {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Recompute and store the summary of one tour.
    pub fn on_child_write_committed(&self, parent_id: &str) -> Result<RatingStats, DbError> {
        let gate = self.gate(parent_id)?;
        let result = {
            let _held = gate.lock().map_err(|e| {
                DbError::Store(StoreError::Storage(format!("rating gate poisoned: {e}")))
            })?;
            self.recompute(parent_id)
        };
        self.release(parent_id, gate);
        result
    }

    /// Current summary computed from the reviews, without storing it.
    pub fn stats_for(&self, parent_id: &str) -> Result<RatingStats, DbError> {
        let query = Query {
            filter: Some(FilterGroup::condition(Filter::eq(PARENT_FIELD, parent_id))),
            projection: Projection::Include(vec![RATING_FIELD.to_string()]),
            ..Default::default()
        };
        let reviews = self.store.find(Review::COLLECTION, &query)?;
        Ok(RatingStats::from_reviews(&reviews))
    }

    fn recompute(&self, parent_id: &str) -> Result<RatingStats, DbError> {
        let stats = self.stats_for(parent_id)?;
        match self
            .store
            .find_one_and_update(Tour::COLLECTION, parent_id, stats.to_update())?
        {
            Some(_) => Ok(stats),
            None => Err(DbError::NotFound(parent_id.to_string())),
        }
    }

    fn gate(&self, parent_id: &str) -> Result<Arc<Mutex<()>>, DbError> {
        let mut gates = self.gates.lock().map_err(|e| {
            DbError::Store(StoreError::Storage(format!("rating gates poisoned: {e}")))
        })?;
        Ok(Arc::clone(gates.entry(parent_id.to_string()).or_default()))
    }

    /// Drop the gate once nobody else holds or waits on it.
    fn release(&self, parent_id: &str, gate: Arc<Mutex<()>>) {
        if let Ok(mut gates) = self.gates.lock() {
            // the map and `gate` itself
            if Arc::strong_count(&gate) == 2 {
                gates.remove(parent_id);
            }
        }
    }

    fn parent_of(&self, id: &str) -> Result<Option<String>, DbError> {
        Ok(self
            .store
            .get(Review::COLLECTION, id)?
            .and_then(|review| parent_field(&review)))
    }
}

fn parent_field(doc: &Document) -> Option<String> {
    match doc.get(PARENT_FIELD) {
        Some(Bson::String(id)) => Some(id.clone()),
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        _ => None,
    }
}

impl WriteHook for RatingAggregate {
    fn capture(&self, op: &WriteOp<'_>) -> Result<Vec<String>, DbError> {
        let parent = match op {
            WriteOp::Insert(doc) => parent_field(doc),
            WriteOp::Replace { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id } => {
                self.parent_of(id)?
            }
        };
        Ok(parent.into_iter().collect())
    }

    fn on_committed(&self, captured: Vec<String>, committed: Option<&Document>) {
        let mut parents = captured;
        // an update may have moved the review to another tour
        if let Some(after) = committed.and_then(parent_field) {
            if !parents.contains(&after) {
                parents.push(after);
            }
        }

        for parent in parents {
            match self.on_child_write_committed(&parent) {
                Ok(stats) => debug!(
                    tour = %parent,
                    quantity = stats.quantity,
                    average = stats.average,
                    "ratings recomputed"
                ),
                Err(DbError::NotFound(_)) => {
                    debug!(tour = %parent, "tour gone, ratings not recomputed")
                }
                Err(e) => warn!(tour = %parent, error = %e, "failed to recompute ratings"),
            }
        }
    }
}
