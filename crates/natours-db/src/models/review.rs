use bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, ValidationError};
use crate::model::{Model, Populate, SaveContext, flexible_date, is_object_id, now};
use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    /// Id of the reviewed tour.
    #[serde(default)]
    pub tour: String,
    /// Id of the author.
    #[serde(default)]
    pub user: String,
}

impl Model for Review {
    const COLLECTION: &'static str = "reviews";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["tour", "user"]];
    const POPULATE: &'static [Populate] = &[Populate {
        path: "user",
        collection: User::COLLECTION,
        select: "name,photo",
        hidden: User::HIDDEN,
    }];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn cast(&mut self) {
        self.review = self.review.trim().to_string();
    }

    fn validate(&self, _ctx: &SaveContext) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if self.review.is_empty() {
            err.add("review", "review can not be empty");
        }
        if let Some(rating) = self.rating {
            if !(1.0..=5.0).contains(&rating) {
                err.add("rating", "rating must be between 1 and 5");
            }
        }
        if self.tour.is_empty() {
            err.add("tour", "must have a tour");
        } else if !is_object_id(&self.tour) {
            err.add("tour", format!("invalid tour id: {}", self.tour));
        }
        if self.user.is_empty() {
            err.add("user", "must have a user");
        } else if !is_object_id(&self.user) {
            err.add("user", format!("invalid user id: {}", self.user));
        }
        err.into_result()
    }

    fn before_save(&mut self, ctx: &SaveContext) -> Result<(), DbError> {
        if ctx.is_new && self.created_at.is_none() {
            self.created_at = Some(now());
        }
        Ok(())
    }
}
