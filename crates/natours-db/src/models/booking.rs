use bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, ValidationError};
use crate::model::{Model, Populate, SaveContext, flexible_date, is_object_id, now};
use crate::models::tour::Tour;
use crate::models::user::User;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub tour: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default = "default_true")]
    pub paid: bool,
}

impl Model for Booking {
    const COLLECTION: &'static str = "bookings";
    const POPULATE: &'static [Populate] = &[
        Populate {
            path: "user",
            collection: User::COLLECTION,
            select: "",
            hidden: User::HIDDEN,
        },
        Populate {
            path: "tour",
            collection: Tour::COLLECTION,
            select: "name",
            hidden: &[],
        },
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn validate(&self, _ctx: &SaveContext) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if !is_object_id(&self.tour) {
            err.add("tour", "Booking must belong to a Tour!");
        }
        if !is_object_id(&self.user) {
            err.add("user", "Booking must belong to a User!");
        }
        match self.price {
            None => err.add("price", "Booking must have a price."),
            Some(price) if price < 0.0 => err.add("price", "Booking price can not be negative"),
            Some(_) => {}
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
