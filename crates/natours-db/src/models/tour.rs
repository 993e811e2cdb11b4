use bson::{Bson, DateTime, Document};
use natours_query::{Filter, FilterGroup};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, ValidationError};
use crate::model::{Model, Populate, SaveContext, flexible_date, flexible_dates, is_object_id, now};
use crate::models::user::User;

pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

/// A GeoJSON point with an optional address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default = "point")]
    pub kind: String,
    /// Longitude first, then latitude.
    #[serde(default)]
    pub coordinates: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
}

fn point() -> String {
    "Point".to_string()
}

fn default_ratings_average() -> f64 {
    DEFAULT_RATINGS_AVERAGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub max_group_size: Option<i32>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default = "default_ratings_average")]
    pub ratings_average: f64,
    #[serde(default)]
    pub ratings_quantity: i64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, with = "flexible_dates")]
    pub start_dates: Vec<DateTime>,
    #[serde(default)]
    pub secret_tour: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_location: Option<Location>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub guides: Vec<String>,
}

impl Model for Tour {
    const COLLECTION: &'static str = "tours";
    const HIDDEN: &'static [&'static str] = &["createdAt"];
    const UNIQUE: &'static [&'static [&'static str]] = &[&["name"]];
    const MANAGED: &'static [&'static str] = &["ratingsAverage", "ratingsQuantity"];
    const POPULATE: &'static [Populate] = &[Populate {
        path: "guides",
        collection: User::COLLECTION,
        select: "-__v,-passwordChangedAt",
        hidden: User::HIDDEN,
    }];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn cast(&mut self) {
        self.name = self.name.trim().to_string();
        self.summary = self.summary.trim().to_string();
        if let Some(description) = &mut self.description {
            *description = description.trim().to_string();
        }
        self.ratings_average = round_rating(self.ratings_average);
    }

    fn validate(&self, _ctx: &SaveContext) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();

        let name_len = self.name.chars().count();
        if name_len == 0 {
            err.add("name", "A tour must have a name.");
        } else if name_len > 40 {
            err.add("name", "Name can not be more than 40 characters");
        } else if name_len < 10 {
            err.add("name", "Name must have more than 10 characters");
        }
        if self.duration.is_none() {
            err.add("duration", "A tour must have a duration");
        }
        if self.max_group_size.is_none() {
            err.add("maxGroupSize", "A tour must have a group size");
        }
        if self.difficulty.is_none() {
            err.add("difficulty", "A tour must have a difficulty");
        }
        if !(1.0..=5.0).contains(&self.ratings_average) {
            err.add("ratingsAverage", "rating must be between 1 and 5");
        }
        match self.price {
            None => err.add("price", "A tour must have a price."),
            Some(price) => {
                if let Some(discount) = self.price_discount {
                    if discount >= price {
                        err.add(
                            "priceDiscount",
                            format!("discount ({discount}) can not be more than the price"),
                        );
                    }
                }
            }
        }
        if self.summary.is_empty() {
            err.add("summary", "A tour must have a summary.");
        }
        if self.image_cover.is_empty() {
            err.add("imageCover", "A tour must have an image.");
        }
        for guide in &self.guides {
            if !is_object_id(guide) {
                err.add("guides", format!("invalid guide id: {guide}"));
            }
        }
        for location in self.start_location.iter().chain(&self.locations) {
            if location.kind != "Point" {
                err.add("locations", "location type must be Point");
            }
        }

        err.into_result()
    }

    fn before_save(&mut self, ctx: &SaveContext) -> Result<(), DbError> {
        if ctx.is_modified("name") {
            self.slug = Some(slugify(&self.name));
        }
        if ctx.is_new && self.created_at.is_none() {
            self.created_at = Some(now());
        }
        Ok(())
    }

    /// Secret tours never show up in reads.
    fn default_filter() -> Option<FilterGroup> {
        Some(FilterGroup::condition(Filter::eq("secretTour", false)))
    }

    fn virtuals(doc: &mut Document) {
        let weeks = match doc.get("duration") {
            Some(Bson::Int32(d)) => *d as f64 / 7.0,
            Some(Bson::Int64(d)) => *d as f64 / 7.0,
            Some(Bson::Double(d)) => d / 7.0,
            _ => return,
        };
        doc.insert("durationWeeks", weeks);
    }
}

/// Ratings are stored with one decimal.
pub fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Lower-case, alphanumeric runs joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Tour {
        bson::from_document(bson::doc! {
            "name": "  The Forest Hiker ",
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike through the Canadian Banff National Park",
            "imageCover": "tour-1-cover.jpg",
            "startDates": ["2021-04-25T09:00:00.000Z", "2021-07-20"],
        })
        .unwrap()
    }

    #[test]
    fn defaults_apply_on_deserialize() {
        let tour = valid();
        assert_eq!(tour.ratings_average, 4.5);
        assert_eq!(tour.ratings_quantity, 0);
        assert!(!tour.secret_tour);
        assert_eq!(tour.start_dates.len(), 2);
    }

    #[test]
    fn cast_trims_and_validate_passes() {
        let mut tour = valid();
        tour.cast();
        assert_eq!(tour.name, "The Forest Hiker");
        assert!(tour.validate(&SaveContext::new_document()).is_ok());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut tour = valid();
        tour.name = "Short".into();
        tour.price_discount = Some(500.0);
        tour.difficulty = None;
        let err = tour.validate(&SaveContext::new_document()).unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "difficulty", "priceDiscount"]);
    }

    #[test]
    fn unknown_difficulty_fails_to_deserialize() {
        let res = bson::from_document::<Tour>(bson::doc! { "difficulty": "extreme" });
        assert!(res.is_err());
    }

    #[test]
    fn before_save_sets_slug_and_created_at() {
        let mut tour = valid();
        tour.cast();
        tour.before_save(&SaveContext::new_document()).unwrap();
        assert_eq!(tour.slug.as_deref(), Some("the-forest-hiker"));
        assert!(tour.created_at.is_some());
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("The Sea  Explorer!"), "the-sea-explorer");
        assert_eq!(slugify("  Über Tour--2 "), "über-tour-2");
    }

    #[test]
    fn rating_is_rounded_to_one_decimal() {
        assert_eq!(round_rating(4.666), 4.7);
        assert_eq!(round_rating(4.0), 4.0);
    }

    #[test]
    fn duration_weeks_virtual() {
        let mut doc = bson::doc! { "duration": 14 };
        Tour::virtuals(&mut doc);
        assert_eq!(doc.get_f64("durationWeeks").unwrap(), 2.0);
    }
}
