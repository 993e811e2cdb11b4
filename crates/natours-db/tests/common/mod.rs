#![allow(dead_code)]

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Document, doc};
use natours_db::Db;
use natours_db::models::{Review, Tour, User};
use natours_store::MemoryStore;

pub fn db() -> Db {
    Db::open(Arc::new(MemoryStore::new())).unwrap()
}

pub fn tour_body(name: &str, price: i32) -> Document {
    doc! {
        "name": name,
        "duration": 5,
        "maxGroupSize": 25,
        "difficulty": "easy",
        "price": price,
        "summary": "Breathtaking hike through the Canadian Banff National Park",
        "imageCover": "tour-1-cover.jpg",
    }
}

/// Create a tour through the repository and return its id.
pub fn create_tour(db: &Db, name: &str) -> String {
    let tour = db.repo::<Tour>().create(tour_body(name, 397)).unwrap();
    tour.get_str("_id").unwrap().to_string()
}

/// Users inserted straight into the store, skipping password hashing.
pub fn insert_user(db: &Db, name: &str, email: &str) -> String {
    let stored = db
        .store()
        .insert(
            "users",
            doc! {
                "name": name,
                "email": email,
                "photo": "default.jpg",
                "role": "user",
                "password": "not-a-real-hash",
                "active": true,
            },
        )
        .unwrap();
    stored.get_str("_id").unwrap().to_string()
}

pub fn review_body(tour: &str, user: &str, rating: f64) -> Document {
    doc! {
        "review": "Loved every minute of it",
        "rating": rating,
        "tour": tour,
        "user": user,
    }
}

pub fn create_review(db: &Db, tour: &str, rating: f64) -> String {
    let user = ObjectId::new().to_hex();
    let review = db
        .repo::<Review>()
        .create(review_body(tour, &user, rating))
        .unwrap();
    review.get_str("_id").unwrap().to_string()
}

/// `(ratingsQuantity, ratingsAverage)` as stored on the tour.
pub fn ratings(db: &Db, tour: &str) -> (i64, f64) {
    let doc = db.store().get("tours", tour).unwrap().unwrap();
    (
        doc.get_i64("ratingsQuantity").unwrap(),
        doc.get_f64("ratingsAverage").unwrap(),
    )
}

pub fn user_model(db: &Db, id: &str) -> User {
    db.repo::<User>().get_model(id).unwrap()
}
