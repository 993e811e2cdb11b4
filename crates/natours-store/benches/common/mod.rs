#![allow(dead_code)]

use bson::{Document, doc};
use natours_store::{CollectionConfig, DocumentStore};

pub const TOURS: &str = "tours";

const DIFFICULTIES: [&str; 3] = ["easy", "medium", "difficult"];

/// Generate `n` tour documents with spread-out prices and durations.
pub fn generate_tours(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            doc! {
                "_id": format!("tour-{i:06}"),
                "name": format!("Tour number {i}"),
                "price": ((i * 37) % 3000) as i32 + 100,
                "duration": (i % 14) as i32 + 1,
                "difficulty": DIFFICULTIES[i % 3],
                "ratingsAverage": 4.5,
                "ratingsQuantity": 0,
                "summary": "x".repeat(120),
            }
        })
        .collect()
}

pub fn seed_store<S: DocumentStore>(store: &S, n: usize) {
    store.create_collection(&CollectionConfig::new(TOURS)).unwrap();
    for tour in generate_tours(n) {
        store.insert(TOURS, tour).unwrap();
    }
}
