#![allow(dead_code)]

use bson::{Document, doc};
use natours_store::{CollectionConfig, DocumentStore, MemoryStore};

pub const TOURS: &str = "tours";
pub const REVIEWS: &str = "reviews";

pub fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_collection(&CollectionConfig::new(TOURS).unique(&["name"])).unwrap();
    store
        .create_collection(&CollectionConfig::new(REVIEWS).unique(&["tour", "user"]))
        .unwrap();
    store
}

pub fn tour(id: &str, name: &str, price: i32, duration: i32, difficulty: &str) -> Document {
    doc! {
        "_id": id,
        "name": name,
        "price": price,
        "duration": duration,
        "difficulty": difficulty,
        "ratingsAverage": 4.5,
        "ratingsQuantity": 0,
    }
}

/// Seed the store with a small catalogue of tours.
pub fn seed_tours(store: &MemoryStore) {
    let tours = vec![
        tour("t1", "The Forest Hiker", 397, 5, "easy"),
        tour("t2", "The Sea Explorer", 497, 7, "medium"),
        tour("t3", "The Snow Adventurer", 997, 4, "difficult"),
        tour("t4", "The City Wanderer", 1197, 9, "easy"),
        tour("t5", "The Park Camper", 1497, 10, "medium"),
        tour("t6", "The Sports Lover", 2997, 14, "difficult"),
        tour("t7", "The Wine Taster", 1997, 5, "easy"),
        tour("t8", "The Star Gazer", 997, 9, "medium"),
        tour("t9", "The Northern Lights", 1497, 3, "easy"),
    ];
    for tour in tours {
        store.insert(TOURS, tour).unwrap();
    }
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d.get_str("_id").unwrap().to_string())
        .collect()
}
