mod error;
mod eval;
mod exec;
mod store;

pub use error::StoreError;
pub use eval::matches;
pub use exec::{compare_values, get_path, project};
pub use store::{CollectionConfig, DocumentStore};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
