mod aggregate;
mod db;
mod error;
mod hooks;
mod model;
pub mod models;
mod repository;

pub use aggregate::{RatingAggregate, RatingStats};
pub use db::Db;
pub use error::{DbError, FieldError, ValidationError};
pub use hooks::{WriteHook, WriteOp};
pub use model::{Model, Populate, SaveContext, is_object_id};
pub use repository::Repository;
