mod booking;
mod review;
mod tour;
mod user;

pub use booking::Booking;
pub use review::Review;
pub use tour::{DEFAULT_RATINGS_AVERAGE, Difficulty, Location, Tour, round_rating, slugify};
pub use user::{Role, User, hash_reset_token};
