pub mod auth;
pub mod config;
pub mod error;
pub mod json;
pub mod limit;
pub mod mailer;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::app;
pub use state::AppState;
