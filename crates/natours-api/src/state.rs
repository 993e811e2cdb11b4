use std::sync::Arc;
use std::time::Duration;

use natours_db::Db;

use crate::config::Config;
use crate::limit::RateLimiter;
use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: Db, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            mailer,
            limiter: Arc::new(limiter),
        }
    }
}
