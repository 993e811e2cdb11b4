mod auth;
mod bookings;
mod factory;
mod health;
mod reviews;
mod tours;
mod users;

use axum::Router;
use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::routing::get;
use natours_query::QueryParams;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, error_detail};
use crate::limit::rate_limit;
use crate::state::AppState;

const BODY_LIMIT_BYTES: usize = 10 * 1024;

/// Sent with every response unless a handler already set them.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", "default-src 'self'; frame-ancestors 'self'; object-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/v1/tours", tours::router())
        .nest("/v1/reviews", reviews::router())
        .nest("/v1/users", users::router())
        .nest("/v1/bookings", bookings::router())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let router = Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), error_detail))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn params(raw: Option<String>) -> QueryParams {
    QueryParams::parse(raw.as_deref().unwrap_or_default())
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Can't find {uri} on this server!"))
}
