use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use bson::Document;
use natours_db::models::{Review, Role};
use natours_query::{Filter, FilterGroup, Query};
use serde_json::Value;

use super::{factory, params};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

const AUTHORS: [Role; 1] = [Role::User];
const EDITORS: [Role; 2] = [Role::User, Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all).post(create))
        .route("/{id}", get(get_one).patch(update).delete(delete))
}

async fn get_all(
    State(state): State<AppState>,
    _user: CurrentUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError> {
    factory::get_all::<Review>(&state, Query::default(), params(raw)).await
}

/// `GET /tours/{id}/reviews`: the listing narrowed to one tour.
pub async fn get_for_tour(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(tour_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError> {
    let base = Query::filtered(FilterGroup::condition(Filter::eq("tour", tour_id)));
    factory::get_all::<Review>(&state, base, params(raw)).await
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    user.restrict_to(&AUTHORS)?;
    let body = with_defaults(body, None, user.id());
    factory::create_one::<Review>(&state, body).await
}

pub async fn create_for_tour(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tour_id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    user.restrict_to(&AUTHORS)?;
    let body = with_defaults(body, Some(&tour_id), user.id());
    factory::create_one::<Review>(&state, body).await
}

async fn get_one(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    factory::get_one::<Review>(&state, id).await
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&EDITORS)?;
    factory::update_one::<Review>(&state, id, patch).await
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.restrict_to(&EDITORS)?;
    factory::delete_one::<Review>(&state, id).await
}

/// `tour` from the route and `user` from the caller, unless the body names
/// them.
fn with_defaults(mut body: Document, tour: Option<&str>, user: &str) -> Document {
    if let Some(tour) = tour {
        if !body.contains_key("tour") {
            body.insert("tour", tour);
        }
    }
    if !body.contains_key("user") {
        body.insert("user", user);
    }
    body
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn route_and_caller_fill_missing_refs() {
        let body = with_defaults(doc! { "review": "Great" }, Some("t1"), "u1");
        assert_eq!(body, doc! { "review": "Great", "tour": "t1", "user": "u1" });

        let body = with_defaults(doc! { "tour": "t2", "user": "u2" }, Some("t1"), "u1");
        assert_eq!(body, doc! { "tour": "t2", "user": "u2" });
    }
}
