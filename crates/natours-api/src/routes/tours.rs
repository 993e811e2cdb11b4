use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use bson::Bson;
use natours_db::models::{Review, Role, Tour};
use natours_query::{Filter, FilterGroup, Query};
use serde_json::Value;

use super::{factory, params, reviews};
use crate::auth::CurrentUser;
use crate::error::{ApiError, blocking};
use crate::json::JsonBody;
use crate::state::AppState;

const WRITERS: [Role; 2] = [Role::Admin, Role::LeadGuide];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all).post(create))
        .route("/{id}", get(get_one).patch(update).delete(delete))
        .route(
            "/{id}/reviews",
            get(reviews::get_for_tour).post(reviews::create_for_tour),
        )
}

async fn get_all(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError> {
    factory::get_all::<Tour>(&state, Query::default(), params(raw)).await
}

/// A tour with its reviews embedded.
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let db = Arc::clone(&state.db);
    let tour = blocking(move || {
        let mut tour = db.repo::<Tour>().get(&id)?;
        let of_tour = FilterGroup::condition(Filter::eq("tour", id.as_str()));
        let reviews = db.repo::<Review>().find(Query::filtered(of_tour))?;
        tour.insert(
            "reviews",
            reviews.into_iter().map(Bson::Document).collect::<Vec<_>>(),
        );
        Ok(tour)
    })
    .await?;
    Ok(factory::envelope(tour))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    user.restrict_to(&WRITERS)?;
    factory::create_one::<Tour>(&state, body).await
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&WRITERS)?;
    factory::update_one::<Tour>(&state, id, patch).await
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.restrict_to(&WRITERS)?;
    factory::delete_one::<Tour>(&state, id).await
}
