use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use natours_db::models::{Booking, Role, Tour};
use natours_query::{Filter, FilterGroup, Query};
use serde_json::Value;

use super::{factory, params};
use crate::auth::CurrentUser;
use crate::error::{ApiError, blocking};
use crate::json::JsonBody;
use crate::state::AppState;

const MANAGERS: [Role; 2] = [Role::Admin, Role::LeadGuide];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-tours", get(my_tours))
        .route("/", get(get_all).post(create))
        .route("/{id}", get(get_one).patch(update).delete(delete))
}

/// Tours the caller has booked.
async fn my_tours(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let db = Arc::clone(&state.db);
    let user_id = user.id().to_string();
    let tours = blocking(move || {
        let mine = Query::filtered(FilterGroup::condition(Filter::eq("user", user_id)));
        let tour_ids: Vec<String> = db
            .repo::<Booking>()
            .find_models(mine)?
            .into_iter()
            .map(|booking| booking.tour)
            .collect();
        Ok(db.repo::<Tour>().find_by_ids(&tour_ids)?)
    })
    .await?;
    Ok(factory::listing(tours))
}

async fn get_all(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&MANAGERS)?;
    factory::get_all::<Booking>(&state, Query::default(), params(raw)).await
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    user.restrict_to(&MANAGERS)?;
    factory::create_one::<Booking>(&state, body).await
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&MANAGERS)?;
    factory::get_one::<Booking>(&state, id).await
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&MANAGERS)?;
    factory::update_one::<Booking>(&state, id, patch).await
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.restrict_to(&MANAGERS)?;
    factory::delete_one::<Booking>(&state, id).await
}
