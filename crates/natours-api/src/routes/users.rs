use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use natours_db::models::{Role, User};
use natours_query::Query;
use serde_json::Value;

use super::auth::{self, reject_password_fields};
use super::{factory, params};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::json::JsonBody;
use crate::state::AppState;

const ADMINS: [Role; 1] = [Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/forgotPassword", post(auth::forgot_password))
        .route("/resetPassword/{token}", patch(auth::reset_password))
        .route("/updateMyPassword", patch(auth::update_my_password))
        .route("/me", get(auth::get_me))
        .route("/updateMe", patch(auth::update_me))
        .route("/deleteMe", delete(auth::delete_me))
        .route("/", get(get_all))
        .route("/{id}", get(get_one).patch(update).delete(remove))
}

async fn get_all(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&ADMINS)?;
    factory::get_all::<User>(&state, Query::default(), params(raw)).await
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&ADMINS)?;
    factory::get_one::<User>(&state, id).await
}

/// Admin edits; passwords only change through the password flows.
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody,
) -> Result<Json<Value>, ApiError> {
    user.restrict_to(&ADMINS)?;
    reject_password_fields(&patch)?;
    factory::update_one::<User>(&state, id, patch).await
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.restrict_to(&ADMINS)?;
    factory::delete_one::<User>(&state, id).await
}
