//! Account lifecycle: signup, login, password reset and self-service.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{HOST, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bson::{Bson, DateTime, Document, doc};
use natours_db::models::{User, hash_reset_token};
use natours_db::{DbError, Model};
use natours_query::{Filter, FilterGroup, FilterNode, Operator};
use serde_json::json;
use tracing::{info, warn};

use super::factory;
use crate::auth::{CurrentUser, is_secure, logout_cookie, send_token};
use crate::error::{ApiError, blocking};
use crate::json::{JsonBody, to_json};
use crate::mailer::Email;
use crate::state::AppState;

const SIGNUP_FIELDS: [&str; 4] = ["name", "email", "password", "passwordConfirm"];
const SELF_SERVICE_FIELDS: [&str; 2] = ["name", "email"];
const PASSWORD_FIELDS: [&str; 2] = ["password", "passwordConfirm"];

/// `scheme://host` the request was addressed to.
fn base_url(headers: &HeaderMap) -> String {
    let scheme = if is_secure(headers) { "https" } else { "http" };
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

fn pick(body: &Document, fields: &[&str]) -> Document {
    fields
        .iter()
        .filter_map(|field| body.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect()
}

fn text(body: &Document, field: &str) -> String {
    body.get_str(field).unwrap_or_default().to_string()
}

pub(super) fn reject_password_fields(body: &Document) -> Result<(), ApiError> {
    if PASSWORD_FIELDS.iter().any(|f| body.contains_key(*f)) {
        return Err(ApiError::bad_request(
            "This route is not for password updates. Please use /updateMyPassword.",
        ));
    }
    Ok(())
}

fn by_email(email: &str) -> FilterGroup {
    FilterGroup::condition(Filter::eq("email", email.trim().to_lowercase()))
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let fields = pick(&body, &SIGNUP_FIELDS);
    let welcome_url = format!("{}/me", base_url(&headers));
    let db = Arc::clone(&state.db);
    let mailer = Arc::clone(&state.mailer);

    let user = blocking(move || {
        let created = db.repo::<User>().create(fields)?;
        let user: User = bson::from_document(created).map_err(DbError::from)?;
        // the account exists either way
        if let Err(e) = mailer.send(Email::welcome(&user, &welcome_url)) {
            warn!(user = ?user.id, error = %e, "welcome mail failed");
        }
        Ok(user)
    })
    .await?;
    info!(user = ?user.id, "user signed up");
    send_token(&user, StatusCode::CREATED, &state.config, &headers)
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let email = text(&body, "email");
    let password = text(&body, "password");
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Please provide email and password!"));
    }

    let db = Arc::clone(&state.db);
    let user = blocking(move || match db.repo::<User>().find_one(by_email(&email))? {
        Some(user) if user.correct_password(&password) => Ok(user),
        _ => Err(ApiError::unauthorized("Incorrect email or password")),
    })
    .await?;
    send_token(&user, StatusCode::OK, &state.config, &headers)
}

pub async fn logout() -> impl IntoResponse {
    (
        [(SET_COOKIE, logout_cookie())],
        Json(json!({ "status": "success" })),
    )
}

pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = text(&body, "email");
    let base = base_url(&headers);
    let db = Arc::clone(&state.db);
    let mailer = Arc::clone(&state.mailer);

    blocking(move || {
        let repo = db.repo::<User>();
        let mut user = repo.find_one(by_email(&email))?.ok_or_else(|| {
            ApiError::NotFound("There is no user with that email address.".into())
        })?;
        let token = user.create_password_reset_token();
        repo.save(&mut user, &[], false)?;

        let url = format!("{base}/api/v1/users/resetPassword/{token}");
        if let Err(e) = mailer.send(Email::password_reset(&user, &url)) {
            warn!(user = ?user.id, error = %e, "password reset mail failed");
            user.clear_password_reset();
            repo.save(&mut user, &[], false)?;
            return Err(ApiError::Status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "There was an error sending the email. Try again later!".into(),
            ));
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Token sent to email!",
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let hashed = hash_reset_token(&token);
    let password = text(&body, "password");
    let confirm = text(&body, "passwordConfirm");
    let db = Arc::clone(&state.db);

    let user = blocking(move || {
        let repo = db.repo::<User>();
        let unexpired = FilterGroup::and(vec![
            FilterNode::Condition(Filter::eq("passwordResetToken", hashed)),
            FilterNode::Condition(Filter::new(
                "passwordResetExpires",
                Operator::Gt,
                Bson::DateTime(DateTime::now()),
            )),
        ]);
        let mut user = repo
            .find_one(unexpired)?
            .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;
        user.set_password(password, confirm);
        user.clear_password_reset();
        repo.save(&mut user, &["password"], true)?;
        Ok(user)
    })
    .await?;
    send_token(&user, StatusCode::OK, &state.config, &headers)
}

pub async fn update_my_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let current = text(&body, "passwordCurrent");
    let password = text(&body, "password");
    let confirm = text(&body, "passwordConfirm");
    let db = Arc::clone(&state.db);

    let user = blocking(move || {
        let mut user = user;
        if !user.correct_password(&current) {
            return Err(ApiError::unauthorized("Your current password is wrong."));
        }
        user.set_password(password, confirm);
        db.repo::<User>().save(&mut user, &["password"], true)?;
        Ok(user)
    })
    .await?;
    send_token(&user, StatusCode::OK, &state.config, &headers)
}

pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    factory::get_one::<User>(&state, user.id().to_string()).await
}

pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<Json<serde_json::Value>, ApiError> {
    reject_password_fields(&body)?;
    let patch = pick(&body, &SELF_SERVICE_FIELDS);
    let id = user.id().to_string();
    let db = Arc::clone(&state.db);
    let updated = blocking(move || Ok(db.repo::<User>().update(&id, patch)?)).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "user": to_json(updated) },
    })))
}

pub async fn delete_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let id = user.id().to_string();
    let db = Arc::clone(&state.db);
    blocking(move || {
        db.repo::<User>().update(&id, doc! { "active": false })?;
        Ok(())
    })
    .await?;
    info!(user = %user.id(), collection = User::COLLECTION, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}
