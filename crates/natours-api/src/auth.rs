use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use natours_db::models::{Role, User};
use natours_db::{DbError, Model};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::{ApiError, blocking};
use crate::json::to_json;
use crate::state::AppState;

pub const COOKIE_NAME: &str = "jwt";
const LOGGED_OUT: &str = "loggedout";
const LOGOUT_COOKIE_SECS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn sign_token(user_id: &str, config: &Config) -> Result<String, ApiError> {
    let iat = now_secs();
    let claims = Claims {
        id: user_id.to_string(),
        iat,
        exp: iat + config.jwt_expires_in_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            ApiError::unauthorized("Your token has expired! Please log in again.")
        }
        _ => ApiError::unauthorized("Invalid token. Please log in again!"),
    })
}

/// Bearer token first, then the `jwt` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Whether the request reached the proxy over https.
pub fn is_secure(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

pub fn auth_cookie(token: &str, config: &Config, secure: bool) -> String {
    let max_age = config.jwt_cookie_expires_in_days * 24 * 60 * 60;
    let mut cookie = format!("{COOKIE_NAME}={token}; Max-Age={max_age}; Path=/; HttpOnly");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn logout_cookie() -> String {
    format!("{COOKIE_NAME}={LOGGED_OUT}; Max-Age={LOGOUT_COOKIE_SECS}; Path=/; HttpOnly")
}

/// Public view of a user: hidden fields removed.
pub fn user_json(user: &User) -> Result<serde_json::Value, ApiError> {
    let mut doc = bson::to_document(user).map_err(DbError::from)?;
    for field in User::HIDDEN {
        doc.remove(*field);
    }
    Ok(to_json(doc))
}

/// Sign a token for `user` and answer with it in the body and in the cookie.
pub fn send_token(
    user: &User,
    status: StatusCode,
    config: &Config,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let id = user
        .id
        .as_deref()
        .ok_or_else(|| ApiError::Internal("token requested for an unsaved user".into()))?;
    let token = sign_token(id, config)?;
    let cookie = auth_cookie(&token, config, is_secure(headers));
    let body = json!({
        "status": "success",
        "token": token,
        "data": { "user": user_json(user)? },
    });
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// The logged-in caller. Extracting it rejects requests without a valid,
/// current token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        self.0.id.as_deref().unwrap_or_default()
    }

    pub fn restrict_to(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.0.has_role(roles) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action".into(),
            ))
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = token_from_headers(&parts.headers).ok_or_else(|| {
            ApiError::unauthorized("You are not logged in! Please log in to get access.")
        })?;
        let claims = verify_token(&token, &state.config)?;

        let db = Arc::clone(&state.db);
        let id = claims.id.clone();
        let user = blocking(move || match db.repo::<User>().get_model(&id) {
            Ok(user) => Ok(user),
            Err(DbError::NotFound(_) | DbError::InvalidId(_)) => Err(ApiError::unauthorized(
                "The user belonging to this token does no longer exist.",
            )),
            Err(e) => Err(e.into()),
        })
        .await?;

        if user.changed_password_after(claims.iat) {
            return Err(ApiError::unauthorized(
                "User recently changed password! Please log in again.",
            ));
        }
        Ok(CurrentUser(user))
    }
}
