use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use natours_db::DbError;
use natours_query::QueryParamError;
use serde_json::json;
use tracing::error;

use crate::state::AppState;

const GENERIC_MESSAGE: &str = "Something went wrong! :(";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// An expected failure with its own status, e.g. a rejected body.
    #[error("{1}")]
    Status(StatusCode, String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    /// Status and client-facing message. `None` marks an unexpected error
    /// whose details stay out of production responses.
    fn classify(&self) -> (StatusCode, Option<String>) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Some(msg.clone())),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, Some(msg.clone())),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            ApiError::Status(status, msg) => (*status, Some(msg.clone())),
            ApiError::Db(DbError::Validation(e)) => (
                StatusCode::BAD_REQUEST,
                Some(format!("Invalid input data. {e}")),
            ),
            ApiError::Db(DbError::DuplicateKey { value, .. }) => (
                StatusCode::BAD_REQUEST,
                Some(format!(
                    "Duplicate field value: {value}. Please use another value!"
                )),
            ),
            ApiError::Db(DbError::InvalidId(id)) => {
                (StatusCode::BAD_REQUEST, Some(format!("invalid _id: {id}")))
            }
            ApiError::Db(DbError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                Some("No document found with that ID".to_string()),
            ),
            ApiError::Db(_) | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        }
    }
}

impl From<QueryParamError> for ApiError {
    fn from(e: QueryParamError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// What went wrong, kept on the response for [`error_detail`].
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub debug: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();
        let label = if status.is_server_error() {
            "error"
        } else {
            "fail"
        };
        if message.is_none() {
            error!(error = %self, "request failed");
        }

        let body = json!({
            "status": label,
            "message": message.as_deref().unwrap_or(GENERIC_MESSAGE),
        });
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorDetail {
            message: message.unwrap_or_else(|| self.to_string()),
            debug: format!("{self:?}"),
        });
        response
    }
}

/// In development, rewrite error bodies to carry the real message and the
/// debug form of the error.
pub async fn error_detail(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if state.config.is_production() {
        return response;
    }
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    let label = if status.is_server_error() {
        "error"
    } else {
        "fail"
    };
    let body = json!({
        "status": label,
        "message": detail.message,
        "error": detail.debug,
    });
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    (parts, Json(body)).into_response()
}

/// Run synchronous store work off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
