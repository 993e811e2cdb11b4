//! Generic CRUD handlers shared by every resource.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use bson::Document;
use natours_db::Model;
use natours_query::{FeatureConfig, Query, QueryFeatures, QueryParams};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, blocking};
use crate::json::{docs_to_json, to_json};
use crate::state::AppState;

/// Run the query features over `base` with the request's parameters.
pub fn build_query(base: Query, params: &QueryParams, config: &Config) -> Result<Query, ApiError> {
    let features = QueryFeatures::new(base, params)
        .with_config(FeatureConfig {
            max_limit: config.page_limit_max,
            ..FeatureConfig::default()
        })
        .filter()
        .sort()
        .limit_fields()
        .paginate();
    for ignored in features.ignored() {
        debug!(%ignored, "query parameter ignored");
    }
    Ok(features.finish()?)
}

pub fn envelope(doc: Document) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": { "data": to_json(doc) },
    }))
}

pub fn listing(docs: Vec<Document>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "results": docs.len(),
        "data": { "data": docs_to_json(docs) },
    }))
}

pub async fn get_all<M: Model + 'static>(
    state: &AppState,
    base: Query,
    params: QueryParams,
) -> Result<Json<Value>, ApiError> {
    let query = build_query(base, &params, &state.config)?;
    let db = Arc::clone(&state.db);
    let docs = blocking(move || Ok(db.repo::<M>().find(query)?)).await?;
    Ok(listing(docs))
}

pub async fn get_one<M: Model + 'static>(
    state: &AppState,
    id: String,
) -> Result<Json<Value>, ApiError> {
    let db = Arc::clone(&state.db);
    let doc = blocking(move || Ok(db.repo::<M>().get(&id)?)).await?;
    Ok(envelope(doc))
}

pub async fn create_one<M: Model + 'static>(
    state: &AppState,
    body: Document,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let db = Arc::clone(&state.db);
    let doc = blocking(move || Ok(db.repo::<M>().create(body)?)).await?;
    Ok((StatusCode::CREATED, envelope(doc)))
}

pub async fn update_one<M: Model + 'static>(
    state: &AppState,
    id: String,
    patch: Document,
) -> Result<Json<Value>, ApiError> {
    let db = Arc::clone(&state.db);
    let doc = blocking(move || Ok(db.repo::<M>().update(&id, patch)?)).await?;
    Ok(envelope(doc))
}

pub async fn delete_one<M: Model + 'static>(
    state: &AppState,
    id: String,
) -> Result<StatusCode, ApiError> {
    let db = Arc::clone(&state.db);
    blocking(move || {
        db.repo::<M>().delete(&id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
