#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use bson::doc;
use http_body_util::BodyExt;
use natours_api::auth::sign_token;
use natours_api::config::Environment;
use natours_api::mailer::MemoryMailer;
use natours_api::{AppState, Config, app};
use natours_db::Db;
use natours_db::models::Tour;
use natours_store::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> &str {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

pub fn test_app() -> TestApp {
    build(MemoryMailer::new(), Config::default())
}

pub fn test_app_with(mailer: MemoryMailer, env: Environment) -> TestApp {
    let config = Config {
        env,
        ..Config::default()
    };
    build(mailer, config)
}

pub fn test_app_with_config(config: Config) -> TestApp {
    build(MemoryMailer::new(), config)
}

fn build(mailer: MemoryMailer, config: Config) -> TestApp {
    let db = Db::open(Arc::new(MemoryStore::new())).unwrap();
    let mailer = Arc::new(mailer);
    let state = AppState::new(db, config, mailer.clone());
    TestApp { state, mailer }
}

impl TestApp {
    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub fn db(&self) -> &Db {
        &self.state.db
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    /// A user stored without password hashing; log in with [`Self::token_for`].
    pub fn insert_user(&self, name: &str, email: &str, role: &str) -> String {
        let stored = self
            .db()
            .store()
            .insert(
                "users",
                doc! {
                    "name": name,
                    "email": email,
                    "photo": "default.jpg",
                    "role": role,
                    "password": "not-a-real-hash",
                    "active": true,
                },
            )
            .unwrap();
        stored.get_str("_id").unwrap().to_string()
    }

    pub fn token_for(&self, user_id: &str) -> String {
        sign_token(user_id, &self.state.config).unwrap()
    }

    /// Insert a user with `role` and return a token for it.
    pub fn login_as(&self, role: &str) -> (String, String) {
        let email = format!("{role}-{}@natours.io", bson::oid::ObjectId::new().to_hex());
        let id = self.insert_user(&format!("Test {role}"), &email, role);
        let token = self.token_for(&id);
        (id, token)
    }

    pub fn create_tour(&self, name: &str, price: i32, duration: i32) -> String {
        let tour = self
            .db()
            .repo::<Tour>()
            .create(tour_body(name, price, duration))
            .unwrap();
        tour.get_str("_id").unwrap().to_string()
    }
}

pub fn tour_body(name: &str, price: i32, duration: i32) -> bson::Document {
    doc! {
        "name": name,
        "duration": duration,
        "maxGroupSize": 10,
        "difficulty": "medium",
        "price": price,
        "summary": "Exploring the jaw-dropping US east coast by foot and by boat",
        "imageCover": "tour-2-cover.jpg",
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Names of the listed documents, in response order.
pub fn names(body: &Value) -> Vec<String> {
    body["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["name"].as_str().unwrap().to_string())
        .collect()
}
