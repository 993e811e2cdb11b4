mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{TestApp, test_app, test_app_with};
use natours_api::config::Environment;
use natours_api::mailer::MemoryMailer;
use serde_json::json;

async fn signup(app: &TestApp, email: &str) -> (String, String) {
    let res = app
        .post(
            "/api/v1/users/signup",
            None,
            json!({
                "name": "Lourdes Browning",
                "email": email,
                "password": "pass1234",
                "passwordConfirm": "pass1234",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let token = res.body["token"].as_str().unwrap().to_string();
    let id = res.body["data"]["user"]["_id"].as_str().unwrap().to_string();
    (id, token)
}

// ── Signup and login ────────────────────────────────────────

#[tokio::test]
async fn signup_issues_a_token_and_hides_secrets() {
    let app = test_app();
    let res = app
        .post(
            "/api/v1/users/signup",
            None,
            json!({
                "name": "Lourdes Browning",
                "email": "Lourdes@Example.com",
                "password": "pass1234",
                "passwordConfirm": "pass1234",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["status"], "success");
    let user = &res.body["data"]["user"];
    assert_eq!(user["email"], "lourdes@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordConfirm").is_none());
    assert!(user.get("active").is_none());

    let token = res.body["token"].as_str().unwrap();
    assert!(res.set_cookie().starts_with(&format!("jwt={token};")));
    assert!(res.set_cookie().contains("HttpOnly"));

    let mails = app.mailer.sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "lourdes@example.com");
}

#[tokio::test]
async fn signup_validates_passwords() {
    let app = test_app();
    let res = app
        .post(
            "/api/v1/users/signup",
            None,
            json!({
                "name": "Lourdes Browning",
                "email": "lourdes@example.com",
                "password": "pass1234",
                "passwordConfirm": "pass4321",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid input data. Passwords are not the same!");
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = test_app();
    signup(&app, "lourdes@example.com").await;

    let res = app
        .post("/api/v1/users/login", None, json!({ "email": "lourdes@example.com" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide email and password!");

    let res = app
        .post(
            "/api/v1/users/login",
            None,
            json!({ "email": "lourdes@example.com", "password": "wrong-pass" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Incorrect email or password");

    let res = app
        .post(
            "/api/v1/users/login",
            None,
            json!({ "email": "LOURDES@example.com", "password": "pass1234" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.body["token"].as_str().unwrap().to_string();

    let me = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["data"]["name"], "Lourdes Browning");
}

#[tokio::test]
async fn cookie_token_and_logout() {
    let app = test_app();
    let (id, _) = app.login_as("user");
    let token = app.token_for(&id);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/users/me")
        .header(header::COOKIE, format!("theme=dark; jwt={token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/api/v1/users/logout", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.set_cookie().starts_with("jwt=loggedout;"));

    let req = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::COOKIE, "jwt=loggedout")
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Invalid token. Please log in again!");
}

// ── Protect ─────────────────────────────────────────────────

#[tokio::test]
async fn tokens_of_deleted_users_are_refused() {
    let app = test_app();
    let (id, token) = app.login_as("user");
    app.db().store().find_one_and_delete("users", &id).unwrap();

    let res = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "The user belonging to this token does no longer exist.");
}

#[tokio::test]
async fn tokens_issued_before_a_password_change_are_refused() {
    let app = test_app();
    let (id, token) = app.login_as("user");
    let changed = bson::DateTime::from_millis(bson::DateTime::now().timestamp_millis() + 60_000);
    app.db()
        .store()
        .find_one_and_update("users", &id, bson::doc! { "passwordChangedAt": changed })
        .unwrap();

    let res = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "User recently changed password! Please log in again.");
}

// ── Password reset ──────────────────────────────────────────

#[tokio::test]
async fn forgot_and_reset_password() {
    let app = test_app();
    signup(&app, "lourdes@example.com").await;

    let res = app
        .post(
            "/api/v1/users/forgotPassword",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .post(
            "/api/v1/users/forgotPassword",
            None,
            json!({ "email": "lourdes@example.com" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Token sent to email!");

    let mail = app.mailer.sent().pop().unwrap();
    let url = mail
        .body
        .split_whitespace()
        .find(|word| word.contains("/resetPassword/"))
        .unwrap()
        .to_string();
    let token = url.rsplit('/').next().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let reset = format!("/api/v1/users/resetPassword/{token}");
    let res = app
        .patch(
            &reset,
            None,
            json!({ "password": "newpass123", "passwordConfirm": "newpass123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["token"].is_string());

    let res = app
        .patch(
            &reset,
            None,
            json!({ "password": "again12345", "passwordConfirm": "again12345" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Token is invalid or has expired");

    let res = app
        .post(
            "/api/v1/users/login",
            None,
            json!({ "email": "lourdes@example.com", "password": "newpass123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_reset_mail_clears_the_token() {
    let app = test_app_with(MemoryMailer::failing(), Environment::Development);
    let id = app.insert_user("Lourdes Browning", "lourdes@example.com", "user");

    let res = app
        .post(
            "/api/v1/users/forgotPassword",
            None,
            json!({ "email": "lourdes@example.com" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["status"], "error");
    assert_eq!(res.message(), "There was an error sending the email. Try again later!");

    let stored = app.db().store().get("users", &id).unwrap().unwrap();
    assert!(!stored.contains_key("passwordResetToken"));
    assert!(!stored.contains_key("passwordResetExpires"));
}

// ── Self service ────────────────────────────────────────────

#[tokio::test]
async fn update_my_password_requires_the_current_one() {
    let app = test_app();
    let (_, token) = signup(&app, "lourdes@example.com").await;

    let res = app
        .patch(
            "/api/v1/users/updateMyPassword",
            Some(&token),
            json!({
                "passwordCurrent": "not-it-at-all",
                "password": "newpass123",
                "passwordConfirm": "newpass123",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Your current password is wrong.");

    let res = app
        .patch(
            "/api/v1/users/updateMyPassword",
            Some(&token),
            json!({
                "passwordCurrent": "pass1234",
                "password": "newpass123",
                "passwordConfirm": "newpass123",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["token"].is_string());
}

#[tokio::test]
async fn update_me_only_touches_profile_fields() {
    let app = test_app();
    let (id, token) = app.login_as("user");

    let res = app
        .patch(
            "/api/v1/users/updateMe",
            Some(&token),
            json!({ "password": "sneaky123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.message(),
        "This route is not for password updates. Please use /updateMyPassword."
    );

    let res = app
        .patch(
            "/api/v1/users/updateMe",
            Some(&token),
            json!({ "name": "Renamed Person", "role": "admin" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["user"]["name"], "Renamed Person");
    assert_eq!(res.body["data"]["user"]["role"], "user");

    let stored = app.db().store().get("users", &id).unwrap().unwrap();
    assert_eq!(stored.get_str("role").unwrap(), "user");
}

#[tokio::test]
async fn delete_me_deactivates_the_account() {
    let app = test_app();
    let (id, token) = app.login_as("user");
    let (_, admin) = app.login_as("admin");

    let res = app.delete("/api/v1/users/deleteMe", Some(&token)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let stored = app.db().store().get("users", &id).unwrap().unwrap();
    assert!(!stored.get_bool("active").unwrap());

    let res = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/v1/users", Some(&admin)).await;
    assert_eq!(res.body["results"], 1);
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let app = test_app();
    let (id, user) = app.login_as("user");
    let (_, admin) = app.login_as("admin");

    let res = app.get("/api/v1/users", Some(&user)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(
            &format!("/api/v1/users/{id}"),
            Some(&admin),
            json!({ "password": "changed123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .patch(
            &format!("/api/v1/users/{id}"),
            Some(&admin),
            json!({ "role": "guide" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["data"]["role"], "guide");
    assert!(res.body["data"]["data"].get("password").is_none());
}
