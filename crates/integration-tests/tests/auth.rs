//! Integration tests for accounts, sessions and profiles.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use carmart_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = TestApp::new();
    let res = app
        .post_json(
            "/api/auth/register",
            &json!({
                "name": "Bea Buyer",
                "email": "Bea@Cars.Example",
                "password": PASSWORD,
                "address": "12 Elm St",
            }),
            None,
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["email"], "bea@cars.example");
    assert_eq!(res.body["role"], "user");
    assert_eq!(res.body["address"], "12 Elm St");
    assert!(res.body.get("password").is_none());
    assert!(res.body.get("passwordHash").is_none());

    let cookie = res.set_cookie().unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_role_injection() {
    let app = TestApp::new();
    app.register("First", "dup@cars.example").await;

    let res = app
        .post_json(
            "/api/auth/register",
            &json!({ "name": "Second", "email": "DUP@cars.example", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.message(), "User already exists");

    let res = app
        .post_json(
            "/api/auth/register",
            &json!({
                "name": "Sneaky",
                "email": "sneaky@cars.example",
                "password": PASSWORD,
                "role": "admin",
            }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["role"], "user");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let res = app
        .post_json(
            "/api/auth/register",
            &json!({ "email": "a@cars.example", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post_json(
            "/api/auth/register",
            &json!({ "name": "A", "email": "not-an-email", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post_json(
            "/api/auth/register",
            &json!({ "name": "A", "email": "a@cars.example", "password": "short" }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_profile() {
    let app = TestApp::new();
    let session = app.register("Bea Buyer", "bea@cars.example").await;

    let wrong = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": "bea@cars.example", "password": "wrong-password" }),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.message(), "Invalid email or password");

    let unknown = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": "nobody@cars.example", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.message(), wrong.message());

    let ok = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": "BEA@cars.example", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let token = ok.token_cookie().unwrap();

    let profile = app.get("/api/auth/profile", Some(token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["_id"], session.id);
    assert_eq!(profile.body["name"], "Bea Buyer");
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = TestApp::new();
    let session = app.register("Bea Buyer", "bea@cars.example").await;

    let req = Request::builder()
        .uri("/api/users/profile")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], session.email);
}

#[tokio::test]
async fn test_missing_and_forged_tokens() {
    let app = TestApp::new();

    let res = app.get("/api/auth/profile", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Not authorized, no token");

    let res = app.get("/api/auth/profile", Some("not.a.jwt")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Not authorized, token failed");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let session = app.register("Bea Buyer", "bea@cars.example").await;

    for method in [Method::POST, Method::GET] {
        let req = carmart_integration_tests::request(
            method,
            "/api/auth/logout",
            Some(&session.token),
            Body::empty(),
            None,
        );
        let res = app.send(req).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.message(), "Logged out successfully");
        assert_eq!(res.token_cookie(), Some(""));
        assert!(res.set_cookie().unwrap().contains("Max-Age=0"));
    }
}

#[tokio::test]
async fn test_update_profile_and_password() {
    let app = TestApp::new();
    let session = app.register("Bea Buyer", "bea@cars.example").await;
    app.register("Taken", "taken@cars.example").await;

    let res = app
        .put_json(
            "/api/users/profile",
            &json!({ "name": "Beatrice", "phoneNumber": "555-0199", "password": "a-brand-new-pass" }),
            Some(&session.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Beatrice");
    assert_eq!(res.body["phoneNumber"], "555-0199");

    let login = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": session.email, "password": "a-brand-new-pass" }),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let clash = app
        .put_json(
            "/api/users/profile",
            &json!({ "email": "taken@cars.example" }),
            Some(&session.token),
        )
        .await;
    assert_eq!(clash.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_account_revokes_access() {
    let app = TestApp::new();
    let session = app.register("Sam Seller", "sam@cars.example").await;
    app.create_car(&session.token, "Ford", "Focus", 2015).await;

    let res = app.delete("/api/users/profile", Some(&session.token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "User removed");

    // The token still verifies but the account is gone.
    let res = app.get("/api/auth/profile", Some(&session.token)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let cars = app.get("/api/cars", None).await;
    assert_eq!(cars.body, json!([]));
}
