//! Integration tests for the admin overview and the service endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{StatusCode, header};
use serde_json::json;

use carmart_integration_tests::TestApp;

const ADMIN_PATHS: [&str; 4] = [
    "/api/admin/analytics",
    "/api/admin/cars",
    "/api/admin/users",
    "/api/admin/testdrives",
];

#[tokio::test]
async fn test_admin_routes_reject_non_admins() {
    let app = TestApp::new();
    let user = app.register("Bea Buyer", "bea@cars.example").await;

    for path in ADMIN_PATHS {
        let anonymous = app.get(path, None).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED, "{path}");

        let res = app.get(path, Some(&user.token)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(res.message(), "Not authorized as an admin");
    }
}

#[tokio::test]
async fn test_analytics_counts_everything() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    let buyer = app.register("Bea Buyer", "bea@cars.example").await;
    let car = app.create_car(&seller.token, "Kia", "Soul", 2017).await;

    for slot in ["9:00 AM", "10:00 AM", "11:00 AM", "1:00 PM", "2:00 PM", "3:00 PM"] {
        let res = app
            .post_json(
                "/api/testdrives",
                &json!({
                    "car": car["_id"],
                    "date": "2030-01-15",
                    "timeSlot": slot,
                    "contactNumber": "555-0123",
                }),
                Some(&buyer.token),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let res = app.get("/api/admin/analytics", Some(&admin.token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["totalUsers"], 3);
    assert_eq!(res.body["totalCarListings"], 1);
    assert_eq!(res.body["totalTestDrives"], 6);

    let recent = res.body["recentTestDrives"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["timeSlot"], "3:00 PM");
    assert_eq!(recent[0]["user"]["email"], "bea@cars.example");
    assert_eq!(recent[0]["car"]["model"], "Soul");
}

#[tokio::test]
async fn test_admin_lists_embed_contact_details() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    let car = app.create_car(&seller.token, "Volvo", "V60", 2020).await;
    app.post_json(
        "/api/testdrives",
        &json!({
            "car": car["_id"],
            "date": "2030-03-01",
            "timeSlot": "10:00 AM",
            "contactNumber": "555-0199",
        }),
        Some(&admin.token),
    )
    .await;

    let cars = app.get("/api/admin/cars", Some(&admin.token)).await;
    assert_eq!(cars.status, StatusCode::OK);
    assert_eq!(cars.body[0]["user"]["email"], "sam@cars.example");

    let users = app.get("/api/admin/users", Some(&admin.token)).await;
    let users = users.body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
    assert!(users.iter().any(|u| u["role"] == "admin"));

    let drives = app.get("/api/admin/testdrives", Some(&admin.token)).await;
    assert_eq!(drives.status, StatusCode::OK);
    assert_eq!(drives.body[0]["user"]["name"], "Site Admin");
    assert_eq!(drives.body[0]["car"]["make"], "Volvo");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();
    let res = app.get("/api/nope", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body["message"].is_string());
}

#[tokio::test]
async fn test_api_responses_carry_request_id_and_security_headers() {
    let app = TestApp::new();
    let res = app.get("/api/cars", None).await;

    assert!(res.headers.contains_key("x-request-id"));
    assert_eq!(res.headers["x-content-type-options"], "nosniff");
    assert_eq!(res.headers[header::CACHE_CONTROL], "no-store");
}
