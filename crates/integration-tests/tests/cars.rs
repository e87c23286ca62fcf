//! Integration tests for listings, photo uploads and search-by-image.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::Value;

use carmart_integration_tests::{PNG_BYTES, StubAssistant, TestApp};

const CIVIC_FIELDS: [(&str, &str); 6] = [
    ("make", "Honda"),
    ("model", "Civic"),
    ("year", "2019"),
    ("price", "18250.50"),
    ("mileage", "38000"),
    ("condition", "Excellent"),
];

#[tokio::test]
async fn test_create_listing_stores_photos() {
    let app = TestApp::with_assistant(StubAssistant::recognizing("Honda", "Civic"));
    let seller = app.register("Sam Seller", "sam@cars.example").await;

    let res = app
        .post_multipart(
            "/api/cars",
            &CIVIC_FIELDS,
            &[
                ("images", "image/png", PNG_BYTES),
                ("images", "image/jpeg", &b"\xFF\xD8\xFF\xE0 fake jpeg"[..]),
            ],
            Some(&seller.token),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["user"], seller.id);
    assert_eq!(res.body["condition"], "Excellent");
    assert_eq!(
        res.body["description"],
        "Clean title, one owner, regularly serviced."
    );

    let images = res.body["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let url = images[0]["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(images[0]["publicId"].is_string());

    let photo = app.get(url, None).await;
    assert_eq!(photo.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_listing_without_assistant_has_no_description() {
    let app = TestApp::new();
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    let car = app.create_car(&seller.token, "Toyota", "Corolla", 2016).await;
    assert_eq!(car["description"], Value::Null);
}

#[tokio::test]
async fn test_create_listing_validation() {
    let app = TestApp::new();
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    let token = Some(seller.token.as_str());

    let no_photos = app
        .post_multipart("/api/cars", &CIVIC_FIELDS, &[], token)
        .await;
    assert_eq!(no_photos.status, StatusCode::BAD_REQUEST);

    let six: Vec<(&str, &str, &[u8])> = (0..6).map(|_| ("images", "image/png", PNG_BYTES)).collect();
    let too_many = app
        .post_multipart("/api/cars", &CIVIC_FIELDS, &six, token)
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let gif = app
        .post_multipart(
            "/api/cars",
            &CIVIC_FIELDS,
            &[("images", "image/gif", &b"GIF89a"[..])],
            token,
        )
        .await;
    assert_eq!(gif.status, StatusCode::BAD_REQUEST);

    let mut bad_condition = CIVIC_FIELDS;
    bad_condition[5] = ("condition", "Like new");
    let res = app
        .post_multipart(
            "/api/cars",
            &bad_condition,
            &[("images", "image/png", PNG_BYTES)],
            token,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let mut huge_price = CIVIC_FIELDS;
    huge_price[3] = ("price", "10000000000");
    let res = app
        .post_multipart(
            "/api/cars",
            &huge_price,
            &[("images", "image/png", PNG_BYTES)],
            token,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.message().contains("price"), "{}", res.message());

    let anonymous = app
        .post_multipart(
            "/api/cars",
            &CIVIC_FIELDS,
            &[("images", "image/png", PNG_BYTES)],
            None,
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.get("/api/cars", None).await.body, Value::Array(vec![]));
}

#[tokio::test]
async fn test_public_listing_hides_seller_email() {
    let app = TestApp::new();
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    app.create_car(&seller.token, "Honda", "Civic", 2019).await;
    app.create_car(&seller.token, "Honda", "Accord", 2020).await;

    let res = app.get("/api/cars", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let cars = res.body.as_array().unwrap();
    assert_eq!(cars.len(), 2);
    // Newest first.
    assert_eq!(cars[0]["model"], "Accord");
    assert_eq!(cars[0]["user"]["name"], "Sam Seller");
    assert_eq!(cars[0]["user"]["_id"], seller.id);
    assert!(cars[0]["user"].get("email").is_none());
}

#[tokio::test]
async fn test_show_mine_and_contact() {
    let app = TestApp::new();
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    let buyer = app.register("Bea Buyer", "bea@cars.example").await;
    let car = app.create_car(&seller.token, "Subaru", "Outback", 2018).await;
    let id = &car["_id"];

    let show = app.get(&format!("/api/cars/{id}"), None).await;
    assert_eq!(show.status, StatusCode::OK);
    assert_eq!(show.body["make"], "Subaru");

    assert_eq!(app.get("/api/cars/999999", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/cars/not-an-id", None).await.status, StatusCode::NOT_FOUND);

    let mine = app.get("/api/cars/my", Some(&seller.token)).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    let theirs = app.get("/api/cars/my", Some(&buyer.token)).await;
    assert_eq!(theirs.body, Value::Array(vec![]));

    let contact_path = format!("/api/cars/{id}/contact");
    assert_eq!(app.get(&contact_path, None).await.status, StatusCode::UNAUTHORIZED);
    let contact = app.get(&contact_path, Some(&buyer.token)).await;
    assert_eq!(contact.status, StatusCode::OK);
    assert_eq!(contact.body["email"], "sam@cars.example");
    assert_eq!(contact.body["phoneNumber"], "555-0100");
}

// ============================================================================
// Search by image
// ============================================================================

#[tokio::test]
async fn test_search_by_image_finds_similar_cars() {
    let app = TestApp::with_assistant(StubAssistant::recognizing("honda", "civic"));
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    app.create_car(&seller.token, "Honda", "Civic", 2019).await;
    app.create_car(&seller.token, "Honda", "Civic Type R", 2022).await;
    app.create_car(&seller.token, "Ford", "Mustang", 2019).await;

    let res = app
        .post_multipart(
            "/api/cars/search-by-image",
            &[],
            &[("image", "image/png", PNG_BYTES)],
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let models: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["model"].as_str().unwrap())
        .collect();
    assert_eq!(models.len(), 2);
    assert!(models.iter().all(|m| m.starts_with("Civic")));
}

#[tokio::test]
async fn test_search_by_image_without_match() {
    let app = TestApp::with_assistant(StubAssistant::recognizing("Tesla", "Model 3"));
    let seller = app.register("Sam Seller", "sam@cars.example").await;
    app.create_car(&seller.token, "Honda", "Civic", 2019).await;

    let res = app
        .post_multipart(
            "/api/cars/search-by-image",
            &[],
            &[("image", "image/png", PNG_BYTES)],
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.message().starts_with("No similar cars found"));
}

#[tokio::test]
async fn test_search_by_image_errors() {
    let unconfigured = TestApp::new();
    let res = unconfigured
        .post_multipart(
            "/api/cars/search-by-image",
            &[],
            &[("image", "image/png", PNG_BYTES)],
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);

    let failing = TestApp::with_assistant(StubAssistant::default());
    let res = failing
        .post_multipart(
            "/api/cars/search-by-image",
            &[],
            &[("image", "image/png", PNG_BYTES)],
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);

    let res = failing
        .post_multipart("/api/cars/search-by-image", &[("note", "no file")], &[], None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please upload an image file.");
}
