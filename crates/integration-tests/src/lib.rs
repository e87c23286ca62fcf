//! Integration tests for the Carmart API.
//!
//! The tests drive the real router in-process: [`TestApp`] builds the same
//! `carmart_api::app` the server runs, backed by a `MemoryStore` and a
//! throwaway upload directory, and sends requests through
//! `tower::ServiceExt::oneshot`. No database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p carmart-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use carmart_api::ai::{AiError, ImageAnalysis, ListingAssistant, ListingFacts};
use carmart_api::config::ApiConfig;
use carmart_api::db::MemoryStore;
use carmart_api::services::auth::{AuthService, Registration};
use carmart_api::state::AppState;
use carmart_core::Role;

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "carmart-test-boundary";

/// A 1x1 PNG, enough to pass the content-type check.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89,
];

/// An assistant with canned answers.
#[derive(Debug, Clone, Default)]
pub struct StubAssistant {
    /// Returned by `describe_listing`; `None` makes the call fail.
    pub description: Option<String>,
    /// Returned by `analyze_image`; `None` makes the call fail.
    pub analysis: Option<ImageAnalysis>,
}

impl StubAssistant {
    /// An assistant that recognizes `make` and `model` in every photo.
    #[must_use]
    pub fn recognizing(make: &str, model: &str) -> Self {
        Self {
            description: Some("Clean title, one owner, regularly serviced.".to_string()),
            analysis: Some(ImageAnalysis {
                make: Some(make.to_string()),
                model: Some(model.to_string()),
                year: None,
                color: None,
            }),
        }
    }
}

#[async_trait]
impl ListingAssistant for StubAssistant {
    async fn describe_listing(&self, _facts: &ListingFacts) -> Result<String, AiError> {
        self.description.clone().ok_or(AiError::EmptyResponse)
    }

    async fn analyze_image(&self, _image: &[u8], _mime: &str) -> Result<ImageAnalysis, AiError> {
        self.analysis.clone().ok_or(AiError::EmptyResponse)
    }
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, `Value::String` for plain text, `Value::Null` if empty.
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of an error body.
    #[must_use]
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    /// The value of the `token` cookie set by this response, if any.
    #[must_use]
    pub fn token_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("token="))
            .map(|rest| rest.split(';').next().unwrap_or_default())
    }

    /// The raw `Set-Cookie` header for the token.
    #[must_use]
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("token="))
    }
}

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub email: String,
    pub token: String,
}

/// The API wired to in-memory collaborators.
pub struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    upload_dir: PathBuf,
}

impl TestApp {
    /// An app without AI features.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// An app with the given assistant.
    #[must_use]
    pub fn with_assistant(assistant: StubAssistant) -> Self {
        Self::build(Some(Arc::new(assistant)))
    }

    fn build(assistant: Option<Arc<dyn ListingAssistant>>) -> Self {
        let upload_dir = std::env::temp_dir().join(format!("carmart-it-{}", Uuid::new_v4()));
        let config = ApiConfig {
            database_url: "postgres://unused".to_string().into(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://localhost".to_string(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            jwt_secret: "k7Qz2pL9vX4mN8rT1wY6bH3cJ5dF0gS7".to_string().into(),
            upload_dir: upload_dir.clone(),
            rate_limit: false,
            gemini: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), assistant);

        Self {
            router: carmart_api::app(state),
            store,
            upload_dir,
        }
    }

    /// The router, for tests that drive it concurrently.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(self.router.clone(), request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, path, token, Body::empty(), None))
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, path, token, Body::empty(), None))
            .await
    }

    pub async fn post_json(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.send(json_request(Method::POST, path, body, token)).await
    }

    pub async fn put_json(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.send(json_request(Method::PUT, path, body, token)).await
    }

    /// Register an account through the API and keep its cookie.
    pub async fn register(&self, name: &str, email: &str) -> Session {
        let res = self
            .post_json(
                "/api/auth/register",
                &json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "phoneNumber": "555-0100",
                }),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {:?}", res.body);
        session_from(&res)
    }

    /// Create an admin directly in the store, then sign in as it.
    pub async fn admin(&self) -> Session {
        let email = "admin@carmart.example";
        AuthService::new(self.store.as_ref())
            .create_account(
                Registration {
                    name: Some("Site Admin".to_string()),
                    email: Some(email.to_string()),
                    password: Some(PASSWORD.to_string()),
                    ..Registration::default()
                },
                Role::Admin,
            )
            .await
            .unwrap();

        let res = self
            .post_json(
                "/api/auth/login",
                &json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "admin login failed: {:?}", res.body);
        session_from(&res)
    }

    /// Publish a listing with one photo; returns the created car.
    pub async fn create_car(&self, token: &str, make: &str, model: &str, year: i32) -> Value {
        let year = year.to_string();
        let fields = [
            ("make", make),
            ("model", model),
            ("year", year.as_str()),
            ("price", "15500"),
            ("mileage", "42000"),
            ("condition", "Good"),
            ("color", "Blue"),
        ];
        let res = self
            .post_multipart("/api/cars", &fields, &[("images", "image/png", PNG_BYTES)], Some(token))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create car failed: {:?}", res.body);
        res.body
    }

    /// POST a multipart form made of text fields and files.
    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
        token: Option<&str>,
    ) -> TestResponse {
        let body = multipart_body(fields, files);
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        self.send(request(
            Method::POST,
            path,
            token,
            Body::from(body),
            Some(&content_type),
        ))
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Send a request through a router.
pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Build a request, authenticating through the `token` cookie.
#[must_use]
pub fn request(
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

/// Build a JSON request.
#[must_use]
pub fn json_request(method: Method, path: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    request(
        method,
        path,
        token,
        Body::from(body.to_string()),
        Some("application/json"),
    )
}

fn session_from(res: &TestResponse) -> Session {
    Session {
        id: res.body["_id"].as_i64().unwrap(),
        email: res.body["email"].as_str().unwrap().to_string(),
        token: res.token_cookie().unwrap().to_string(),
    }
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (index, (name, content_type, bytes)) in files.iter().enumerate() {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"photo{index}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
