//! Shared helpers for HTTP-level integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use mileage_api::auth::jwt::{generate_access_token, JwtConfig};
use mileage_api::auth::password::hash_password;
use mileage_api::config::{ServerConfig, DEFAULT_MILEAGE_RATE_CENTS};
use mileage_api::router::build_app_router;
use mileage_api::state::AppState;
use mileage_core::types::DbId;
use mileage_db::models::employee::{CreateEmployee, Employee};
use mileage_db::repositories::EmployeeRepo;
use mileage_events::EventBus;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        mileage_rate_cents: DEFAULT_MILEAGE_RATE_CENTS,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Application state over `pool` with a fresh event bus.
pub fn test_state(pool: PgPool, upload_dir: &Path) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config(upload_dir)),
        event_bus: Arc::new(EventBus::default()),
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_test_app(pool: PgPool) -> Router {
    let upload_dir = std::env::temp_dir().join(format!("mileage-api-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&upload_dir).expect("upload dir should be creatable");
    app_from_state(test_state(pool, &upload_dir))
}

pub fn app_from_state(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert an employee directly, with [`TEST_PASSWORD`] as password.
pub async fn create_employee(
    pool: &PgPool,
    name: &str,
    role: &str,
    supervisor_id: Option<DbId>,
    senior_staff_id: Option<DbId>,
) -> Employee {
    let input = CreateEmployee {
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: role.to_string(),
        position: None,
        supervisor_id,
        senior_staff_id,
        cost_centers: vec!["FIELD".to_string()],
    };
    EmployeeRepo::create(pool, &input)
        .await
        .expect("employee creation should succeed")
}

/// A bearer token for `employee`, signed with the test secret.
pub fn token_for(employee: &Employee) -> String {
    let config = test_config(Path::new("."));
    generate_access_token(employee.id, &employee.role, &config.jwt).expect("token generation")
}

/// A small organisation: admin at the top, a finance clerk, a supervisor,
/// a senior staff member and a staff member reporting to both.
pub struct Org {
    pub admin: Employee,
    pub finance: Employee,
    pub supervisor: Employee,
    pub senior: Employee,
    pub staff: Employee,
    /// Reports to the supervisor only.
    pub junior: Employee,
}

pub async fn seed_org(pool: &PgPool) -> Org {
    let admin = create_employee(pool, "Admin", "admin", None, None).await;
    let finance = create_employee(pool, "Fiona", "finance", Some(admin.id), None).await;
    let supervisor = create_employee(pool, "Sam", "supervisor", Some(admin.id), None).await;
    let senior = create_employee(pool, "Sena", "senior_staff", Some(supervisor.id), None).await;
    let staff =
        create_employee(pool, "Ana", "staff", Some(supervisor.id), Some(senior.id)).await;
    let junior = create_employee(pool, "Jo", "staff", Some(supervisor.id), None).await;
    Org {
        admin,
        finance,
        supervisor,
        senior,
        staff,
        junior,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn json_auth(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    json_auth(app, Method::POST, uri, token, body).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    json_auth(app, Method::PUT, uri, token, body).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a `multipart/form-data` body. `file` is `(content_type, bytes)`.
pub async fn post_multipart_auth(
    app: Router,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Response<Body> {
    const BOUNDARY: &str = "mileage-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"receipt\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}
