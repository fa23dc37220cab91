//! HTTP-level tests for login, the employee directory and cost centers.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_auth, get_auth, post_json, post_json_auth, put_json_auth, seed_org,
    token_for, TEST_PASSWORD,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": "ANA@example.org", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let token = json["data"]["access_token"].as_str().unwrap().to_string();
    assert!(json["data"]["expires_in"].is_number());
    assert_eq!(json["data"]["employee"]["id"], org.staff.id);
    assert!(json["data"]["employee"].get("password_hash").is_none());

    let me = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["email"], "ana@example.org");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": "ana@example.org", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivated_employee_cannot_log_in(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);
    let admin = token_for(&org.admin);

    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/employees/{}", org.junior.id),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let login = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": "jo@example.org", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::FORBIDDEN);

    // Tokens issued before deactivation stop working too.
    let me = get_auth(app, "/api/v1/auth/me", &token_for(&org.junior)).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Employee CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_creates_employee(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/employees",
        &token_for(&org.admin),
        serde_json::json!({
            "name": "Nina",
            "email": "nina@example.org",
            "password": "a-long-password",
            "position": "Outreach Coordinator",
            "supervisor_id": org.supervisor.id,
            "senior_staff_id": org.senior.id,
            "cost_centers": ["OUTREACH", "FIELD"],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "staff");
    assert_eq!(json["data"]["supervisor_id"], org.supervisor.id);
    assert_eq!(json["data"]["senior_staff_id"], org.senior.id);
    assert_eq!(json["data"]["cost_centers"][0], "OUTREACH");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_identical_approvers_rejected(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/employees",
        &token_for(&org.admin),
        serde_json::json!({
            "name": "Dup",
            "email": "dup@example.org",
            "password": "a-long-password",
            "supervisor_id": org.supervisor.id,
            "senior_staff_id": org.supervisor.id,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_employee_validation(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);
    let admin = token_for(&org.admin);

    let cases = [
        // No supervisor below the top-level role.
        serde_json::json!({ "name": "A", "email": "a@example.org", "password": "a-long-password" }),
        // Bad email.
        serde_json::json!({ "name": "B", "email": "not-an-email", "password": "a-long-password",
                            "supervisor_id": org.supervisor.id }),
        // Short password.
        serde_json::json!({ "name": "C", "email": "c@example.org", "password": "short",
                            "supervisor_id": org.supervisor.id }),
        // Unknown cost center.
        serde_json::json!({ "name": "D", "email": "d@example.org", "password": "a-long-password",
                            "supervisor_id": org.supervisor.id, "cost_centers": ["MOON"] }),
        // Unknown role.
        serde_json::json!({ "name": "E", "email": "e@example.org", "password": "a-long-password",
                            "supervisor_id": org.supervisor.id, "role": "ceo" }),
        // Supervisor does not exist.
        serde_json::json!({ "name": "F", "email": "f@example.org", "password": "a-long-password",
                            "supervisor_id": 999_999 }),
        // Supervisor is a plain staff member.
        serde_json::json!({ "name": "G", "email": "g@example.org", "password": "a-long-password",
                            "supervisor_id": org.junior.id }),
    ];

    for body in cases {
        let response =
            post_json_auth(app.clone(), "/api/v1/employees", &admin, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "accepted {body}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_conflicts(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/employees",
        &token_for(&org.admin),
        serde_json::json!({
            "name": "Other Ana",
            "email": "Ana@Example.org",
            "password": "a-long-password",
            "supervisor_id": org.supervisor.id,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "An employee with this email already exists"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_clears_senior_staff_with_null(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/employees/{}", org.staff.id);

    let response = put_json_auth(
        app.clone(),
        &uri,
        &token_for(&org.admin),
        serde_json::json!({ "senior_staff_id": null, "position": "Field Worker" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["senior_staff_id"].is_null());
    assert_eq!(json["data"]["supervisor_id"], org.supervisor.id);
    assert_eq!(json["data"]["position"], "Field Worker");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_rejects_identical_approvers_after_merge(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    // Only the supervisor changes, but it collides with the stored senior staff.
    let response = put_json_auth(
        app,
        &format!("/api/v1/employees/{}", org.staff.id),
        &token_for(&org.admin),
        serde_json::json!({ "supervisor_id": org.senior.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_cannot_deactivate_self(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let admin = token_for(&org.admin);
    let own = format!("/api/v1/employees/{}", org.admin.id);

    let response = delete_auth(app.clone(), &own, &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The update endpoint must not offer a way around it.
    let response = put_json_auth(app.clone(), &own, &admin, serde_json::json!({ "is_active": false })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(app.clone(), &own, &admin, serde_json::json!({ "role": "staff" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Still an active admin.
    let response = get_auth(app, "/api/v1/employees?include_inactive=true", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let me = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == org.admin.id)
        .unwrap()
        .clone();
    assert_eq!(me["role"], "admin");
    assert_eq!(me["is_active"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_update_keeps_old_password(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    // The email collides with Fiona's, so the whole update must be rejected.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/employees/{}", org.staff.id),
        &token_for(&org.admin),
        serde_json::json!({ "email": "fiona@example.org", "password": "brand-new-secret-99" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let old = post_json(
        app.clone(),
        "/api/v1/auth/login",
        serde_json::json!({ "email": "ana@example.org", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(old.status(), StatusCode::OK);

    let new = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": "ana@example.org", "password": "brand-new-secret-99" }),
    )
    .await;
    assert_eq!(new.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_changes_password(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/employees/{}", org.staff.id),
        &token_for(&org.admin),
        serde_json::json!({ "password": "brand-new-secret-99" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": "ana@example.org", "password": "brand-new-secret-99" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_hides_inactive_by_default(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);
    let admin = token_for(&org.admin);

    delete_auth(
        app.clone(),
        &format!("/api/v1/employees/{}", org.junior.id),
        &admin,
    )
    .await;

    let active = body_json(get_auth(app.clone(), "/api/v1/employees", &admin).await).await;
    assert_eq!(active["data"].as_array().unwrap().len(), 5);

    let all = body_json(
        get_auth(app.clone(), "/api/v1/employees?include_inactive=true", &admin).await,
    )
    .await;
    assert_eq!(all["data"].as_array().unwrap().len(), 6);

    // The flag is ignored for non-admins.
    let staff_view = body_json(
        get_auth(
            app,
            "/api/v1/employees?include_inactive=true",
            &token_for(&org.staff),
        )
        .await,
    )
    .await;
    assert_eq!(staff_view["data"].as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cost_centers_listed(pool: PgPool) {
    let org = seed_org(&pool).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/cost-centers", &token_for(&org.staff)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let codes: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"FIELD"));
}
