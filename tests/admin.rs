mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{relaxed_config, spawn, spawn_with, TestApp};
use cybak::{
    config::{Environment, RateLimitPolicy},
    security::signature::{sign, SIGNATURE_HEADER, SKIP_HEADER, TIMESTAMP_HEADER},
};
use serde_json::json;
use time::OffsetDateTime;

fn promote_request(token: &str, user_id: i64) -> Request<Body> {
    common::request(Method::POST, &format!("/api/admin/promote/{user_id}"), Some(token), None)
}

#[tokio::test]
async fn non_admin_is_forbidden_and_anonymous_is_unauthorized() {
    let t = spawn().await;
    let (_, token) = t.signup("plain@example.com").await;

    let res = t.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "forbidden");

    let res = t.get("/api/admin/stats", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "missing_token");
}

#[tokio::test]
async fn promotion_applies_to_existing_token() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;
    let (user_id, token) = t.signup("later@example.com").await;

    assert_eq!(t.get("/api/admin/stats", Some(&token)).await.status, StatusCode::FORBIDDEN);

    let res = t.send(promote_request(&admin, user_id)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User promoted to admin");

    assert_eq!(t.get("/api/admin/stats", Some(&token)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn promoting_unknown_user_is_not_found() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;
    let res = t.send(promote_request(&admin, 9_999)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "User not found");
}

#[tokio::test]
async fn deleted_admin_is_forbidden() {
    let t = spawn().await;
    let (id, admin) = t.admin("root@example.com").await;
    t.delete_user(id).await;
    let res = t.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_report_totals_and_recent_registrations() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;
    let (_, token) = t.signup("user@example.com").await;
    t.post("/api/audits", Some(&token), json!({ "url": "https://example.com/" }))
        .await;

    let res = t.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["users"]["total"], 2);
    assert_eq!(res.body["users"]["today"], 2);
    assert_eq!(res.body["audits"]["total"], 1);
    assert_eq!(res.body["audits"]["month"], 1);
    let days = res.body["registrations_by_day"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["count"], 2);
}

#[tokio::test]
async fn users_listing_paginates_and_searches() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;
    for name in ["anna", "bert", "carl"] {
        t.signup(&format!("{name}@example.com")).await;
    }

    let res = t.get("/api/admin/users?page=2&per_page=3", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["pagination"], json!({ "page": 2, "per_page": 3, "total": 4, "pages": 2 }));
    let users = res.body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "root@example.com");
    assert_eq!(users[0]["isAdmin"], true);

    let res = t.get("/api/admin/users?search=bert", Some(&admin)).await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["users"][0]["email"], "bert@example.com");

    let res = t.get("/api/admin/users?per_page=1000&page=0", Some(&admin)).await;
    assert_eq!(res.body["pagination"]["per_page"], 100);
    assert_eq!(res.body["pagination"]["page"], 1);
}

#[tokio::test]
async fn admin_reads_any_users_audits() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;
    let (user_id, token) = t.signup("owner@example.com").await;
    t.post("/api/audits", Some(&token), json!({ "url": "https://owner.example/" }))
        .await;

    let res = t.get(&format!("/api/admin/users/{user_id}/audits"), Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["email"], "owner@example.com");
    assert_eq!(res.body["audits"][0]["url"], "https://owner.example/");

    let res = t.get("/api/admin/users/9999/audits", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

async fn signing_app(environment: Environment) -> TestApp {
    let mut config = relaxed_config();
    config.request_signing = true;
    config.environment = environment;
    spawn_with(config).await
}

#[tokio::test]
async fn signed_promotion_requires_valid_signature() {
    let t = signing_app(Environment::Development).await;
    let (_, admin) = t.admin("root@example.com").await;
    let (user_id, _) = t.signup("target@example.com").await;

    let res = t.send(promote_request(&admin, user_id)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "invalid_signature");

    let path = format!("/api/admin/promote/{user_id}");
    let ts = OffsetDateTime::now_utc().unix_timestamp().to_string();
    let secret = t.state.config.jwt.secret.as_bytes();

    let mut req = promote_request(&admin, user_id);
    let forged = sign(b"wrong-secret", &ts, "POST", &path, b"").unwrap();
    req.headers_mut().insert(SIGNATURE_HEADER, forged.parse().unwrap());
    req.headers_mut().insert(TIMESTAMP_HEADER, ts.parse().unwrap());
    assert_eq!(t.send(req).await.status, StatusCode::UNAUTHORIZED);

    let mut req = promote_request(&admin, user_id);
    let signature = sign(secret, &ts, "POST", &path, b"").unwrap();
    req.headers_mut().insert(SIGNATURE_HEADER, signature.parse().unwrap());
    req.headers_mut().insert(TIMESTAMP_HEADER, ts.parse().unwrap());
    let res = t.send(req).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
}

#[tokio::test]
async fn signature_bypass_only_outside_production() {
    let dev = signing_app(Environment::Development).await;
    let (_, admin) = dev.admin("root@example.com").await;
    let (user_id, _) = dev.signup("target@example.com").await;
    let mut req = promote_request(&admin, user_id);
    req.headers_mut().insert(SKIP_HEADER, "development".parse().unwrap());
    assert_eq!(dev.send(req).await.status, StatusCode::OK);

    let prod = signing_app(Environment::Production).await;
    let (_, admin) = prod.admin("root@example.com").await;
    let (user_id, _) = prod.signup("target@example.com").await;
    let mut req = promote_request(&admin, user_id);
    req.headers_mut().insert(SKIP_HEADER, "development".parse().unwrap());
    let res = prod.send(req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn critical_guard_blocks_after_limit() {
    let mut config = relaxed_config();
    config.rate_limits.critical = RateLimitPolicy::blocking(2, 10, 30);
    let t = spawn_with(config).await;
    let (_, admin) = t.admin("root@example.com").await;
    let (user_id, _) = t.signup("target@example.com").await;

    for _ in 0..2 {
        assert_eq!(t.send(promote_request(&admin, user_id)).await.status, StatusCode::OK);
    }
    let res = t.send(promote_request(&admin, user_id)).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.body["error"], "ip_blocked");
    assert!(res.headers.contains_key("retry-after"));

    // reads are not behind the critical guard
    assert_eq!(t.get("/api/admin/stats", Some(&admin)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_admin_parameters_use_json_errors() {
    let t = spawn().await;
    let (_, admin) = t.admin("root@example.com").await;

    let res = t.get("/api/admin/users/abc/audits", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "validation_error");

    let res = t.get("/api/admin/users?page=first", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "validation_error");

    let res = t
        .send(common::request(Method::POST, "/api/admin/promote/x", Some(&admin), None))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "validation_error");
}
