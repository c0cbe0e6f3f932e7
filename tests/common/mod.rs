#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use cybak::{
    app::build_app,
    auth::repo_types::User,
    config::{AppConfig, RateLimitPolicy},
    db,
    state::AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "Valid123";

pub struct TestApp {
    pub state: AppState,
    pub app: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Test configuration with signup/login limits high enough not to interfere.
pub fn relaxed_config() -> AppConfig {
    let mut config = AppConfig::for_tests();
    config.rate_limits.signup = RateLimitPolicy::per_minute(1_000);
    config.rate_limits.login = RateLimitPolicy::per_minute(1_000);
    config
}

pub async fn spawn() -> TestApp {
    spawn_with(relaxed_config()).await
}

pub async fn spawn_with(config: AppConfig) -> TestApp {
    let pool = db::connect(&config.database_url).await.expect("connect");
    db::migrate(&pool).await.expect("migrate");
    let state = AppState::from_parts(pool, Arc::new(config)).expect("state");
    let app = build_app(state.clone());
    TestApp { state, app }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => {
            let body = body.to_string();
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.app.clone().oneshot(req).await.expect("infallible");
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    /// Registers `email` with the shared test password; returns (id, token).
    pub async fn signup(&self, email: &str) -> (i64, String) {
        let res = self
            .post(
                "/api/auth/signup",
                None,
                json!({ "email": email, "password": PASSWORD, "firstName": "Test", "lastName": "User" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);
        let id = res.body["user"]["id"].as_i64().unwrap();
        let token = res.body["token"].as_str().unwrap().to_string();
        (id, token)
    }

    pub async fn admin(&self, email: &str) -> (i64, String) {
        let (id, token) = self.signup(email).await;
        assert!(User::promote(&self.state.db, id).await.unwrap());
        (id, token)
    }

    pub async fn delete_user(&self, id: i64) {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.state.db)
            .await
            .unwrap();
    }
}
