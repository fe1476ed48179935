#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use serde_json::Value;
use tally_db::DbConfig;
use tally_server::boot::{Bootstrapped, bootstrap};
use tally_server::config::ServerConfig;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "root@tally.local";
pub const ADMIN_PASSWORD: &str = "root-password";

pub fn config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".parse().expect("bind"),
        db: DbConfig::in_memory(),
        jwt_key_path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../tally-auth/testdata/signing_key.pem"),
        access_ttl_secs: 3600,
        refresh_ttl_secs: 7200,
        jwt_issuer: "tally".into(),
        admin_email: ADMIN_EMAIL.into(),
        admin_password: ADMIN_PASSWORD.into(),
        admin_role: "admin".into(),
        admin_group: "administrators".into(),
        admin_cache_path: None,
        store_timeout: Duration::from_secs(3),
        min_password_length: 8,
    }
}

pub async fn boot() -> Bootstrapped {
    bootstrap(&config()).await.expect("bootstrap")
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Send a request and return the status with the decoded body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json")
    };
    (status, value)
}

pub async fn sign_in(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/signin",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, 200, "sign in failed: {body}");
    body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Register an identity and return its access token and id.
pub async fn sign_up(app: &Router, name: &str) -> (String, String) {
    let email = format!("{}@tally.local", name.to_lowercase());
    let (status, body) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(serde_json::json!({
            "name": name,
            "second_name": "Tester",
            "email": email,
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, 200, "sign up failed: {body}");
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let (_, me) = send(app, "GET", "/user/me", Some(&token), None).await;
    let id = me["data"]["id"].as_str().expect("id").to_string();
    (token, id)
}
