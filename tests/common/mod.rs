#![allow(dead_code)]

use axum::{
    Router,
    body::{self, Body},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for `oneshot`

use admin_portal::test_helpers::{TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response should be json")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let res = app.clone().oneshot(request).await.expect("router response");
    let status = res.status();
    let headers = res.headers().clone();
    let body = body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("GET").uri(uri), token)
        .body(Body::empty())
        .expect("request")
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method("DELETE").uri(uri), token)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, payload: Value) -> Request<Body> {
    with_token(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

pub fn form_request(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .expect("request")
}

fn with_token(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn api_login(app: &Router, email: &str, password: &str) -> TestResponse {
    send(
        app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

pub async fn token_for(app: &Router, email: &str, password: &str) -> String {
    let res = api_login(app, email, password).await;
    assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.text());
    res.json()["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

pub async fn admin_token(app: &Router) -> String {
    token_for(app, TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD).await
}
