//! Shared fixtures for the integration tests.
//!
//! Each test binary compiles this module separately and uses a subset of it.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use kaspi_product_api::{
    app,
    error::FetchError,
    product::{decode_payload, UpstreamPayload},
    rate_limit::RateLimiter,
    upstream::ProductSource,
    AppState,
};
use serde_json::Value;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tower::ServiceExt;

pub const WINDOW: Duration = Duration::from_secs(15 * 60);

pub enum Reply {
    Body(Value),
    Fail(FetchError),
    Panic,
}

/// In-memory upstream that counts how often it is asked.
pub struct StubSource {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply, calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for StubSource {
    async fn fetch(&self, product_id: &str) -> Result<UpstreamPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Body(v) => Ok(decode_payload(v.to_string().as_bytes()).expect("stub body is JSON")),
            Reply::Fail(e) => Err(e.clone()),
            Reply::Panic => panic!("stub exploded while fetching {product_id}"),
        }
    }
}

pub fn build_app(source: Arc<dyn ProductSource>, max: u64) -> Router {
    app(AppState::new(source, Arc::new(RateLimiter::new(max, WINDOW))))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn get_from(app: &Router, path: &str, client: [u8; 4]) -> TestResponse {
    let req = Request::builder()
        .uri(path)
        .header("origin", "https://shop.example")
        .extension(ConnectInfo(SocketAddr::from((client, 51234))))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse { status, headers, body }
}

pub async fn get(app: &Router, path: &str) -> TestResponse {
    get_from(app, path, [127, 0, 0, 1]).await
}
