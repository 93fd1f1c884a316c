mod common;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use kaspi_product_api::{
    error::FetchError,
    upstream::{KaspiClient, ProductSource, BROWSER_USER_AGENT},
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;

type Seen = Arc<Mutex<Vec<(String, HeaderMap)>>>;

/// Starts a fake offer service on an ephemeral port and returns its base URL.
async fn spawn_upstream(seen: Seen) -> String {
    let app = Router::new()
        .route(
            "/offers/{id}",
            get(move |Path(id): Path<String>, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    seen.lock().await.push((id.clone(), headers));
                    match id.as_str() {
                        "missing" => StatusCode::NOT_FOUND.into_response(),
                        "html" => "<html>captcha</html>".into_response(),
                        "slow" => {
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            Json(json!({})).into_response()
                        }
                        _ => Json(json!({
                            "offer": { "price": 5000, "available": true },
                            "product": { "name": "Phone" }
                        }))
                        .into_response(),
                    }
                }
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/offers")
}

async fn client_for(timeout: Duration) -> (KaspiClient, Seen) {
    let seen: Seen = Arc::default();
    let base = spawn_upstream(seen.clone()).await;
    (KaspiClient::new(base, timeout).unwrap(), seen)
}

#[tokio::test]
async fn sends_fixed_headers_and_substitutes_id() {
    let (client, seen) = client_for(Duration::from_secs(10)).await;

    let payload = client.fetch("12345").await.unwrap();

    assert_eq!(payload.product.unwrap().name.as_deref(), Some("Phone"));
    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    let (id, headers) = &seen[0];
    assert_eq!(id, "12345");
    assert_eq!(headers["user-agent"], BROWSER_USER_AGENT);
    assert_eq!(headers["accept"], "application/json");
    assert_eq!(headers["referer"], "https://kaspi.kz/");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (client, _) = client_for(Duration::from_secs(10)).await;

    let err = client.fetch("missing").await.unwrap_err();

    assert_eq!(err, FetchError::Status(404));
    assert_eq!(err.to_string(), "Request failed with status code 404");
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let (client, _) = client_for(Duration::from_secs(10)).await;

    let err = client.fetch("html").await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let (client, _) = client_for(Duration::from_millis(100)).await;

    let err = client.fetch("slow").await.unwrap_err();

    assert_eq!(err, FetchError::Timeout(100));
    assert_eq!(err.to_string(), "timeout of 100ms exceeded");
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    let client = KaspiClient::new(format!("http://{addr}/offers"), Duration::from_secs(2)).unwrap();

    let err = client.fetch("1").await.unwrap_err();

    match err {
        FetchError::Transport(details) => assert!(!details.is_empty()),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_end_to_end() {
    let (client, seen) = client_for(Duration::from_secs(10)).await;
    let app = common::build_app(Arc::new(client), 100);

    let resp = common::get(&app, "/api/product/12345").await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["name"], json!("Phone"));
    assert_eq!(body["data"]["price"], json!("5000 ₸"));
    assert_eq!(body["data"]["availability"], json!("В наличии"));
    assert_eq!(seen.lock().await.len(), 1);
}
