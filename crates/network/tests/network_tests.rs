// crates/network/tests/network_tests.rs
//! Integration tests for network module

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use securgeek_network::{
    AssetResolver, Client, ClientConfig, HttpResourceValidator, NetworkError, ResourceValidator,
    Url,
};
use securgeek_resilience::RetryPolicy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn asset_body() -> Vec<u8> {
    (0..64u8).collect()
}

/// Serves `asset_body` and honours `Range: bytes=N-`
async fn ranged_asset(headers: HeaderMap) -> impl IntoResponse {
    let body = asset_body();
    let offset = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.trim_end_matches('-').parse::<usize>().ok());

    match offset {
        Some(start) => (
            StatusCode::PARTIAL_CONTENT,
            [(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, body.len() - 1, body.len()),
            )],
            body[start..].to_vec(),
        )
            .into_response(),
        None => body.into_response(),
    }
}

fn asset_router() -> Router {
    Router::new()
        .route("/audios/1.1.mp3", get(ranged_asset))
        .route("/audios/plain.mp3", get(|| async { asset_body() }))
}

async fn read_all(mut response: securgeek_network::RangedResponse) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = response.chunk().await.unwrap() {
        out.extend_from_slice(&chunk);
    }
    out
}

fn validator_for(addr: SocketAddr) -> HttpResourceValidator {
    let resolver = AssetResolver::with_base(&format!("http://{addr}")).unwrap();
    HttpResourceValidator::new(Client::new().unwrap(), resolver)
}

#[tokio::test]
async fn test_validator_accepts_reachable_resource() {
    let addr = spawn_server(asset_router()).await;
    let validator = validator_for(addr);

    assert!(validator.validate("/audios/1.1.mp3").await);
    assert!(
        validator
            .validate(&format!("http://{addr}/audios/1.1.mp3"))
            .await
    );
}

#[tokio::test]
async fn test_validator_rejects_missing_resource() {
    let addr = spawn_server(asset_router()).await;
    let validator = validator_for(addr);

    assert!(!validator.validate("/audios/9.9.mp3").await);
}

#[tokio::test]
async fn test_validator_rejects_refused_connection() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let validator = validator_for(addr);

    assert!(!validator.validate("/audios/1.1.mp3").await);
}

#[tokio::test]
async fn test_validator_rejects_relative_locator_without_base() {
    let validator = HttpResourceValidator::new(Client::new().unwrap(), AssetResolver::absolute_only());
    assert!(!validator.validate("/audios/1.1.mp3").await);
}

#[tokio::test]
async fn test_get_range_from_start_reads_whole_body() {
    let addr = spawn_server(asset_router()).await;
    let client = Client::new().unwrap();
    let url = Url::parse(&format!("http://{addr}/audios/1.1.mp3")).unwrap();

    let response = client.get_range(&url, 0).await.unwrap();
    assert_eq!(response.start(), 0);
    assert_eq!(response.total(), Some(64));
    assert!(!response.is_partial());
    assert_eq!(read_all(response).await, asset_body());
}

#[tokio::test]
async fn test_get_range_resumes_at_offset() {
    let addr = spawn_server(asset_router()).await;
    let client = Client::new().unwrap();
    let url = Url::parse(&format!("http://{addr}/audios/1.1.mp3")).unwrap();

    let response = client.get_range(&url, 40).await.unwrap();
    assert!(response.is_partial());
    assert_eq!(response.start(), 40);
    assert_eq!(response.total(), Some(64));
    assert_eq!(read_all(response).await, asset_body()[40..].to_vec());
}

#[tokio::test]
async fn test_get_range_without_server_support_starts_at_zero() {
    let addr = spawn_server(asset_router()).await;
    let client = Client::new().unwrap();
    let url = Url::parse(&format!("http://{addr}/audios/plain.mp3")).unwrap();

    let response = client.get_range(&url, 40).await.unwrap();
    assert!(!response.is_partial());
    assert_eq!(response.start(), 0);
    assert_eq!(read_all(response).await.len(), 64);
}

#[tokio::test]
async fn test_status_error_is_reported() {
    let addr = spawn_server(asset_router()).await;
    let client = Client::new().unwrap();
    let url = Url::parse(&format!("http://{addr}/missing")).unwrap();

    let err = client.get_range(&url, 0).await.err().unwrap();
    assert!(matches!(err, NetworkError::Status { status: 404, .. }));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/flaky",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                }
            }
        }),
    );
    let addr = spawn_server(router).await;

    let client = Client::with_config(ClientConfig {
        retry_policy: Some(
            RetryPolicy::new(3)
                .with_initial_delay(Duration::from_millis(5))
                .with_jitter(false),
        ),
        ..Default::default()
    })
    .unwrap();
    let url = Url::parse(&format!("http://{addr}/flaky")).unwrap();

    assert!(client.get(&url).await.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/gone",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::NOT_FOUND
            }
        }),
    );
    let addr = spawn_server(router).await;

    let client = Client::with_config(ClientConfig {
        retry_policy: Some(RetryPolicy::new(3).with_initial_delay(Duration::from_millis(5))),
        ..Default::default()
    })
    .unwrap();
    let url = Url::parse(&format!("http://{addr}/gone")).unwrap();

    assert!(client.head(&url).await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
