//! HTTP request boundary for assetd.
//!
//! A thin axum adapter over [`StoragesManager`](assetd_manager::StoragesManager):
//! handlers parse URL parameters, run the blocking core call on the blocking
//! pool, and translate error kinds to statuses (not found 404, conflict 409,
//! invalid input 400, anything else 500).

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::AppState;
pub use server::AssetServer;

#[cfg(test)]
mod tests {
    use super::*;
    use assetd_manager::ManagerConfig;
    use assetd_types::ObjectId;
    use axum::body::{to_bytes, Body, Bytes};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn test_server(dir: &std::path::Path) -> AssetServer {
        AssetServer::new(ServerConfig {
            storage: ManagerConfig::prefixed(dir),
            ..ServerConfig::default()
        })
        .unwrap()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &'static [u8]) -> (StatusCode, Bytes) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    async fn create_storage(app: &Router, kind: &str) -> String {
        let (status, body) = send(app, Method::GET, &format!("/api/v1/storage/create/{kind}"), b"").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        json["sid"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_server(dir.path()).router();
        let (status, _) = send(&app, Method::GET, "/api/v1/health", b"").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn asset_put_get_list_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_server(dir.path()).router();
        let sid = create_storage(&app, "hashed").await;
        let asset = format!("/api/v1/storage/asset/{sid}/docs/a.txt");

        let (status, _) = send(&app, Method::PUT, &format!("{asset}?mode=0600"), b"hello").await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, Method::PUT, &asset, b"again").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(Request::builder().uri(&asset).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[handler::MODE_HEADER], "0600");
        assert_eq!(&to_bytes(response.into_body(), usize::MAX).await.unwrap()[..], b"hello");

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/storage/list/{sid}"), b"").await;
        assert_eq!(status, StatusCode::OK);
        let listed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed[0]["path"], "docs/a.txt");
        assert_eq!(listed[0]["properties"]["mode"], "384");

        let (status, _) = send(&app, Method::GET, &format!("/api/v1/storage/asset/{sid}/missing"), b"").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, &format!("/api/v1/storage/destroy/{sid}"), b"").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/storage/list/{sid}"), b"").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn large_assets_stream_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let app = server.router();
        let sid = create_storage(&app, "hashed").await;
        let asset = format!("/api/v1/storage/asset/{sid}/big.bin");

        let payload: Vec<u8> = (0..300 * 1024).map(|i| (i % 251) as u8).collect();
        let chunks: Vec<Result<Bytes, std::io::Error>> = payload
            .chunks(7 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri(&asset)
                    .body(Body::from_stream(futures_util::stream::iter(chunks)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let object = ObjectId::from_bytes(&payload);
        let vault = server.manager().vault();
        assert_eq!(vault.refs_count(&object), 1);

        // The object stays open while the download is in flight.
        let response = app
            .clone()
            .oneshot(Request::builder().uri(&asset).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(vault.is_open(&object));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), payload.len());
        assert!(body[..] == payload[..]);
        assert!(!vault.is_open(&object));
    }

    #[tokio::test]
    async fn bad_requests_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_server(dir.path()).router();
        let sid = create_storage(&app, "filesystem").await;

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/storage/asset/{sid}/a?mode=rwx"),
            b"x",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/storage/asset/{sid}/a/../../escape"),
            b"x",
        )
        .await;
        assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/api/v1/storage/destroy/unknown", b"").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn buffer_staging_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_server(dir.path()).router();
        let sid = create_storage(&app, "default").await;

        let (status, body) = send(&app, Method::GET, "/api/v1/buffer/create", b"").await;
        assert_eq!(status, StatusCode::OK);
        let bid = serde_json::from_slice::<Value>(&body).unwrap()["sid"]
            .as_str()
            .unwrap()
            .to_string();

        for chunk in [&b"123"[..], b"456", b"789", b"0"] {
            let (status, _) = send(&app, Method::PUT, &format!("/api/v1/buffer/append/{bid}"), chunk).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/v1/buffer/commit/{sid}/{bid}/staged/file?mode=0o640"),
            b"",
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/storage/asset/{sid}/staged/file"), b"").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"1234567890");

        let (status, _) = send(&app, Method::GET, &format!("/api/v1/buffer/discard/{bid}"), b"").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::PUT, &format!("/api/v1/buffer/append/{bid}"), b"x").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
