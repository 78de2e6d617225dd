//! Request handlers. Each one parses its inputs, runs the blocking core call
//! on the blocking pool and maps the outcome to a response.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;

use assetd_manager::StoragesManager;
use assetd_storage::AssetReader;
use assetd_types::{AssetEntry, AssetOpts, StorageId, StorageType};
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use futures_util::TryStreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::error::ApiError;

/// Shared handle on the core, injected into every handler.
pub type AppState = Arc<StoragesManager>;

/// Header carrying the asset's permission bits on reads.
pub const MODE_HEADER: &str = "x-asset-mode";

fn asset_opts(params: &HashMap<String, String>) -> Result<AssetOpts, ApiError> {
    match params.get("mode").filter(|m| !m.is_empty()) {
        Some(raw) => AssetOpts::parse_mode(raw)
            .map(AssetOpts::with_mode)
            .map_err(|e| ApiError::bad_request(e.to_string())),
        None => Ok(AssetOpts::default()),
    }
}

/// Size of each chunk sent while streaming an asset out.
const READ_CHUNK: usize = 64 * 1024;

/// Blocking reader over a request body, for use on the blocking pool.
fn body_reader(body: Body) -> impl Read + Send + 'static {
    let stream = TryStreamExt::map_err(body.into_data_stream(), io::Error::other);
    SyncIoBridge::new(StreamReader::new(stream))
}

/// Response body fed from `reader` on the blocking pool.
///
/// The reader, and with it any vault object it holds open, is dropped once
/// the last chunk is sent or the client goes away.
fn reader_body(mut reader: AssetReader) -> Body {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(4);
    spawn_blocking(move || {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let chunk = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = chunk.is_err();
            if tx.blocking_send(chunk).is_err() || failed {
                break;
            }
        }
        drop(reader);
        drop(tx);
    });
    Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

fn asset_path(raw: &str) -> Result<String, ApiError> {
    let path = raw.trim_start_matches('/');
    if path.is_empty() {
        return Err(ApiError::bad_request("empty asset path"));
    }
    Ok(path.to_string())
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": "assetd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_storage(
    State(manager): State<AppState>,
    Path(type_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let storage_type: StorageType = type_name.parse().unwrap_or_default();
    let storage = spawn_blocking(move || manager.create(storage_type)).await??;
    Ok(Json(json!({ "sid": storage.id() })))
}

pub async fn destroy_storage(
    State(manager): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = StorageId::new(sid);
    let destroyed = id.clone();
    spawn_blocking(move || manager.destroy(&id)).await??;
    Ok(Json(json!({ "sid": destroyed })))
}

pub async fn list_storage(
    State(manager): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<Vec<AssetEntry>>, ApiError> {
    let id = StorageId::new(sid);
    let entries = spawn_blocking(move || -> Result<_, ApiError> {
        Ok(manager.get(&id)?.list()?)
    })
    .await??;
    Ok(Json(entries))
}

pub async fn put_asset(
    State(manager): State<AppState>,
    Path((sid, path)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let opts = asset_opts(&params)?;
    let path = asset_path(&path)?;
    let id = StorageId::new(sid);
    let mut reader = body_reader(body);
    spawn_blocking(move || -> Result<_, ApiError> {
        let storage = manager.get(&id)?;
        storage.create_asset(&path, &mut reader, opts)?;
        Ok(())
    })
    .await??;
    Ok(StatusCode::CREATED)
}

pub async fn get_asset(
    State(manager): State<AppState>,
    Path((sid, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let path = asset_path(&path)?;
    let id = StorageId::new(sid);
    let reader = spawn_blocking(move || -> Result<_, ApiError> {
        Ok(manager.get(&id)?.read_asset(&path)?)
    })
    .await??;
    let opts = reader.opts();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::HeaderName::from_static(MODE_HEADER), format!("0{:o}", opts.mode)),
        ],
        reader_body(reader),
    )
        .into_response())
}

pub async fn create_buffer(State(manager): State<AppState>) -> Result<Json<Value>, ApiError> {
    let bid = spawn_blocking(move || manager.buffers().create()).await??;
    Ok(Json(json!({ "sid": bid })))
}

pub async fn discard_buffer(
    State(manager): State<AppState>,
    Path(bid): Path<String>,
) -> Result<StatusCode, ApiError> {
    spawn_blocking(move || manager.buffers().discard(&bid)).await??;
    Ok(StatusCode::OK)
}

pub async fn append_buffer(
    State(manager): State<AppState>,
    Path(bid): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let appended = spawn_blocking(move || manager.buffers().append(&bid, &mut body.as_ref())).await??;
    Ok(Json(json!({ "appended": appended })))
}

pub async fn commit_buffer(
    State(manager): State<AppState>,
    Path((sid, bid, path)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<StatusCode, ApiError> {
    let opts = asset_opts(&params)?;
    let path = asset_path(&path)?;
    let id = StorageId::new(sid);
    spawn_blocking(move || manager.create_storage_asset_from_buffer(&id, &path, &bid, opts)).await??;
    Ok(StatusCode::CREATED)
}
