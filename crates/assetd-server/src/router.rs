use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with every assetd endpoint under `/api/v1`.
pub fn build_router(state: AppState, max_body_size: usize) -> Router {
    let api = Router::new()
        .route("/health", get(handler::health_handler))
        .route("/storage/create/:type", get(handler::create_storage))
        .route("/storage/destroy/:sid", get(handler::destroy_storage))
        .route("/storage/list/:sid", get(handler::list_storage))
        .route(
            "/storage/asset/:sid/*path",
            put(handler::put_asset).get(handler::get_asset),
        )
        .route("/buffer/create", get(handler::create_buffer))
        .route("/buffer/discard/:bid", get(handler::discard_buffer))
        .route("/buffer/append/:bid", put(handler::append_buffer))
        .route("/buffer/commit/:sid/:bid/*path", get(handler::commit_buffer));

    Router::new()
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
