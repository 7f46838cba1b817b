//! Dashboard router: live tail, message fetch and static assets.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use super::{message, tail, AppContext};

pub const NOT_FOUND_BODY: &str = "404\n";

/// Build the dashboard router.
///
/// - `GET /ws`: live tail
/// - `GET /message/{id}`: full message bytes
/// - `GET /`: `index.html` from the assets directory
/// - `GET /js/*`: files under `js/` in the assets directory
pub fn router(ctx: Arc<AppContext>) -> Router {
    let assets = ctx.assets_dir.clone();

    Router::new()
        .route("/ws", get(tail::handle_ws))
        .route("/message/{id}", get(message::handle_message))
        .route_service("/", ServeFile::new(assets.join("index.html")))
        .nest_service("/js", ServeDir::new(assets.join("js")))
        .fallback(not_found)
        .with_state(ctx)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}
