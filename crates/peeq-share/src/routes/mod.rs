//! Route definitions for the share service.
//!
//! ## Routes
//!
//! - `GET /health` - Liveness, backend and auth policy (JSON)
//! - `GET /robots.txt` - Crawler instructions
//! - `GET /share/{image_id}[/...]` - Share page with composited OG image
//! - everything else - Client application files from `PEEQ_STATIC_DIR`

mod health;
mod share;

use axum::Router;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::services::ServeDir;

use crate::auth;
use crate::state::AppState;

/// Build the complete share service router.
pub fn router(state: AppState) -> Router {
    let share_routes = Router::new()
        .route("/share/{image_id}", get(share::share_handler))
        .route("/share/{image_id}/", get(share::share_handler))
        .route("/share/{image_id}/{*rest}", get(share::share_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authorize,
        ));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(robots_txt))
        .merge(share_routes);

    let app = match &state.config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.with_state(state)
}

/// Serve robots.txt allowing all crawlers.
///
/// Share pages exist to be fetched by link-preview crawlers.
async fn robots_txt() -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        "User-agent: *\nAllow: /\n",
    )
}
