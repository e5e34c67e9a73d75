//! Share page handler.
//!
//! Handles `GET /share/{image_id}` and `GET /share/{image_id}/{*rest}`. The
//! category comes from the whole path (`/profile/`, `/refer/`, or neither).

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::ShareError;
use crate::render;
use crate::share::{ShareRequest, build_share_page};
use crate::state::AppState;

/// Path parameters shared by both share routes.
#[derive(Debug, Deserialize)]
pub struct SharePath {
    image_id: String,
}

/// Handle a share link.
///
/// Any failure becomes a bare 500; details are only logged.
pub async fn share_handler(
    State(state): State<AppState>,
    Path(SharePath { image_id }): Path<SharePath>,
    uri: Uri,
) -> Result<Response, ShareError> {
    let request = ShareRequest::new(image_id, uri.path());

    let page = build_share_page(&state, &request).await?;
    let markup = render::render_share_page(&page, &state.config);

    Ok(html_response(markup.into_string()))
}

fn html_response(html: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    // The composite is regenerated per request; don't let caches pin a stale page.
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    (StatusCode::OK, headers, html).into_response()
}
