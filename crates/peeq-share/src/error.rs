//! Error types for the share service.
//!
//! Pipeline failures never reach the client in detail: storage paths and
//! decoder messages are logged, the response is a bare 500.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::compositor::CompositeError;
use crate::storage::StorageError;

/// Body of every 500 response.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Share service error type.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// The request failed the configured authorization policy.
    #[error("unauthorized")]
    Unauthorized,

    /// Blob store lookup, upload or download failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Decoding or compositing an image failed.
    #[error("composite error: {0}")]
    Composite(#[from] CompositeError),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let text_plain = HeaderValue::from_static("text/plain; charset=utf-8");

        match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [
                    (header::CONTENT_TYPE, text_plain),
                    (header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer")),
                ],
                "Unauthorized",
            )
                .into_response(),
            Self::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                internal_error(text_plain)
            }
            Self::Composite(err) => {
                tracing::error!(error = %err, "composite error");
                internal_error(text_plain)
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                internal_error(text_plain)
            }
        }
    }
}

fn internal_error(content_type: HeaderValue) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, content_type)],
        INTERNAL_ERROR_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ShareError::Storage(StorageError::NotFound("thumbnail/a.jpg".to_string()));
        assert_eq!(
            err.to_string(),
            "storage error: object not found: thumbnail/a.jpg"
        );

        let err = ShareError::Composite(CompositeError::Decode("bad magic".to_string()));
        assert_eq!(
            err.to_string(),
            "composite error: image decode failed: bad magic"
        );
    }

    #[test]
    fn pipeline_errors_are_500() {
        let errors = [
            ShareError::Storage(StorageError::NotFound("k".to_string())),
            ShareError::Storage(StorageError::Upstream("timeout".to_string())),
            ShareError::Composite(CompositeError::Decode("bad".to_string())),
            ShareError::Internal(anyhow::anyhow!("boom")),
        ];
        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                "text/plain; charset=utf-8"
            );
        }
    }

    #[test]
    fn unauthorized_is_401() {
        let response = ShareError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
