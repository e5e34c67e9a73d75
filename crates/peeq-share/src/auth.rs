//! Request authorization for share routes.
//!
//! Share links are public by default. Setting `PEEQ_AUTH_TOKENS` switches the
//! share routes to bearer-token authorization:
//! ```text
//! Authorization: Bearer <token>
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ShareError;
use crate::state::AppState;

/// Authorization policy evaluated before a share request is routed.
#[derive(Debug, Clone, Default)]
pub enum AuthPolicy {
    /// Every request is allowed.
    #[default]
    Open,
    /// Requests must carry one of these bearer tokens.
    BearerToken(Arc<HashSet<String>>),
}

impl AuthPolicy {
    /// Build a policy from configured tokens. Blank entries are ignored; no
    /// tokens at all yields [`AuthPolicy::Open`].
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            Self::Open
        } else {
            Self::BearerToken(Arc::new(tokens))
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::BearerToken(_) => "bearer",
        }
    }

    /// Check the request headers against this policy.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ShareError> {
        let Self::BearerToken(tokens) = self else {
            return Ok(());
        };

        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        match token {
            Some(token) if tokens.contains(token) => Ok(()),
            Some(_) => {
                tracing::debug!("invalid share token");
                Err(ShareError::Unauthorized)
            }
            None => {
                tracing::debug!("missing or malformed authorization header");
                Err(ShareError::Unauthorized)
            }
        }
    }
}

/// Middleware applying the configured [`AuthPolicy`].
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ShareError> {
    state.config.auth.check(request.headers())?;
    Ok(next.run(request).await)
}

/// Mint a random 64-character hex token suitable for `PEEQ_AUTH_TOKENS`.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
