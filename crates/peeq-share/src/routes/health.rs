//! Liveness probe.
//!
//! Never gated by the share auth policy and never touches storage, so a slow
//! bucket cannot fail load balancer checks.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Liveness {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
    auth: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.config.storage.name(),
        auth: state.config.auth.name(),
    })
}
