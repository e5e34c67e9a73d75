//! Peeq Share - link preview pages for shared images.
//!
//! Serves `/share/{image_id}/...` links. Each request fetches the shared image
//! from object storage, composites a preview (a dimmed canvas with a centered
//! play badge for tall images), stores the composite back, and returns an HTML
//! page whose Open Graph tags point at it. The page then boots the client app.
//!
//! # Architecture
//!
//! - **Storage**: [`storage::BlobStore`] resolves keys to readable URLs and
//!   accepts uploads (Cloud Storage or in-memory)
//! - **Compositor**: draws the overlay with tiny-skia and encodes PNG
//! - **Render**: builds the page with maud (compile-time templates)
//! - **Routes**: axum router, optional bearer-token authorization
//!
//! # URL Pattern
//!
//! ```text
//! GET /share/{image_id}/profile/...  -> business_logos/{image_id}.jpg, 450x450
//! GET /share/{image_id}/refer/...    -> logo_coverPhoto/peeq_logo.jpg, 450x450
//! GET /share/{image_id}/...          -> thumbnail/{image_id}.jpg, 450x800 + badge
//! ```
//!
//! The composite is written to `thumbnail/overlay_{image_id}` on every request.

pub mod auth;
pub mod compositor;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod share;
pub mod state;
pub mod storage;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
