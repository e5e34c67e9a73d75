//! Share requests and the preview pipeline.
//!
//! A share link `/share/<image_id>/<...>` picks one of three source images,
//! composites it, stores the composite under `thumbnail/overlay_<image_id>`
//! and produces the data the page renderer needs.

use reqwest::Url;

use crate::compositor::{self, Layout};
use crate::error::ShareError;
use crate::state::AppState;

/// Source image shared by every referral link.
pub const REFER_SOURCE_KEY: &str = "logo_coverPhoto/peeq_logo.jpg";

/// Which kind of share link was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// A business profile; source is the business logo.
    Profile,
    /// A referral invite; source is the fixed app logo.
    Refer,
    /// Anything else; source is the content thumbnail.
    Thumbnail,
}

impl Category {
    /// Derive the category from the full request path.
    pub fn from_path(path: &str) -> Self {
        if path.contains("/profile/") {
            Self::Profile
        } else if path.contains("/refer/") {
            Self::Refer
        } else {
            Self::Thumbnail
        }
    }

    /// Canvas layout for this category.
    pub fn layout(self) -> Layout {
        match self {
            Self::Profile | Self::Refer => Layout::Square,
            Self::Thumbnail => Layout::Tall,
        }
    }
}

/// A parsed share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub image_id: String,
    pub category: Category,
}

impl ShareRequest {
    pub fn new(image_id: impl Into<String>, path: &str) -> Self {
        Self {
            image_id: image_id.into(),
            category: Category::from_path(path),
        }
    }

    /// Storage key of the source image.
    pub fn source_key(&self) -> String {
        match self.category {
            Category::Profile => format!("business_logos/{}.jpg", self.image_id),
            Category::Refer => REFER_SOURCE_KEY.to_string(),
            Category::Thumbnail => format!("thumbnail/{}.jpg", self.image_id),
        }
    }

    /// Storage key the composite is written to.
    pub fn overlay_key(&self) -> String {
        format!("thumbnail/overlay_{}", self.image_id)
    }
}

/// Everything the page renderer needs about one share link.
#[derive(Debug, Clone)]
pub struct SharePage {
    pub image_id: String,
    /// Read URL of the uploaded composite.
    pub image_url: Url,
    pub width: u32,
    pub height: u32,
}

/// Run the share pipeline: resolve, composite, upload, measure.
///
/// Every request regenerates and overwrites the composite. Any failure aborts
/// the remaining steps; nothing is uploaded unless compositing succeeded.
#[tracing::instrument(skip(state), fields(image_id = %request.image_id, category = ?request.category))]
pub async fn build_share_page(
    state: &AppState,
    request: &ShareRequest,
) -> Result<SharePage, ShareError> {
    let store = state.store.as_ref();

    let source_key = request.source_key();
    let source_url = store.read_url(&source_key).await?;
    tracing::debug!(key = %source_key, "source resolved");

    let composite = compositor::composite(store, &source_url, request.category.layout()).await?;
    tracing::debug!(
        width = composite.width(),
        height = composite.height(),
        bytes = composite.png().len(),
        "composite rendered"
    );

    let overlay_key = request.overlay_key();
    let image_url = store
        .put_object(&overlay_key, composite.into_png(), "image/png")
        .await?;

    // Measure what was actually stored, not what we think we uploaded.
    let stored = store.fetch(&image_url).await?;
    let (width, height) = compositor::probe_dimensions(&stored)?;

    tracing::info!(key = %overlay_key, width, height, "share composite stored");

    Ok(SharePage {
        image_id: request.image_id.clone(),
        image_url,
        width,
        height,
    })
}
