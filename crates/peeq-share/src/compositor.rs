//! Overlay compositing for share preview images.
//!
//! Layout:
//! - Square (450x450): the source stretched to fill the canvas, nothing else
//! - Tall (450x800): the source stretched to fill the canvas, a 50% black
//!   layer over everything, and the play badge stretched to 150x150 in the
//!   exact center
//!
//! Output is always PNG.

use std::io::Cursor;

use bytes::Bytes;
use reqwest::Url;
use resvg::tiny_skia::{
    Color, ColorU8, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::storage::{BlobStore, StorageError};

/// Canvas size for square layouts.
pub const SQUARE_CANVAS: (u32, u32) = (450, 450);

/// Canvas size for tall layouts.
pub const TALL_CANVAS: (u32, u32) = (450, 800);

/// Edge length of the centered badge.
pub const BADGE_SIZE: u32 = 150;

/// Storage key of the play badge drawn on tall layouts.
pub const BADGE_KEY: &str = "logo_coverPhoto/images.png";

/// Opacity of the black dimming layer.
const DIM_OPACITY: f32 = 0.5;

/// Errors raised while building a composite.
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    /// Fetching the source or badge failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Fetched bytes are not a decodable image.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// The canvas could not be drawn.
    #[error("render failed: {0}")]
    Render(String),

    /// The canvas could not be encoded as PNG.
    #[error("png encode failed: {0}")]
    Encode(String),

    /// The blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    Task(String),
}

/// Canvas layout of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Square,
    Tall,
}

impl Layout {
    /// Canvas `(width, height)` in pixels.
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            Self::Square => SQUARE_CANVAS,
            Self::Tall => TALL_CANVAS,
        }
    }

    /// Top-left corner of the badge on this layout's canvas.
    pub fn badge_origin(self) -> (u32, u32) {
        let (width, height) = self.canvas_size();
        ((width - BADGE_SIZE) / 2, (height - BADGE_SIZE) / 2)
    }
}

/// A rendered composite image.
#[derive(Debug, Clone)]
pub struct Composite {
    png: Bytes,
    width: u32,
    height: u32,
}

impl Composite {
    pub fn png(&self) -> &Bytes {
        &self.png
    }

    pub fn into_png(self) -> Bytes {
        self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Fetch the source (and, for tall layouts, the badge) and composite them.
pub async fn composite(
    store: &dyn BlobStore,
    source_url: &Url,
    layout: Layout,
) -> Result<Composite, CompositeError> {
    let source = store.fetch(source_url).await?;

    let badge = match layout {
        Layout::Square => None,
        Layout::Tall => {
            let badge_url = store.read_url(BADGE_KEY).await?;
            Some(store.fetch(&badge_url).await?)
        }
    };

    tokio::task::spawn_blocking(move || render_composite(&source, layout, badge.as_deref()))
        .await
        .map_err(|e| CompositeError::Task(e.to_string()))?
}

/// Draw a composite from encoded source and badge images.
///
/// `badge` is required for [`Layout::Tall`] and ignored for [`Layout::Square`].
pub fn render_composite(
    source: &[u8],
    layout: Layout,
    badge: Option<&[u8]>,
) -> Result<Composite, CompositeError> {
    let (width, height) = layout.canvas_size();
    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| CompositeError::Render("failed to create canvas".to_string()))?;

    let source = decode_pixmap(source)?;
    draw_stretched(&mut canvas, &source, (0, 0), (width, height));

    if layout == Layout::Tall {
        let badge = badge.ok_or_else(|| {
            CompositeError::Render("tall layout requires a badge image".to_string())
        })?;
        let badge = decode_pixmap(badge)?;

        dim(&mut canvas)?;
        draw_stretched(
            &mut canvas,
            &badge,
            layout.badge_origin(),
            (BADGE_SIZE, BADGE_SIZE),
        );
    }

    let png = canvas
        .encode_png()
        .map_err(|e| CompositeError::Encode(e.to_string()))?;

    Ok(Composite {
        png: Bytes::from(png),
        width,
        height,
    })
}

/// Read the pixel dimensions of an encoded image without decoding it fully.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), CompositeError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompositeError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| CompositeError::Decode(e.to_string()))
}

/// Decode any supported image format into a premultiplied pixmap.
fn decode_pixmap(bytes: &[u8]) -> Result<Pixmap, CompositeError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| CompositeError::Decode(e.to_string()))?
        .to_rgba8();

    let mut pixmap = Pixmap::new(rgba.width(), rgba.height()).ok_or_else(|| {
        CompositeError::Decode(format!(
            "unsupported image size {}x{}",
            rgba.width(),
            rgba.height()
        ))
    })?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    Ok(pixmap)
}

/// Draw `image` scaled to exactly `size` at `origin`, ignoring aspect ratio.
fn draw_stretched(canvas: &mut Pixmap, image: &Pixmap, origin: (u32, u32), size: (u32, u32)) {
    let sx = size.0 as f32 / image.width() as f32;
    let sy = size.1 as f32 / image.height() as f32;

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };

    canvas.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, origin.0 as f32, origin.1 as f32),
        None,
    );
}

/// Cover the whole canvas with black at [`DIM_OPACITY`].
fn dim(canvas: &mut Pixmap) -> Result<(), CompositeError> {
    let rect = Rect::from_xywh(0.0, 0.0, canvas.width() as f32, canvas.height() as f32)
        .ok_or_else(|| CompositeError::Render("invalid canvas rect".to_string()))?;
    let color = Color::from_rgba(0.0, 0.0, 0.0, DIM_OPACITY)
        .ok_or_else(|| CompositeError::Render("invalid dim color".to_string()))?;

    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;

    canvas.fill_rect(rect, &paint, Transform::identity(), None);
    Ok(())
}
