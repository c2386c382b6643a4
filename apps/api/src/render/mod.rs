// Print-and-cut PDF rendering.
// CPU-bound (image decode, Lanczos resize, JPEG encode): callers run `build_pdf`
// inside tokio::task::spawn_blocking.

pub mod pdf;
pub mod sheet;

use bytes::Bytes;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::render::pdf::{assemble_pdf, PdfPage};
use crate::render::sheet::{render_back_sheet, render_front_sheet, sheet_ranges, PPI};

/// Largest accepted `extend_corners`, in pixels at 300 PPI.
pub const MAX_EXTEND_CORNERS: u32 = 60;
pub const DEFAULT_EXTEND_CORNERS: u32 = 10;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no cards to render")]
    NoCards,

    #[error("{backs} back images supplied for {fronts} fronts")]
    MismatchedBacks { fronts: usize, backs: usize },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("render task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub extend_corners: u32,
    pub jpeg_quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extend_corners: DEFAULT_EXTEND_CORNERS,
            jpeg_quality: 90,
        }
    }
}

/// Builds the print-and-cut PDF.
///
/// Pages alternate front sheet, back sheet. `backs[i]` is the back of
/// `fronts[i]`; `None` falls back to `generic_back`, or a blank slot.
pub fn build_pdf(
    fronts: &[Bytes],
    backs: &[Option<Bytes>],
    generic_back: Option<&[u8]>,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    if fronts.is_empty() {
        return Err(RenderError::NoCards);
    }
    if backs.len() != fronts.len() {
        return Err(RenderError::MismatchedBacks {
            fronts: fronts.len(),
            backs: backs.len(),
        });
    }

    let mut pages = Vec::new();
    for (sheet, range) in sheet_ranges(fronts.len()).enumerate() {
        let number = sheet + 1;
        debug!("Rendering sheet {number} (cards {range:?})");

        let front = render_front_sheet(&fronts[range.clone()], options.extend_corners);
        pages.push(encode_page(
            &front,
            options.jpeg_quality,
            format!("ProxyForge | Page {number} front | Print at 100% scale, no fit-to-page"),
        )?);

        let back = render_back_sheet(&backs[range], generic_back, options.extend_corners);
        pages.push(encode_page(
            &back,
            options.jpeg_quality,
            format!("ProxyForge | Page {number} back  | Print at 100% scale, no fit-to-page"),
        )?);
    }

    assemble_pdf(pages)
}

fn encode_page(page: &RgbImage, quality: u8, label: String) -> Result<PdfPage, RenderError> {
    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
        encoder.set_pixel_density(PixelDensity::dpi(PPI as u16));
        encoder.encode_image(page)?;
    }

    Ok(PdfPage {
        jpeg,
        width_px: page.width(),
        height_px: page.height(),
        label,
    })
}
