//! Chart rendering.
//!
//! - `raster`: static PNG charts embedded in the workbook (Plotters)
//! - `interactive`: self-contained HTML documents linked from the workbook
//! - `ascii`: quick terminal plots for the `returns` command
//!
//! The pipeline only sees the [`ChartRenderer`] trait, so a different backend
//! can be swapped in without touching layout or publishing code.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};

use crate::domain::ReturnSeries;
use crate::error::AppError;

pub mod ascii;
pub mod interactive;
pub mod raster;

pub use interactive::HtmlChartRenderer;
pub use raster::PlottersRenderer;

/// An encoded PNG plus the size it is shown at.
#[derive(Clone, PartialEq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    /// Display scale applied when the image is embedded.
    pub scale: f64,
}

impl ChartImage {
    /// Wrap PNG bytes, reading the pixel size from the PNG header.
    pub fn from_png(png: Vec<u8>, scale: f64) -> Result<Self, AppError> {
        let (width_px, height_px) = ImageReader::with_format(Cursor::new(&png[..]), ImageFormat::Png)
            .into_dimensions()
            .map_err(|e| AppError::render(format!("Captured chart is not a readable PNG: {e}")))?;
        Ok(Self {
            png,
            width_px,
            height_px,
            scale,
        })
    }

    pub fn display_height(&self) -> f64 {
        self.height_px as f64 * self.scale
    }
}

impl std::fmt::Debug for ChartImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartImage")
            .field("bytes", &self.png.len())
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale", &self.scale)
            .finish()
    }
}

/// What to draw: the retained window of one instrument.
#[derive(Debug, Clone, Copy)]
pub struct ChartRequest<'a> {
    pub window: &'a ReturnSeries,
    pub title: &'a str,
    /// Position of the instrument in the run; picks the line color.
    pub palette_index: usize,
}

/// Chart backend used by the pipeline.
pub trait ChartRenderer {
    /// Render the static chart embedded next to the table.
    fn render_static(&self, request: &ChartRequest<'_>) -> Result<ChartImage, AppError>;

    /// Write a self-contained interactive document to `path`.
    fn render_interactive(&self, request: &ChartRequest<'_>, path: &Path) -> Result<(), AppError>;
}

/// Plotters for the PNG, hand-built SVG/HTML for the document.
#[derive(Debug, Clone, Default)]
pub struct DefaultRenderer {
    pub raster: PlottersRenderer,
    pub html: HtmlChartRenderer,
}

impl ChartRenderer for DefaultRenderer {
    fn render_static(&self, request: &ChartRequest<'_>) -> Result<ChartImage, AppError> {
        self.raster.render_png(request)
    }

    fn render_interactive(&self, request: &ChartRequest<'_>, path: &Path) -> Result<(), AppError> {
        self.html.write_document(request, path)
    }
}

/// Line colors cycled across instruments.
pub const PALETTE: [u32; 10] = [
    0xE74C3C, 0x3498DB, 0x2ECC71, 0xF39C12, 0x9B59B6, 0x1ABC9C, 0xE67E22, 0x34495E, 0x16A085, 0xD35400,
];

pub fn palette_color(index: usize) -> u32 {
    PALETTE[index % PALETTE.len()]
}
