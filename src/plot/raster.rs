//! Static PNG chart rendered with Plotters.
//!
//! We draw into an in-memory RGB buffer (`BitMapBackend::with_buffer`) and
//! encode it as PNG with `image`; nothing touches the filesystem.
//!
//! Plotters runs without its font features, so the image carries the series,
//! the filled area and a plain grid only; no text is drawn. The sheet already
//! holds the title, dates and values next to the image.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;

use crate::error::AppError;
use crate::math::{padded_range, summarize};
use crate::plot::{ChartImage, ChartRequest, palette_color};

/// Pixel size of the embedded chart (900 x 450 in the sheet).
pub const STATIC_WIDTH: u32 = 900;
pub const STATIC_HEIGHT: u32 = 450;

/// Y-range padding as a fraction of the price range.
const Y_PADDING: f64 = 0.10;
/// Upper bound on drawn markers per series.
const MAX_MARKERS: usize = 50;
const GRID_LINES_X: usize = 8;
const GRID_LINES_Y: usize = 6;

#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            width: STATIC_WIDTH,
            height: STATIC_HEIGHT,
        }
    }
}

impl PlottersRenderer {
    pub fn render_png(&self, request: &ChartRequest<'_>) -> Result<ChartImage, AppError> {
        let closes = request.window.closes();
        let summary = summarize(&closes).ok_or_else(|| {
            AppError::render(format!("Nothing to plot for {}.", request.title))
        })?;

        let (w, h) = (self.width.max(32), self.height.max(32));
        let mut buf = vec![0u8; (w as usize) * (h as usize) * 3];
        draw_series(&mut buf, (w, h), &closes, summary.min, summary.max, request.palette_index)
            .map_err(|e| AppError::render(format!("Failed to draw chart for {}: {e}", request.title)))?;

        let img = RgbImage::from_raw(w, h, buf)
            .ok_or_else(|| AppError::render("Chart buffer does not match its dimensions."))?;
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png)
            .map_err(|e| AppError::render(format!("Failed to encode chart PNG: {e}")))?;

        Ok(ChartImage {
            png: png.into_inner(),
            width_px: w,
            height_px: h,
            scale: 1.0,
        })
    }
}

fn draw_series(
    buf: &mut [u8],
    size: (u32, u32),
    closes: &[f64],
    min: f64,
    max: f64,
    palette_index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::with_buffer(buf, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (y0, y1) = padded_range(min, max, Y_PADDING);
    let x1 = (closes.len().max(2) - 1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .set_label_area_size(LabelAreaPosition::Left, 8)
        .set_label_area_size(LabelAreaPosition::Bottom, 8)
        .build_cartesian_2d(0f64..x1, y0..y1)?;

    chart
        .plotting_area()
        .fill(&RGBColor(0xFA, 0xFA, 0xFA))?;

    // Grid lines are drawn as plain paths: without a font backend Plotters
    // cannot render mesh labels.
    let grid = RGBColor(0xDD, 0xDD, 0xDD);
    for i in 0..=GRID_LINES_Y {
        let y = y0 + (y1 - y0) * i as f64 / GRID_LINES_Y as f64;
        chart.draw_series(std::iter::once(PathElement::new(vec![(0.0, y), (x1, y)], grid)))?;
    }
    for i in 0..=GRID_LINES_X {
        let x = x1 * i as f64 / GRID_LINES_X as f64;
        chart.draw_series(std::iter::once(PathElement::new(vec![(x, y0), (x, y1)], grid)))?;
    }

    let rgb = palette_color(palette_index);
    let color = RGBColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8);
    let points: Vec<(f64, f64)> = closes.iter().enumerate().map(|(i, &c)| (i as f64, c)).collect();

    chart.draw_series(AreaSeries::new(points.iter().copied(), y0, color.mix(0.2)))?;
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))?;

    let every = (points.len() / MAX_MARKERS).max(1);
    chart.draw_series(
        points
            .iter()
            .step_by(every)
            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
    )?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::domain::{Instrument, PricePoint, PriceSeries};
    use crate::math::compute_returns;

    #[test]
    fn renders_a_png_of_the_configured_size() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let points = (0..60)
            .map(|i| PricePoint {
                date: start + Duration::days(i),
                close: 100.0 + (i as f64 / 5.0).sin() * 10.0,
            })
            .collect();
        let series = compute_returns(&PriceSeries::new(Instrument::from_symbol("GC=F"), points).unwrap());
        let renderer = PlottersRenderer {
            width: 300,
            height: 150,
        };
        let image = renderer
            .render_png(&ChartRequest {
                window: &series,
                title: "Gold (GC=F)",
                palette_index: 0,
            })
            .unwrap();

        assert_eq!((image.width_px, image.height_px), (300, 150));
        assert_eq!(&image.png[1..4], b"PNG");
        let decoded = ChartImage::from_png(image.png.clone(), 1.0).unwrap();
        assert_eq!(decoded.height_px, 150);
    }

    #[test]
    fn empty_window_is_a_render_error() {
        let series = crate::domain::ReturnSeries {
            instrument: Instrument::from_symbol("GC=F"),
            rows: Vec::new(),
        };
        let err = PlottersRenderer::default()
            .render_png(&ChartRequest {
                window: &series,
                title: "Gold",
                palette_index: 0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Render);
    }
}
