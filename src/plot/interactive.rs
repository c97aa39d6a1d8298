//! Self-contained interactive HTML chart.
//!
//! The document inlines everything it needs: an SVG price line with a filled
//! area, CSS for a dark theme, and a small script that moves a crosshair and a
//! tooltip (date, price, signed daily change) with the pointer. It never
//! fetches anything at view time, so it works from a local folder or a static
//! site alike.

use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::Serialize;

use crate::error::AppError;
use crate::math::{padded_range, summarize};
use crate::plot::ChartRequest;
use crate::report::fmt_pct;

const WIDTH: f64 = 1400.0;
const HEIGHT: f64 = 700.0;
const PAD_LEFT: f64 = 80.0;
const PAD_RIGHT: f64 = 24.0;
const PAD_TOP: f64 = 24.0;
const PAD_BOTTOM: f64 = 48.0;
const Y_PADDING: f64 = 0.05;
const Y_TICKS: usize = 6;

const LINE_COLOR: &str = "#2962FF";
const UP_COLOR: &str = "#26A69A";
const DOWN_COLOR: &str = "#EF5350";
const MUTED_COLOR: &str = "#787B86";
const GRID_COLOR: &str = "#363A45";
const BACKGROUND: &str = "#1E222D";

#[derive(Debug, Serialize)]
struct HoverPoint {
    d: String,
    p: String,
    c: String,
    k: &'static str,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HtmlChartRenderer;

impl HtmlChartRenderer {
    /// Build the document and write it to `path`, creating parent folders.
    pub fn write_document(&self, request: &ChartRequest<'_>, path: &Path) -> Result<(), AppError> {
        let html = self.build_document(request)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::io(format!("Failed to create chart folder '{}': {e}", parent.display()))
            })?;
        }
        fs::write(path, html)
            .map_err(|e| AppError::io(format!("Failed to write chart '{}': {e}", path.display())))?;
        log::debug!("wrote interactive chart {}", path.display());
        Ok(())
    }

    pub fn build_document(&self, request: &ChartRequest<'_>) -> Result<String, AppError> {
        let rows = &request.window.rows;
        let closes = request.window.closes();
        let summary = summarize(&closes)
            .ok_or_else(|| AppError::render(format!("Nothing to plot for {}.", request.title)))?;
        let (y0, y1) = padded_range(summary.min, summary.max, Y_PADDING);

        let inner_w = WIDTH - PAD_LEFT - PAD_RIGHT;
        let inner_h = HEIGHT - PAD_TOP - PAD_BOTTOM;
        let span = (rows.len().max(2) - 1) as f64;
        let sx = |i: usize| PAD_LEFT + inner_w * (i as f64 / span);
        let sy = |v: f64| PAD_TOP + (1.0 - (v - y0) / (y1 - y0)) * inner_h;

        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg id="chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" preserveAspectRatio="none">"#
        ));

        // Horizontal grid + price labels.
        for i in 0..=Y_TICKS {
            let v = y0 + (y1 - y0) * i as f64 / Y_TICKS as f64;
            let y = sy(v);
            svg.push_str(&format!(
                r#"<line x1="{PAD_LEFT:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{GRID_COLOR}" stroke-dasharray="2 3" />"#,
                x2 = WIDTH - PAD_RIGHT,
            ));
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end">{v:.2}</text>"#,
                x = PAD_LEFT - 8.0,
                ty = y + 4.0,
            ));
        }

        // Month ticks along the time axis.
        let axis_y = HEIGHT - PAD_BOTTOM;
        let mut last_month: Option<(i32, u32)> = None;
        for (i, row) in rows.iter().enumerate() {
            let key = (row.date.year(), row.date.month());
            if last_month == Some(key) {
                continue;
            }
            last_month = Some(key);
            let x = sx(i);
            svg.push_str(&format!(
                r#"<line x1="{x:.2}" y1="{PAD_TOP:.2}" x2="{x:.2}" y2="{axis_y:.2}" stroke="{GRID_COLOR}" stroke-dasharray="2 3" />"#
            ));
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{label}</text>"#,
                ty = axis_y + 20.0,
                label = row.date.format("%b %Y"),
            ));
        }

        let coords: Vec<(f64, f64)> = rows.iter().enumerate().map(|(i, r)| (sx(i), sy(r.close))).collect();
        let line = coords
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            svg.push_str(&format!(
                r#"<polygon fill="{LINE_COLOR}" fill-opacity="0.1" stroke="none" points="{fx:.2},{axis_y:.2} {line} {lx:.2},{axis_y:.2}" />"#,
                fx = first.0,
                lx = last.0,
            ));
        }
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{LINE_COLOR}" stroke-width="2.5" stroke-opacity="0.9" points="{line}" />"#
        ));
        svg.push_str(&format!(
            r#"<line id="crosshair" x1="0" y1="{PAD_TOP:.2}" x2="0" y2="{axis_y:.2}" stroke="{MUTED_COLOR}" stroke-opacity="0.6" visibility="hidden" />"#
        ));
        svg.push_str(&format!(
            r##"<circle id="marker" r="4" fill="{LINE_COLOR}" stroke="#D1D4DC" visibility="hidden" />"##
        ));
        svg.push_str("</svg>");

        let hover: Vec<HoverPoint> = rows
            .iter()
            .zip(coords.iter())
            .map(|(r, &(x, y))| HoverPoint {
                d: r.date.format("%Y-%m-%d").to_string(),
                p: format!("{:.2}", r.close),
                c: fmt_pct(r.daily),
                k: match r.daily {
                    Some(v) if v >= 0.0 => UP_COLOR,
                    Some(v) if v < 0.0 => DOWN_COLOR,
                    _ => MUTED_COLOR,
                },
                x,
                y,
            })
            .collect();
        let data = serde_json::to_string(&hover)
            .map_err(|e| AppError::render(format!("Failed to serialize chart data: {e}")))?
            .replace("</", "<\\/");

        let title = escape_html(request.title);
        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ margin: 0; background: {BACKGROUND}; color: #D1D4DC; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; }}
.chart {{ position: relative; padding: 16px 24px; }}
.chart-title {{ font-size: 18pt; margin-bottom: 8px; }}
svg {{ width: 100%; height: auto; display: block; border: 1px solid {GRID_COLOR}; }}
svg text {{ fill: {MUTED_COLOR}; font-size: 11pt; }}
.tooltip {{ position: absolute; pointer-events: none; display: none; background: {BACKGROUND}; padding: 12px; border-radius: 4px; border: 1px solid {GRID_COLOR}; }}
.tooltip .date {{ color: #B2B5BE; font-size: 11px; margin-bottom: 6px; }}
.tooltip .row {{ display: flex; justify-content: space-between; gap: 20px; }}
.tooltip .label {{ color: {MUTED_COLOR}; font-size: 11px; }}
.tooltip .value {{ font-size: 14px; font-weight: 600; }}
</style>
</head>
<body>
<div class="chart">
<div class="chart-title">{title}</div>
{svg}
<div id="tooltip" class="tooltip"></div>
</div>
<script>
(function () {{
  var data = {data};
  var svg = document.getElementById("chart");
  var tip = document.getElementById("tooltip");
  var cross = document.getElementById("crosshair");
  var marker = document.getElementById("marker");
  if (!data.length) {{ return; }}
  function nearest(x) {{
    var lo = 0, hi = data.length - 1;
    while (hi - lo > 1) {{
      var mid = (lo + hi) >> 1;
      if (data[mid].x < x) {{ lo = mid; }} else {{ hi = mid; }}
    }}
    return (x - data[lo].x) < (data[hi].x - x) ? data[lo] : data[hi];
  }}
  svg.addEventListener("mousemove", function (ev) {{
    var box = svg.getBoundingClientRect();
    var x = (ev.clientX - box.left) * {WIDTH} / box.width;
    var pt = nearest(x);
    cross.setAttribute("x1", pt.x); cross.setAttribute("x2", pt.x);
    cross.setAttribute("visibility", "visible");
    marker.setAttribute("cx", pt.x); marker.setAttribute("cy", pt.y);
    marker.setAttribute("visibility", "visible");
    tip.innerHTML = '<div class="date">' + pt.d + '</div><div class="row">' +
      '<div><div class="label">Price</div><div class="value">$' + pt.p + '</div></div>' +
      '<div><div class="label">Daily Change</div><div class="value" style="color:' + pt.k + '">' + pt.c + '</div></div></div>';
    tip.style.display = "block";
    tip.style.left = (ev.clientX - box.left + 40) + "px";
    tip.style.top = (ev.clientY - box.top + 20) + "px";
  }});
  svg.addEventListener("mouseleave", function () {{
    tip.style.display = "none";
    cross.setAttribute("visibility", "hidden");
    marker.setAttribute("visibility", "hidden");
  }});
}})();
</script>
</body>
</html>
"#
        ))
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::domain::{Instrument, PricePoint, PriceSeries};
    use crate::math::compute_returns;

    fn window() -> crate::domain::ReturnSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        let points = [100.0, 102.0, 98.0, 105.0, 110.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect();
        compute_returns(&PriceSeries::new(Instrument::from_symbol("GC=F"), points).unwrap())
    }

    #[test]
    fn document_is_self_contained() {
        let series = window();
        let html = HtmlChartRenderer
            .build_document(&ChartRequest {
                window: &series,
                title: "Gold <GC=F>",
                palette_index: 0,
            })
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Gold &lt;GC=F&gt;</title>"));
        assert!(!html.contains("<script src"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("@import"));
        assert!(html.contains(r#""d":"2025-02-03""#));
        assert!(html.contains(r#""c":"+4.76%""#));
        assert!(html.contains(r#""c":"N/A""#));
        // Month ticks for January and February.
        assert!(html.contains(">Jan 2025<"));
        assert!(html.contains(">Feb 2025<"));
    }

    #[test]
    fn write_document_creates_parent_folders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts_html_local").join("GC_F.html");
        let series = window();
        HtmlChartRenderer
            .write_document(
                &ChartRequest {
                    window: &series,
                    title: "Gold (GC=F)",
                    palette_index: 0,
                },
                &path,
            )
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Gold (GC=F)"));
    }
}
