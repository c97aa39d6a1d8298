//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a price window in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - close prices: `-` line, observation index on the x-axis
//! - latest observation: `o`

use crate::domain::ReturnSeries;
use crate::math::{padded_range, summarize};

/// Render the closes of `window` into a `width` x `height` character grid.
pub fn render_price_plot(window: &ReturnSeries, width: usize, height: usize) -> String {
    let closes = window.closes();
    let Some(summary) = summarize(&closes) else {
        return "Plot: no observations\n".to_string();
    };
    let (y_min, y_max) = padded_range(summary.min, summary.max, 0.05);

    let mut grid = Grid::new(width.max(10), height.max(5));
    let last_index = (closes.len().max(2) - 1) as f64;

    let mut prev: Option<(usize, usize)> = None;
    for (i, &close) in closes.iter().enumerate() {
        let cell = (
            grid.column(i as f64 / last_index),
            grid.row((close - y_min) / (y_max - y_min)),
        );
        match prev {
            Some(from) => grid.line(from, cell, '-'),
            None => grid.put(cell, '-'),
        }
        prev = Some(cell);
    }
    if let Some(cell) = prev {
        grid.put(cell, 'o');
    }

    let first = window.rows.first().map(|r| r.date.to_string()).unwrap_or_default();
    let last = window.rows.last().map(|r| r.date.to_string()).unwrap_or_default();

    let mut out = format!("Plot: {first} .. {last} | close=[{y_min:.2}, {y_max:.2}]\n");
    out.push_str(&grid.render());
    out
}

/// Character canvas; row 0 is the top line.
struct Grid {
    cells: Vec<Vec<char>>,
    width: usize,
    height: usize,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![' '; width]; height],
            width,
            height,
        }
    }

    /// Column for a horizontal fraction in `[0, 1]`.
    fn column(&self, frac: f64) -> usize {
        (frac.clamp(0.0, 1.0) * (self.width - 1) as f64).round() as usize
    }

    /// Row for a vertical fraction in `[0, 1]` (1 is the top).
    fn row(&self, frac: f64) -> usize {
        let span = (self.height - 1) as f64;
        (span - frac.clamp(0.0, 1.0) * span).round() as usize
    }

    fn put(&mut self, (x, y): (usize, usize), ch: char) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|r| r.get_mut(x)) {
            *cell = ch;
        }
    }

    /// Bresenham line; cells already drawn are left alone.
    fn line(&mut self, from: (usize, usize), to: (usize, usize), ch: char) {
        let (mut x, mut y) = (from.0 as isize, from.1 as isize);
        let (x1, y1) = (to.0 as isize, to.1 as isize);

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if let Some(cell) = self.cells.get_mut(y as usize).and_then(|r| r.get_mut(x as usize)) {
                if *cell == ' ' {
                    *cell = ch;
                }
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in &self.cells {
            out.extend(row.iter());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{Instrument, PricePoint, PriceSeries};
    use crate::math::compute_returns;

    #[test]
    fn plot_golden_snapshot_small() {
        let points = vec![
            PricePoint {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                close: 100.0,
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                close: 110.0,
            },
        ];
        let window = compute_returns(&PriceSeries::new(Instrument::from_symbol("GC=F"), points).unwrap());

        let txt = render_price_plot(&window, 10, 5);
        let expected = concat!(
            "Plot: 2025-01-01 .. 2025-01-02 | close=[99.50, 110.50]\n",
            "        -o\n",
            "      --  \n",
            "    --    \n",
            "  --      \n",
            "--        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_window_renders_a_hint() {
        let window = ReturnSeries {
            instrument: Instrument::from_symbol("GC=F"),
            rows: Vec::new(),
        };
        assert_eq!(render_price_plot(&window, 10, 5), "Plot: no observations\n");
    }
}
