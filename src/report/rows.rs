//! Report rows: the trailing window of a return series, newest first.
//!
//! Returns are computed on the full fetched history. The retention window is
//! applied afterwards so the oldest retained rows still carry lookback values.

use chrono::Months;

use crate::domain::{Instrument, Retention, ReturnRow, ReturnSeries};
use crate::error::AppError;
use crate::math::{PriceSummary, summarize};

/// Default number of table rows per instrument.
pub const DEFAULT_TABLE_ROWS: usize = 10;

/// One formatted table row: a date string plus six numeric cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub date: String,
    pub close: f64,
    /// Daily, weekly, monthly, year-over-year, year-to-date (%).
    pub returns: [Option<f64>; 5],
}

/// Everything the workbook and the terminal need for one instrument.
#[derive(Debug, Clone)]
pub struct ReportTable {
    pub instrument: Instrument,
    pub retention: Retention,
    /// Retained window in ascending date order (feeds the charts).
    pub window: ReturnSeries,
    /// Most recent rows, newest first.
    pub rows: Vec<ReportRow>,
    pub summary: PriceSummary,
}

/// Keep the trailing part of the series described by `retention`.
pub fn retain_window(series: &ReturnSeries, retention: Retention) -> Result<ReturnSeries, AppError> {
    ensure_strictly_increasing(&series.rows, &series.instrument)?;

    let rows: Vec<ReturnRow> = match retention {
        Retention::Rows(n) => {
            let start = series.rows.len().saturating_sub(n);
            series.rows[start..].to_vec()
        }
        Retention::Years(years) => {
            let Some(last) = series.last_date() else {
                return Ok(series.clone());
            };
            let cutoff = last
                .checked_sub_months(Months::new(12 * years))
                .ok_or_else(|| AppError::data(format!("Retention of {years} year(s) is out of range.")))?;
            series.rows.iter().filter(|r| r.date >= cutoff).copied().collect()
        }
    };

    Ok(ReturnSeries {
        instrument: series.instrument.clone(),
        rows,
    })
}

/// The most recent `max_rows` rows of `window`, newest first.
pub fn build_rows(window: &ReturnSeries, max_rows: usize) -> Result<Vec<ReportRow>, AppError> {
    ensure_strictly_increasing(&window.rows, &window.instrument)?;

    Ok(window
        .rows
        .iter()
        .rev()
        .take(max_rows)
        .map(|r| ReportRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            close: r.close,
            returns: r.returns(),
        })
        .collect())
}

/// Window + rows + summary for one instrument.
pub fn build_table(series: &ReturnSeries, retention: Retention, max_rows: usize) -> Result<ReportTable, AppError> {
    let window = retain_window(series, retention)?;
    let rows = build_rows(&window, max_rows)?;
    let summary = summarize(&window.closes()).ok_or_else(|| {
        AppError::data(format!(
            "No observations left for {} after applying retention ({}).",
            series.instrument.symbol,
            retention.describe()
        ))
    })?;

    Ok(ReportTable {
        instrument: series.instrument.clone(),
        retention,
        window,
        rows,
        summary,
    })
}

fn ensure_strictly_increasing(rows: &[ReturnRow], instrument: &Instrument) -> Result<(), AppError> {
    for pair in rows.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(AppError::data(format!(
                "Data-quality error for {}: observation {} is not after {}.",
                instrument.symbol, pair[1].date, pair[0].date
            )));
        }
    }
    Ok(())
}
