//! Offline price ingest from a long-format CSV.
//!
//! Expected columns (case-insensitive, any order): `date`, `symbol`, `close`.
//! One row per (date, symbol) observation.
//!
//! Design goals:
//! - **Strict schema** for required columns (config error before any work)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **File order preserved**: ordering problems surface when the series is
//!   validated, as they would for a network source

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::data::PriceSource;
use crate::domain::{Instrument, PricePoint, PriceSeries};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Closes grouped by symbol, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    symbols: Vec<String>,
    points: HashMap<String, Vec<PricePoint>>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl PriceTable {
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn points(&self, symbol: &str) -> Option<&[PricePoint]> {
        self.points.get(symbol).map(Vec::as_slice)
    }

    fn push(&mut self, symbol: &str, point: PricePoint) {
        if !self.points.contains_key(symbol) {
            self.symbols.push(symbol.to_string());
        }
        self.points.entry(symbol.to_string()).or_default().push(point);
    }
}

impl PriceSource for PriceTable {
    /// The range is ignored: the file holds whatever history it holds.
    fn fetch_series(&self, instrument: &Instrument, _range: &str) -> Result<PriceSeries, AppError> {
        let points = self
            .points(&instrument.symbol)
            .ok_or_else(|| AppError::data(format!("No rows for {} in the price file.", instrument.symbol)))?;
        PriceSeries::new(instrument.clone(), points.to_vec())
    }
}

/// Load a long-format price CSV.
pub fn load_price_csv(path: &Path) -> Result<PriceTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut table = PriceTable::default();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        table.rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| columns.parse(&record));
        match parsed {
            Ok((symbol, point)) => table.push(&symbol, point),
            Err(message) => table.row_errors.push(RowError { line, message }),
        }
    }

    for err in &table.row_errors {
        log::warn!("{}:{}: {}", path.display(), err.line, err.message);
    }
    if table.symbols.is_empty() {
        return Err(AppError::data(format!(
            "No valid rows in '{}' ({} read).",
            path.display(),
            table.rows_read
        )));
    }
    log::info!(
        "Loaded {} symbol(s) from {} ({} row error(s))",
        table.symbols.len(),
        path.display(),
        table.row_errors.len()
    );
    Ok(table)
}

struct Columns {
    date: usize,
    symbol: usize,
    close: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header_name(name), idx))
            .collect();
        let get = |name: &str| {
            map.get(name)
                .copied()
                .ok_or_else(|| AppError::config(format!("Missing required column: `{name}`")))
        };
        Ok(Self {
            date: get("date")?,
            symbol: get("symbol")?,
            close: get("close")?,
        })
    }

    fn parse(&self, record: &StringRecord) -> Result<(String, PricePoint), String> {
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("Missing required value: `{name}`"))
        };
        let symbol = field(self.symbol, "symbol")?.to_string();
        let date = parse_date(field(self.date, "date")?)?;
        let raw = field(self.close, "close")?;
        let close = raw
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Invalid close '{raw}'."))?;
        Ok((symbol, PricePoint { date, close }))
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}'. Expected YYYY-MM-DD."))
}
