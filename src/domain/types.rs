//! Shared domain types.
//!
//! These types flow through the whole pipeline:
//!
//! - instruments and their validated price history (`Instrument`, `PriceSeries`)
//! - derived returns (`ReturnRow`, `ReturnSeries`)
//! - the run configuration (`ReportConfig`, `PublishMode`)

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default futures symbols fetched by `run`.
pub const DEFAULT_SYMBOLS: [&str; 13] = [
    "HRC=F", "CL=F", "BZ=F", "NG=F", "RB=F", "HO=F", "GC=F", "SI=F", "HG=F", "PL=F", "PA=F", "ALI=F", "DX=F",
];

/// Default commodity names captured for the snapshot workbook.
pub const DEFAULT_SNAPSHOT_NAMES: [&str; 6] = [
    "Coking coal",
    "Fuel Oil",
    "Gasoline",
    "Diesel",
    "Hot rolled coil",
    "Iron ore",
];

const COMMODITY_NAMES: [(&str, &str); 14] = [
    ("HRC=F", "Hot Rolled Coil"),
    ("CL=F", "Crude Oil (WTI)"),
    ("BZ=F", "Brent Crude"),
    ("NG=F", "Natural Gas"),
    ("RB=F", "Gasoline"),
    ("HO=F", "Heating Oil"),
    ("EH=F", "Ethanol"),
    ("GC=F", "Gold"),
    ("SI=F", "Silver"),
    ("HG=F", "Copper"),
    ("PL=F", "Platinum"),
    ("PA=F", "Palladium"),
    ("ALI=F", "Aluminum"),
    ("DX=F", "Dollar Index"),
];

/// A tradable symbol plus the name shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    /// Look the symbol up in the static catalog; unknown symbols use the symbol as name.
    pub fn from_symbol(symbol: &str) -> Self {
        let name = COMMODITY_NAMES
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, n)| (*n).to_string())
            .unwrap_or_else(|| symbol.to_string());
        Self {
            symbol: symbol.to_string(),
            name,
        }
    }

    /// `"Gold (GC=F)"`.
    pub fn full_name(&self) -> String {
        format!("{} ({})", self.name, self.symbol)
    }

    /// File name of the interactive chart document for this instrument.
    ///
    /// Every non-alphanumeric symbol character is replaced with `_`, so the name
    /// is stable across runs and safe as a URL path segment.
    pub fn html_file_name(&self) -> String {
        let stem: String = self
            .symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}.html")
    }

    /// Worksheet name: `=` dropped, `/` turned into `-`, Excel-forbidden
    /// characters removed, at most 31 characters.
    pub fn sheet_name(&self) -> String {
        let cleaned: String = self
            .symbol
            .chars()
            .filter(|c| *c != '=')
            .map(|c| if c == '/' { '-' } else { c })
            .filter(|c| !matches!(c, '\\' | '?' | '*' | '[' | ']' | ':' | '\''))
            .take(31)
            .collect();
        if cleaned.is_empty() {
            "Sheet".to_string()
        } else {
            cleaned
        }
    }
}

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Validated price history for one instrument.
///
/// Dates are strictly increasing; there are no duplicates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    instrument: Instrument,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(instrument: Instrument, points: Vec<PricePoint>) -> Result<Self, AppError> {
        if points.is_empty() {
            return Err(AppError::data(format!(
                "No price observations for {}.",
                instrument.symbol
            )));
        }
        for pair in points.windows(2) {
            if pair[1].date == pair[0].date {
                return Err(AppError::data(format!(
                    "Duplicate observation date {} for {}.",
                    pair[1].date, instrument.symbol
                )));
            }
            if pair[1].date < pair[0].date {
                return Err(AppError::data(format!(
                    "Non-monotonic dates for {}: {} follows {}.",
                    instrument.symbol, pair[1].date, pair[0].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(AppError::data(format!(
                "Non-finite close on {} for {}.",
                bad.date, instrument.symbol
            )));
        }
        Ok(Self { instrument, points })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Derived returns for one observation. Percentages, `None` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnRow {
    pub date: NaiveDate,
    pub close: f64,
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
    pub yoy: Option<f64>,
    pub ytd: Option<f64>,
}

impl ReturnRow {
    /// The five return fields in report column order.
    pub fn returns(&self) -> [Option<f64>; 5] {
        [self.daily, self.weekly, self.monthly, self.yoy, self.ytd]
    }
}

/// Returns for a whole series, in ascending date order.
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    pub instrument: Instrument,
    pub rows: Vec<ReturnRow>,
}

impl ReturnSeries {
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }
}

/// How much trailing history a report keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Observations dated on or after `last_date - n years`.
    Years(u32),
    /// The last `n` observations.
    Rows(usize),
}

impl Retention {
    pub fn describe(&self) -> String {
        match self {
            Retention::Years(n) => format!("Last {n} year(s)"),
            Retention::Rows(n) => format!("Last {n} row(s)"),
        }
    }
}

/// Worksheet arrangement for the price report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutKind {
    /// One sheet per instrument.
    PerSheet,
    /// Every instrument stacked on a single sheet.
    Consolidated,
}

/// Everything needed to publish: the static-site repository and the drive folder.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    /// Local checkout of the static-site repository (interactive charts land here).
    pub repo_path: PathBuf,
    /// Public base URL of the site, always ending with `/`.
    pub pages_url: String,
    pub github_user: String,
    pub github_repo: String,
    /// Token used in the authenticated push URL. Never logged.
    pub token: String,
    /// Drive folder receiving the workbooks.
    pub drive_folder_id: String,
    /// Child folder of `drive_folder_id` to upload into, created on first use.
    pub drive_subfolder: Option<String>,
    /// Grant `anyone`/`reader` on uploaded workbooks and report preview links.
    pub share_links: bool,
    /// OAuth credentials file (`client_id`, `client_secret`, `refresh_token`).
    pub drive_credentials: PathBuf,
}

/// Where interactive charts go and what the workbook links point at.
#[derive(Debug, Clone)]
pub enum PublishMode {
    /// Charts under a local folder, linked by absolute path. Nothing is uploaded.
    Local { html_dir: PathBuf },
    /// Charts committed to the site repository and linked by public URL.
    Publish(PublishTarget),
}

impl PublishMode {
    pub fn is_publish(&self) -> bool {
        matches!(self, PublishMode::Publish(_))
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, the environment and defaults.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub instruments: Vec<Instrument>,
    /// Yahoo history range, e.g. `2y`.
    pub history_range: String,
    pub retention: Retention,
    /// Rows shown in each table.
    pub table_rows: usize,
    pub layout: LayoutKind,
    pub workbook_path: PathBuf,
    /// Offline price input; bypasses the network fetch when set.
    pub prices_csv: Option<PathBuf>,

    pub snapshot_names: Vec<String>,
    pub snapshot_workbook_path: PathBuf,
    pub snapshots_enabled: bool,

    pub publish: PublishMode,
}

/// Normalize a public base URL so it ends with exactly one `/`.
pub fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn instrument_names_come_from_catalog() {
        let gold = Instrument::from_symbol("GC=F");
        assert_eq!(gold.full_name(), "Gold (GC=F)");
        assert_eq!(gold.html_file_name(), "GC_F.html");
        assert_eq!(gold.sheet_name(), "GCF");

        let unknown = Instrument::from_symbol("XYZ/USD");
        assert_eq!(unknown.name, "XYZ/USD");
        assert_eq!(unknown.sheet_name(), "XYZ-USD");
        assert_eq!(unknown.html_file_name(), "XYZ_USD.html");
    }

    #[test]
    fn sheet_name_is_truncated_to_31_chars() {
        let long = Instrument::from_symbol(&"A".repeat(40));
        assert_eq!(long.sheet_name().chars().count(), 31);
    }

    #[test]
    fn price_series_rejects_bad_ordering() {
        let inst = Instrument::from_symbol("CL=F");
        let ok = PriceSeries::new(
            inst.clone(),
            vec![
                PricePoint { date: day(3), close: 1.0 },
                PricePoint { date: day(4), close: 2.0 },
            ],
        );
        assert!(ok.is_ok());

        let dup = PriceSeries::new(
            inst.clone(),
            vec![
                PricePoint { date: day(3), close: 1.0 },
                PricePoint { date: day(3), close: 2.0 },
            ],
        )
        .unwrap_err();
        assert_eq!(dup.kind(), crate::error::ErrorKind::Data);
        assert!(dup.message().contains("Duplicate"));

        let backwards = PriceSeries::new(
            inst.clone(),
            vec![
                PricePoint { date: day(4), close: 1.0 },
                PricePoint { date: day(3), close: 2.0 },
            ],
        )
        .unwrap_err();
        assert!(backwards.message().contains("Non-monotonic"));

        assert!(PriceSeries::new(inst, Vec::new()).is_err());
    }

    #[test]
    fn base_url_gets_exactly_one_trailing_slash() {
        assert_eq!(normalize_base_url("https://a.github.io/repo"), "https://a.github.io/repo/");
        assert_eq!(normalize_base_url("https://a.github.io/repo/"), "https://a.github.io/repo/");
        assert_eq!(normalize_base_url("https://a.github.io/repo//"), "https://a.github.io/repo/");
    }
}
