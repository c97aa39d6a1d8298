//! External data sources.
//!
//! - `yahoo`: daily futures closes from the Yahoo Finance chart API
//! - `sunsirs`: chart snapshots captured from SunSirs product pages
//!
//! Offline CSV input lives in `io::ingest` and implements the same
//! [`PriceSource`] trait.

use crate::domain::{Instrument, PriceSeries};
use crate::error::AppError;
use crate::plot::ChartImage;

pub mod sunsirs;
pub mod yahoo;

pub use sunsirs::{BrowserSession, Catalog, SunsirsSnapshots};
pub use yahoo::YahooClient;

/// Where validated price histories come from.
pub trait PriceSource {
    /// Full history for `instrument` over `range` (e.g. `2y`).
    fn fetch_series(&self, instrument: &Instrument, range: &str) -> Result<PriceSeries, AppError>;
}

/// A captured chart and the name it is listed under.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub title: String,
    pub image: ChartImage,
}

pub trait SnapshotSource {
    fn capture(&mut self, name: &str) -> Result<Snapshot, AppError>;
}
