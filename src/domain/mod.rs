//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - instruments and the static symbol catalog (`Instrument`)
//! - validated price history (`PriceSeries`) and derived returns (`ReturnSeries`)
//! - the run configuration (`ReportConfig`, `PublishMode`, `Retention`, `LayoutKind`)

pub mod types;

pub use types::*;
