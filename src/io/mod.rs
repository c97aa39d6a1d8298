//! Input/output helpers.
//!
//! - CSV price ingest (`ingest`)
//! - `.xlsx` report output (`workbook`)

pub mod ingest;
pub mod workbook;

pub use ingest::*;
pub use workbook::*;
