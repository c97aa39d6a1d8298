//! Numeric building blocks: lookback returns and window statistics.

pub mod returns;
pub mod stats;

pub use returns::*;
pub use stats::*;
