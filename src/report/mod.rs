//! Reporting: table rows, run outcomes, and formatted terminal output.

pub mod format;
pub mod outcome;
pub mod rows;

pub use format::*;
pub use outcome::*;
pub use rows::*;
