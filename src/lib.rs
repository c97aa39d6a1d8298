//! `commodity-charts` library crate.
//!
//! The binary is a thin wrapper around this library so that:
//!
//! - the return math and sheet layout are testable without spawning processes
//! - network, browser, git and drive access sit behind traits and can be faked
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod layout;
pub mod math;
pub mod plot;
pub mod publish;
pub mod report;
