//! Command-line parsing for the commodity chart reporter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. `app` turns these structs into a `ReportConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{LayoutKind, Retention};
use crate::error::AppError;
use crate::report::DEFAULT_TABLE_ROWS;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "commodity-charts",
    version,
    about = "Commodity price charts and return tables, as spreadsheets and HTML"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build both workbooks and the interactive charts, then publish if enabled.
    Run(RunArgs),
    /// Print the return table (and a terminal plot) for one instrument.
    Returns(ReturnsArgs),
    /// Publish already generated files without rebuilding them.
    Publish(RunArgs),
}

/// History window options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// Yahoo history range to fetch (e.g. 1y, 2y, 5y).
    #[arg(long, default_value = "2y")]
    pub range: String,

    /// Keep the last N years of history in each report.
    #[arg(long, default_value_t = 1, conflicts_with = "keep_rows")]
    pub years: u32,

    /// Keep the last N observations instead of a number of years.
    #[arg(long)]
    pub keep_rows: Option<usize>,

    /// Rows shown in each table (newest first).
    #[arg(long, default_value_t = DEFAULT_TABLE_ROWS)]
    pub rows: usize,

    /// Read prices from a long-format CSV (`date,symbol,close`) instead of Yahoo.
    #[arg(long, value_name = "CSV")]
    pub prices_csv: Option<PathBuf>,
}

impl WindowArgs {
    /// The retention window these flags describe; empty windows are rejected.
    pub fn retention(&self) -> Result<Retention, AppError> {
        if self.rows == 0 {
            return Err(AppError::config("`--rows` must be at least 1."));
        }
        match self.keep_rows {
            Some(0) => Err(AppError::config("`--keep-rows` must be at least 1.")),
            Some(n) => Ok(Retention::Rows(n)),
            None if self.years == 0 => Err(AppError::config("`--years` must be at least 1.")),
            None => Ok(Retention::Years(self.years)),
        }
    }
}

/// Options for `run` and `publish`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Futures symbols to chart, comma separated (defaults to the built-in list).
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Worksheet arrangement of the price workbook.
    #[arg(long, value_enum, default_value_t = LayoutKind::PerSheet)]
    pub layout: LayoutKind,

    /// Price workbook path.
    #[arg(long, default_value = "commodity_charts.xlsx")]
    pub output: PathBuf,

    /// Snapshot workbook path.
    #[arg(long, default_value = "Sunsirs_Charts.xlsx")]
    pub snapshot_output: PathBuf,

    /// SunSirs commodity names to capture, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub snapshots: Vec<String>,

    /// Skip the snapshot workbook.
    #[arg(long)]
    pub no_snapshots: bool,

    /// Push charts to the site repository and upload workbooks to Drive.
    #[arg(long)]
    pub publish: bool,

    /// Folder for interactive charts in local mode.
    #[arg(long, default_value = "charts_html_local")]
    pub html_dir: PathBuf,

    /// Local checkout of the static-site repository.
    #[arg(long, default_value = ".")]
    pub repo_path: PathBuf,

    /// GitHub account owning the site repository.
    #[arg(long)]
    pub github_user: Option<String>,

    /// Site repository name.
    #[arg(long)]
    pub github_repo: Option<String>,

    /// Public site URL (defaults to https://{user}.github.io/{repo}/).
    #[arg(long)]
    pub pages_url: Option<String>,

    /// Drive folder id receiving the workbooks.
    #[arg(long)]
    pub drive_folder: Option<String>,

    /// Child folder (by name) of the drive folder to upload into.
    #[arg(long)]
    pub drive_subfolder: Option<String>,

    /// Make uploaded workbooks readable by anyone with the link.
    #[arg(long)]
    pub share_links: bool,

    /// OAuth credentials file with a refresh token.
    #[arg(long, default_value = "credentials.json")]
    pub drive_credentials: PathBuf,
}

/// Options for `returns`.
#[derive(Debug, Args, Clone)]
pub struct ReturnsArgs {
    /// Futures symbol, e.g. GC=F.
    #[arg(short = 's', long)]
    pub symbol: String,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "commodity-charts",
            "run",
            "--symbols",
            "GC=F,SI=F",
            "--layout",
            "consolidated",
            "--keep-rows",
            "120",
            "--no-snapshots",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.symbols, ["GC=F", "SI=F"]);
        assert_eq!(args.layout, LayoutKind::Consolidated);
        assert_eq!(args.window.keep_rows, Some(120));
        assert_eq!(args.window.range, "2y");
        assert!(args.no_snapshots);
    }

    fn window(extra: &[&str]) -> WindowArgs {
        let mut argv = vec!["commodity-charts", "returns", "-s", "GC=F"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Returns(args) => args.window,
            _ => unreachable!(),
        }
    }

    #[test]
    fn window_flags_resolve_to_a_retention() {
        assert_eq!(window(&[]).retention().unwrap(), Retention::Years(1));
        assert_eq!(window(&["--keep-rows", "30"]).retention().unwrap(), Retention::Rows(30));

        for bad in [&["--years", "0"][..], &["--keep-rows", "0"], &["--rows", "0"]] {
            let err = window(bad).retention().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        }
    }

    #[test]
    fn years_and_keep_rows_conflict() {
        let res = Cli::try_parse_from(["commodity-charts", "run", "--years", "2", "--keep-rows", "10"]);
        assert!(res.is_err());
    }
}
