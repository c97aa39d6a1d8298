//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves configuration and secrets before any work starts
//! - wires the real collaborators (Yahoo, SunSirs, git, Drive) into the pipeline
//! - prints the run summary

use std::path::Path;

use clap::Parser;

use crate::cli::{Command, ReturnsArgs, RunArgs};
use crate::data::{PriceSource, SnapshotSource, SunsirsSnapshots, YahooClient};
use crate::domain::{
    DEFAULT_SNAPSHOT_NAMES, DEFAULT_SYMBOLS, Instrument, PublishMode, PublishTarget, ReportConfig,
    normalize_base_url,
};
use crate::error::AppError;
use crate::io::load_price_csv;
use crate::plot::DefaultRenderer;
use crate::publish::{CommandGit, DriveApi, GoogleDrive};

pub mod pipeline;

use pipeline::Collaborators;

/// Environment variable holding the git push token.
pub const TOKEN_ENV: &str = "API_TOKEN";

/// Entry point for the `commodity-charts` binary.
pub fn run() -> Result<(), AppError> {
    // We want a bare `commodity-charts` (or one with only flags) to behave
    // like `commodity-charts run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Returns(args) => handle_returns(args),
        Command::Publish(args) => handle_publish(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = config_from_args(&args, read_token)?;
    let prices = price_source(&config.prices_csv)?;
    let renderer = DefaultRenderer::default();
    let deps = Collaborators {
        prices: prices.as_ref(),
        renderer: &renderer,
        open_snapshots: &open_sunsirs,
        git: &CommandGit,
        connect_drive: &connect_drive,
    };

    let report = pipeline::run_report(&config, &deps, chrono::Local::now().naive_local())?;
    println!("{}", crate::report::format_run_summary(&report));
    Ok(())
}

fn handle_publish(mut args: RunArgs) -> Result<(), AppError> {
    args.publish = true;
    let config = config_from_args(&args, read_token)?;

    let files = pipeline::output_files(&config);
    if !files.iter().any(|p| p.exists()) {
        return Err(AppError::config("Nothing to publish: no generated workbook found. Run `run` first."));
    }

    let report = crate::report::RunReport {
        sections: Vec::new(),
        publish: pipeline::publish_step(&config, &CommandGit, &connect_drive, chrono::Local::now().naive_local()),
    };
    println!("{}", crate::report::format_run_summary(&report));
    Ok(())
}

fn handle_returns(args: ReturnsArgs) -> Result<(), AppError> {
    let (instrument, config) = returns_config(&args)?;

    let prices = price_source(&config.prices_csv)?;
    let table = pipeline::instrument_table(&config, prices.as_ref(), &instrument)?;
    println!("{}", crate::report::format_report_table(&table));

    if !args.no_plot {
        println!(
            "{}",
            crate::plot::ascii::render_price_plot(&table.window, args.width, args.height)
        );
    }
    Ok(())
}

/// Single-instrument configuration for `returns`, validated like `run`.
fn returns_config(args: &ReturnsArgs) -> Result<(Instrument, ReportConfig), AppError> {
    let symbol = args.symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::config("`--symbol` must not be empty."));
    }
    let instrument = Instrument::from_symbol(symbol);
    let config = ReportConfig {
        instruments: vec![instrument.clone()],
        history_range: args.window.range.clone(),
        retention: args.window.retention()?,
        table_rows: args.window.rows,
        layout: crate::domain::LayoutKind::PerSheet,
        workbook_path: Default::default(),
        prices_csv: args.window.prices_csv.clone(),
        snapshot_names: Vec::new(),
        snapshot_workbook_path: Default::default(),
        snapshots_enabled: false,
        publish: PublishMode::Local {
            html_dir: Default::default(),
        },
    };
    Ok((instrument, config))
}

fn price_source(csv: &Option<std::path::PathBuf>) -> Result<Box<dyn PriceSource>, AppError> {
    match csv {
        Some(path) => Ok(Box::new(load_price_csv(path)?)),
        None => Ok(Box::new(YahooClient::new()?)),
    }
}

fn open_sunsirs() -> Result<Box<dyn SnapshotSource>, AppError> {
    Ok(Box::new(SunsirsSnapshots::open()?))
}

fn connect_drive(target: &PublishTarget) -> Result<Box<dyn DriveApi>, AppError> {
    Ok(Box::new(GoogleDrive::connect(&target.drive_credentials)?))
}

fn read_token() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty())
}

/// Resolve CLI flags and secrets into a `ReportConfig`.
///
/// Publish mode requires every publish parameter up front; anything missing is
/// a config error before any network or file work happens.
pub fn config_from_args(args: &RunArgs, token: impl FnOnce() -> Option<String>) -> Result<ReportConfig, AppError> {
    let symbols: Vec<String> = if args.symbols.is_empty() {
        DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        args.symbols.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    };
    if symbols.is_empty() {
        return Err(AppError::config("No symbols to chart."));
    }
    let retention = args.window.retention()?;

    let snapshot_names: Vec<String> = if args.snapshots.is_empty() {
        DEFAULT_SNAPSHOT_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        args.snapshots.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    };

    let publish = if args.publish {
        PublishMode::Publish(publish_target(args, token)?)
    } else {
        PublishMode::Local {
            html_dir: args.html_dir.clone(),
        }
    };

    Ok(ReportConfig {
        instruments: symbols.iter().map(|s| Instrument::from_symbol(s)).collect(),
        history_range: args.window.range.clone(),
        retention,
        table_rows: args.window.rows,
        layout: args.layout,
        workbook_path: args.output.clone(),
        prices_csv: args.window.prices_csv.clone(),
        snapshot_names,
        snapshot_workbook_path: args.snapshot_output.clone(),
        snapshots_enabled: !args.no_snapshots,
        publish,
    })
}

fn publish_target(args: &RunArgs, token: impl FnOnce() -> Option<String>) -> Result<PublishTarget, AppError> {
    let required = |value: &Option<String>, flag: &str| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::config(format!("`--publish` requires `--{flag}`.")))
    };
    let github_user = required(&args.github_user, "github-user")?;
    let github_repo = required(&args.github_repo, "github-repo")?;
    let drive_folder_id = required(&args.drive_folder, "drive-folder")?;

    let token = token().ok_or_else(|| AppError::config(format!("Missing {TOKEN_ENV} in environment (.env).")))?;

    ensure_dir(&args.repo_path)?;
    if !args.drive_credentials.is_file() {
        return Err(AppError::config(format!(
            "Drive credentials file '{}' not found.",
            args.drive_credentials.display()
        )));
    }

    let pages_url = match &args.pages_url {
        Some(url) => normalize_base_url(url),
        None => normalize_base_url(&format!("https://{github_user}.github.io/{github_repo}")),
    };

    Ok(PublishTarget {
        repo_path: args.repo_path.clone(),
        pages_url,
        github_user,
        github_repo,
        token,
        drive_folder_id,
        drive_subfolder: args.drive_subfolder.clone().filter(|s| !s.trim().is_empty()),
        share_links: args.share_links,
        drive_credentials: args.drive_credentials.clone(),
    })
}

fn ensure_dir(path: &Path) -> Result<(), AppError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "Site repository '{}' is not a directory.",
            path.display()
        )))
    }
}

/// Rewrite argv so `commodity-charts` defaults to `commodity-charts run`.
///
/// Rules:
/// - `commodity-charts`                   -> `commodity-charts run`
/// - `commodity-charts --publish ...`     -> `commodity-charts run --publish ...`
/// - `commodity-charts --help/--version`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "returns" | "publish");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::Retention;
    use crate::error::ErrorKind;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["commodity-charts", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn bare_invocation_defaults_to_run() {
        assert_eq!(rewrite_args(vec!["cc".into()]), vec!["cc", "run"]);
        assert_eq!(
            rewrite_args(vec!["cc".into(), "--publish".into()]),
            vec!["cc", "run", "--publish"]
        );
        assert_eq!(rewrite_args(vec!["cc".into(), "--help".into()]), vec!["cc", "--help"]);
        assert_eq!(
            rewrite_args(vec!["cc".into(), "returns".into(), "-s".into(), "GC=F".into()]),
            vec!["cc", "returns", "-s", "GC=F"]
        );
    }

    #[test]
    fn local_defaults() {
        let config = config_from_args(&run_args(&[]), || None).unwrap();
        assert_eq!(config.instruments.len(), DEFAULT_SYMBOLS.len());
        assert_eq!(config.snapshot_names.len(), DEFAULT_SNAPSHOT_NAMES.len());
        assert_eq!(config.retention, Retention::Years(1));
        assert_eq!(config.table_rows, 10);
        assert!(!config.publish.is_publish());
        assert!(config.snapshots_enabled);
    }

    #[test]
    fn returns_rejects_an_empty_window() {
        let parse = |extra: &[&str]| {
            let mut argv = vec!["commodity-charts", "returns", "-s", "GC=F"];
            argv.extend_from_slice(extra);
            match Cli::parse_from(argv).command {
                Command::Returns(args) => args,
                _ => unreachable!(),
            }
        };

        let err = returns_config(&parse(&["--years", "0"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(returns_config(&parse(&["--rows", "0"])).is_err());

        let (instrument, config) = returns_config(&parse(&["--keep-rows", "60"])).unwrap();
        assert_eq!(instrument.symbol, "GC=F");
        assert_eq!(config.retention, Retention::Rows(60));
    }

    #[test]
    fn publish_without_token_is_a_config_error() {
        let args = run_args(&[
            "--publish",
            "--github-user",
            "user",
            "--github-repo",
            "charts",
            "--drive-folder",
            "abc",
        ]);
        let err = config_from_args(&args, || None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains(TOKEN_ENV));
    }

    #[test]
    fn publish_without_user_is_a_config_error() {
        let args = run_args(&["--publish", "--github-repo", "charts", "--drive-folder", "abc"]);
        let err = config_from_args(&args, || Some("tok".into())).unwrap_err();
        assert!(err.message().contains("--github-user"));
    }

    #[test]
    fn publish_target_derives_pages_url() {
        let dir = tempfile::tempdir().unwrap();
        let creds = dir.path().join("credentials.json");
        std::fs::write(&creds, "{}").unwrap();
        let repo = dir.path().to_str().unwrap().to_string();
        let creds_arg = creds.to_str().unwrap().to_string();

        let args = run_args(&[
            "--publish",
            "--github-user",
            "user",
            "--github-repo",
            "charts",
            "--drive-folder",
            "abc",
            "--repo-path",
            &repo,
            "--drive-credentials",
            &creds_arg,
        ]);
        let config = config_from_args(&args, || Some("tok".into())).unwrap();
        let PublishMode::Publish(target) = config.publish else {
            panic!("expected publish mode");
        };
        assert_eq!(target.pages_url, "https://user.github.io/charts/");
        assert_eq!(target.token, "tok");
    }
}
