//! The report pipeline shared by every subcommand.
//!
//! price fetch -> returns -> retained window + rows -> charts -> workbook
//! -> snapshot workbook -> publish
//!
//! External collaborators arrive through [`Collaborators`], so tests can run
//! the whole flow against in-memory fakes.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::data::{PriceSource, SnapshotSource};
use crate::domain::{Instrument, LayoutKind, PublishMode, PublishTarget, ReportConfig};
use crate::error::AppError;
use crate::io::save_workbook;
use crate::layout::{Block, BlockContent, Hyperlink, LayoutStrategy, WorkbookLayout};
use crate::math::compute_returns;
use crate::plot::{ChartRenderer, ChartRequest};
use crate::publish::{DriveApi, GitRunner, sync_site, upload_workbooks};
use crate::report::{ItemOutcome, PublishOutcome, ReportTable, RunReport, SectionReport, build_table, format_metadata_line};

/// Sheet holding every block of a consolidated workbook.
pub const CONSOLIDATED_SHEET: &str = "Commodity Charts";

pub type SnapshotOpener<'a> = &'a dyn Fn() -> Result<Box<dyn SnapshotSource>, AppError>;
pub type DriveConnector<'a> = &'a dyn Fn(&PublishTarget) -> Result<Box<dyn DriveApi>, AppError>;

/// Everything the pipeline talks to outside of pure computation.
pub struct Collaborators<'a> {
    pub prices: &'a dyn PriceSource,
    pub renderer: &'a dyn ChartRenderer,
    /// Started only when the snapshot section runs; dropped right after it.
    pub open_snapshots: SnapshotOpener<'a>,
    pub git: &'a dyn GitRunner,
    pub connect_drive: DriveConnector<'a>,
}

/// Run every section, then publish when configured.
///
/// Only failures to write the local reports are returned as errors. Per-item
/// failures are recorded in the sections; publish failures in `publish`.
pub fn run_report(config: &ReportConfig, deps: &Collaborators<'_>, now: NaiveDateTime) -> Result<RunReport, AppError> {
    log::info!("Step 1: price charts for {} instrument(s)", config.instruments.len());
    let mut sections = vec![build_price_report(config, deps.prices, deps.renderer)?];

    if config.snapshots_enabled {
        log::info!("Step 2: snapshot charts for {} name(s)", config.snapshot_names.len());
        sections.push(build_snapshot_report(config, deps.open_snapshots)?);
    } else {
        log::info!("Step 2: snapshot charts disabled");
    }

    let publish = publish_step(config, deps.git, deps.connect_drive, now);
    Ok(RunReport { sections, publish })
}

/// Push the site repository, then upload whatever workbooks exist.
///
/// The two sub-steps are independent: a failed push still uploads, and a
/// failed drive login still leaves the site pushed.
pub fn publish_step(
    config: &ReportConfig,
    git: &dyn GitRunner,
    connect_drive: DriveConnector<'_>,
    now: NaiveDateTime,
) -> PublishOutcome {
    let PublishMode::Publish(target) = &config.publish else {
        log::info!("Step 3: publishing disabled (local mode)");
        return PublishOutcome::Disabled;
    };

    log::info!("Step 3a: pushing interactive charts from {}", target.repo_path.display());
    let site = sync_site(git, target, now);
    if let Err(err) = &site {
        log::error!("Site push failed: {err}");
    }

    log::info!("Step 3b: uploading workbooks");
    let workbooks = output_files(config);
    let uploads = connect_drive(target).and_then(|drive| upload_workbooks(target, drive.as_ref(), &workbooks));
    if let Err(err) = &uploads {
        log::error!("Workbook upload failed: {err}");
    }

    PublishOutcome::Attempted { site, uploads }
}

/// Directory receiving the interactive documents.
pub fn html_dir(mode: &PublishMode) -> &Path {
    match mode {
        PublishMode::Local { html_dir } => html_dir,
        PublishMode::Publish(target) => &target.repo_path,
    }
}

/// Build and save the price workbook. Failing instruments are skipped.
pub fn build_price_report(
    config: &ReportConfig,
    prices: &dyn PriceSource,
    renderer: &dyn ChartRenderer,
) -> Result<SectionReport, AppError> {
    let html_dir = html_dir(&config.publish);
    std::fs::create_dir_all(html_dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", html_dir.display())))?;

    let strategy = match config.layout {
        LayoutKind::PerSheet => LayoutStrategy::SheetPerInstrument,
        LayoutKind::Consolidated => LayoutStrategy::Consolidated {
            sheet_name: CONSOLIDATED_SHEET.to_string(),
        },
    };
    let mut layout = WorkbookLayout::new(strategy);
    let mut section = SectionReport::new("Price charts", config.workbook_path.clone());

    let total = config.instruments.len();
    for (idx, instrument) in config.instruments.iter().enumerate() {
        let label = instrument.full_name();
        log::info!("[{}/{total}] {label}", idx + 1);

        match render_instrument(config, prices, renderer, instrument, idx, html_dir) {
            Ok((block, rows)) => {
                let span = layout.append(&instrument.sheet_name(), block);
                section.record(ItemOutcome::Rendered {
                    label,
                    detail: format!("{rows} rows, sheet rows {}-{}", span.start + 1, span.end),
                });
            }
            Err(error) => {
                log::warn!("Skipping {label}: {error}");
                section.record(ItemOutcome::Skipped { label, error });
            }
        }
    }

    save_workbook(&layout, &config.workbook_path)?;
    Ok(section)
}

fn render_instrument(
    config: &ReportConfig,
    prices: &dyn PriceSource,
    renderer: &dyn ChartRenderer,
    instrument: &Instrument,
    idx: usize,
    html_dir: &Path,
) -> Result<(Block, usize), AppError> {
    let table = instrument_table(config, prices, instrument)?;
    let title = instrument.full_name();
    let request = ChartRequest {
        window: &table.window,
        title: &title,
        palette_index: idx,
    };

    let image = renderer.render_static(&request)?;
    let file_name = instrument.html_file_name();
    let html_path = html_dir.join(&file_name);
    renderer.render_interactive(&request, &html_path)?;

    let link = match &config.publish {
        PublishMode::Publish(target) => Hyperlink::pages(&target.pages_url, &file_name),
        PublishMode::Local { .. } => {
            let absolute = std::fs::canonicalize(&html_path)
                .map_err(|e| AppError::io(format!("Failed to resolve '{}': {e}", html_path.display())))?;
            Hyperlink::local(&absolute)
        }
    };

    let n_rows = table.rows.len();
    let block = Block {
        title,
        content: BlockContent::Price {
            link,
            metadata: format_metadata_line(&table),
            rows: table.rows,
            image,
        },
    };
    Ok((block, n_rows))
}

/// Fetch one instrument and build its report table.
pub fn instrument_table(
    config: &ReportConfig,
    prices: &dyn PriceSource,
    instrument: &Instrument,
) -> Result<ReportTable, AppError> {
    let series = prices.fetch_series(instrument, &config.history_range)?;
    let returns = compute_returns(&series);
    build_table(&returns, config.retention, config.table_rows)
}

/// Build and save the snapshot workbook (one consolidated sheet).
pub fn build_snapshot_report(config: &ReportConfig, open: SnapshotOpener<'_>) -> Result<SectionReport, AppError> {
    let mut layout = WorkbookLayout::new(LayoutStrategy::Consolidated {
        sheet_name: CONSOLIDATED_SHEET.to_string(),
    });
    let mut section = SectionReport::new("Snapshot charts", config.snapshot_workbook_path.clone());

    match open() {
        Ok(mut source) => {
            capture_snapshots(source.as_mut(), &config.snapshot_names, &mut layout, &mut section);
            // Release the browser before writing the file.
            drop(source);
        }
        Err(error) => {
            log::error!("Snapshot source unavailable: {error}");
            for name in &config.snapshot_names {
                section.record(ItemOutcome::Skipped {
                    label: name.clone(),
                    error: error.clone(),
                });
            }
        }
    }

    save_workbook(&layout, &config.snapshot_workbook_path)?;
    Ok(section)
}

fn capture_snapshots(
    source: &mut dyn SnapshotSource,
    names: &[String],
    layout: &mut WorkbookLayout,
    section: &mut SectionReport,
) {
    for name in names {
        match source.capture(name) {
            Ok(snapshot) => {
                let label = snapshot.title.clone();
                let span = layout.append(
                    CONSOLIDATED_SHEET,
                    Block {
                        title: snapshot.title,
                        content: BlockContent::Snapshot { image: snapshot.image },
                    },
                );
                section.record(ItemOutcome::Rendered {
                    label,
                    detail: format!("sheet rows {}-{}", span.start + 1, span.end),
                });
            }
            Err(error) => {
                log::warn!("Skipping snapshot '{name}': {error}");
                section.record(ItemOutcome::Skipped {
                    label: name.clone(),
                    error,
                });
            }
        }
    }
}

/// Output files of a run, in upload order.
pub fn output_files(config: &ReportConfig) -> Vec<PathBuf> {
    let mut out = vec![config.workbook_path.clone()];
    if config.snapshots_enabled {
        out.push(config.snapshot_workbook_path.clone());
    }
    out
}
