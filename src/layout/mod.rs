//! Worksheet layout arithmetic.
//!
//! This module decides *where* every cell, merge and image goes; it never
//! touches a spreadsheet library. `io::workbook` replays the resulting
//! placements into an `.xlsx` file.
//!
//! Each sheet owns a single row cursor. Appending a block places its cells
//! relative to the cursor, then advances it past the taller of the text and
//! the image, plus padding. Blocks therefore never overlap.
//!
//! Two strategies share the same block arithmetic:
//! - `SheetPerInstrument`: every block opens a fresh sheet
//! - `Consolidated`: every block is stacked on one sheet

use std::path::{Path, PathBuf};

use crate::plot::ChartImage;
use crate::report::ReportRow;

/// Last column of the merged title / metadata cells of a price block (G).
pub const TITLE_LAST_COL: u16 = 6;
/// Anchor column of the static chart beside the price table (H).
pub const IMAGE_COL: u16 = 7;
/// Last column of the merged title of a snapshot block (W).
pub const SNAPSHOT_TITLE_LAST_COL: u16 = 22;
/// Anchor column of snapshot images (G).
pub const SNAPSHOT_IMAGE_COL: u16 = 6;
/// Image pixels per worksheet row when sizing a block.
pub const ROW_HEIGHT_PX: f64 = 15.0;
/// Empty rows left between consecutive blocks.
pub const BLOCK_PADDING_ROWS: u32 = 2;
/// Height (points) of a snapshot title row.
pub const SNAPSHOT_TITLE_ROW_HEIGHT: f64 = 20.0;

pub const LINK_LABEL: &str = "Interactive Chart:";
pub const LINK_TEXT_PAGES: &str = "Click to open (GitHub Page)";
pub const LINK_TEXT_LOCAL: &str = "Click to open (Local File)";

pub const TABLE_HEADERS: [&str; 7] = ["Date", "Close", "Daily %", "Weekly %", "Monthly %", "YoY %", "YTD %"];

/// Column widths applied to sheets holding price blocks (A..G).
pub const PRICE_COLUMN_WIDTHS: [(u16, f64); 7] =
    [(0, 12.0), (1, 12.0), (2, 11.0), (3, 11.0), (4, 11.0), (5, 11.0), (6, 11.0)];

// Offsets of the price-block rows relative to the cursor.
const LINK_ROW: u32 = 1;
const METADATA_ROW: u32 = 2;
const HEADER_ROW: u32 = 4;
const FIRST_DATA_ROW: u32 = 5;

/// Color class of a return cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    /// `> 0` positive, `< 0` negative, zero / undefined / NaN neutral.
    pub fn of(value: Option<f64>) -> Tone {
        match value {
            Some(v) if v > 0.0 => Tone::Positive,
            Some(v) if v < 0.0 => Tone::Negative,
            _ => Tone::Neutral,
        }
    }

    /// Font color, `None` for the default font.
    pub fn font_rgb(self) -> Option<u32> {
        match self {
            Tone::Positive => Some(0x00B050),
            Tone::Negative => Some(0xFF0000),
            Tone::Neutral => None,
        }
    }
}

/// Where a hyperlink points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Url(String),
    /// Absolute filesystem path of a local document.
    LocalFile(PathBuf),
}

impl LinkTarget {
    /// The target as the spreadsheet stores it.
    pub fn to_url(&self) -> String {
        match self {
            LinkTarget::Url(url) => url.clone(),
            LinkTarget::LocalFile(path) => {
                let p = path.to_string_lossy().replace('\\', "/");
                format!("file:///{}", p.trim_start_matches('/'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub text: String,
    pub target: LinkTarget,
}

impl Hyperlink {
    /// Link to a document served from the static site.
    pub fn pages(base_url: &str, file_name: &str) -> Self {
        Self {
            text: LINK_TEXT_PAGES.to_string(),
            target: LinkTarget::Url(format!("{base_url}{file_name}")),
        }
    }

    /// Link to a local document; the path must already be absolute.
    pub fn local(absolute_path: &Path) -> Self {
        Self {
            text: LINK_TEXT_LOCAL.to_string(),
            target: LinkTarget::LocalFile(absolute_path.to_path_buf()),
        }
    }
}

/// Visual role of a placed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Title,
    SnapshotTitle,
    LinkLabel,
    Metadata,
    Header,
    Date,
    Close,
    Return(Tone),
}

/// One layout instruction. Rows and columns are zero-based.
#[derive(Debug, Clone)]
pub enum Placement {
    Merged {
        row: u32,
        first_col: u16,
        last_col: u16,
        text: String,
        style: CellStyle,
    },
    Text {
        row: u32,
        col: u16,
        text: String,
        style: CellStyle,
    },
    /// `None` writes an empty, styled cell.
    Number {
        row: u32,
        col: u16,
        value: Option<f64>,
        style: CellStyle,
    },
    Link {
        row: u32,
        col: u16,
        link: Hyperlink,
    },
    Image {
        row: u32,
        col: u16,
        image: ChartImage,
    },
    RowHeight {
        row: u32,
        height: f64,
    },
}

/// What a block shows.
#[derive(Debug, Clone)]
pub enum BlockContent {
    /// Title, link, metadata, return table and static chart of one instrument.
    Price {
        link: Hyperlink,
        metadata: String,
        rows: Vec<ReportRow>,
        image: ChartImage,
    },
    /// Title and a captured chart image.
    Snapshot { image: ChartImage },
}

#[derive(Debug, Clone)]
pub struct Block {
    pub title: String,
    pub content: BlockContent,
}

/// Rows occupied by a placed block, `[start, end)`, padding excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: u32,
    pub end: u32,
}

/// Cell assignments for one worksheet.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    name: String,
    cursor: u32,
    placements: Vec<Placement>,
    column_widths: Vec<(u16, f64)>,
}

impl SheetLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cursor: 0,
            placements: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next free row.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn column_widths(&self) -> &[(u16, f64)] {
        &self.column_widths
    }

    /// Place `block` at the cursor and advance the cursor past it.
    pub fn place(&mut self, block: Block) -> BlockSpan {
        let start = self.cursor;
        let rows_used = match block.content {
            BlockContent::Price {
                link,
                metadata,
                rows,
                image,
            } => {
                if self.column_widths.is_empty() {
                    self.column_widths = PRICE_COLUMN_WIDTHS.to_vec();
                }
                self.place_price(start, block.title, link, metadata, rows, image)
            }
            BlockContent::Snapshot { image } => self.place_snapshot(start, block.title, image),
        };

        let end = start + rows_used;
        self.cursor = end + BLOCK_PADDING_ROWS;
        BlockSpan { start, end }
    }

    fn place_price(
        &mut self,
        r: u32,
        title: String,
        link: Hyperlink,
        metadata: String,
        rows: Vec<ReportRow>,
        image: ChartImage,
    ) -> u32 {
        self.placements.push(Placement::Merged {
            row: r,
            first_col: 0,
            last_col: TITLE_LAST_COL,
            text: title,
            style: CellStyle::Title,
        });
        self.placements.push(Placement::Text {
            row: r + LINK_ROW,
            col: 0,
            text: LINK_LABEL.to_string(),
            style: CellStyle::LinkLabel,
        });
        self.placements.push(Placement::Link {
            row: r + LINK_ROW,
            col: 1,
            link,
        });
        self.placements.push(Placement::Merged {
            row: r + METADATA_ROW,
            first_col: 0,
            last_col: TITLE_LAST_COL,
            text: metadata,
            style: CellStyle::Metadata,
        });

        for (col, header) in TABLE_HEADERS.iter().enumerate() {
            self.placements.push(Placement::Text {
                row: r + HEADER_ROW,
                col: col as u16,
                text: (*header).to_string(),
                style: CellStyle::Header,
            });
        }

        let n_rows = rows.len() as u32;
        for (i, row) in rows.into_iter().enumerate() {
            let at = r + FIRST_DATA_ROW + i as u32;
            self.placements.push(Placement::Text {
                row: at,
                col: 0,
                text: row.date,
                style: CellStyle::Date,
            });
            self.placements.push(Placement::Number {
                row: at,
                col: 1,
                value: Some(row.close),
                style: CellStyle::Close,
            });
            for (j, value) in row.returns.into_iter().enumerate() {
                self.placements.push(Placement::Number {
                    row: at,
                    col: 2 + j as u16,
                    value,
                    style: CellStyle::Return(Tone::of(value)),
                });
            }
        }

        let image_rows = image_row_span(&image);
        self.placements.push(Placement::Image {
            row: r,
            col: IMAGE_COL,
            image,
        });

        (FIRST_DATA_ROW + n_rows).max(image_rows)
    }

    fn place_snapshot(&mut self, r: u32, title: String, image: ChartImage) -> u32 {
        self.placements.push(Placement::Merged {
            row: r,
            first_col: 0,
            last_col: SNAPSHOT_TITLE_LAST_COL,
            text: title,
            style: CellStyle::SnapshotTitle,
        });
        self.placements.push(Placement::RowHeight {
            row: r,
            height: SNAPSHOT_TITLE_ROW_HEIGHT,
        });

        let image_rows = 1 + image_row_span(&image);
        self.placements.push(Placement::Image {
            row: r + 1,
            col: SNAPSHOT_IMAGE_COL,
            image,
        });

        image_rows.max(1)
    }
}

/// Rows covered by an image at its display height.
pub fn image_row_span(image: &ChartImage) -> u32 {
    let h = image.display_height();
    if !(h.is_finite() && h > 0.0) {
        return 0;
    }
    (h / ROW_HEIGHT_PX) as u32
}

/// Sheet arrangement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutStrategy {
    SheetPerInstrument,
    Consolidated { sheet_name: String },
}

/// All sheets of one workbook, in creation order.
#[derive(Debug, Clone)]
pub struct WorkbookLayout {
    strategy: LayoutStrategy,
    sheets: Vec<SheetLayout>,
}

impl WorkbookLayout {
    pub fn new(strategy: LayoutStrategy) -> Self {
        let sheets = match &strategy {
            LayoutStrategy::SheetPerInstrument => Vec::new(),
            LayoutStrategy::Consolidated { sheet_name } => vec![SheetLayout::new(sheet_name.clone())],
        };
        Self { strategy, sheets }
    }

    pub fn sheets(&self) -> &[SheetLayout] {
        &self.sheets
    }

    /// Append a block. `sheet_name` is only used by `SheetPerInstrument`.
    pub fn append(&mut self, sheet_name: &str, block: Block) -> BlockSpan {
        if self.strategy == LayoutStrategy::SheetPerInstrument {
            let name = self.unique_sheet_name(sheet_name);
            self.sheets.push(SheetLayout::new(name));
        }
        match self.sheets.last_mut() {
            Some(sheet) => sheet.place(block),
            None => {
                let mut sheet = SheetLayout::new(sheet_name);
                let span = sheet.place(block);
                self.sheets.push(sheet);
                span
            }
        }
    }

    fn unique_sheet_name(&self, base: &str) -> String {
        let taken = |name: &str| self.sheets.iter().any(|s| s.name.eq_ignore_ascii_case(name));
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| {
                let suffix = format!("_{n}");
                let keep = 31usize.saturating_sub(suffix.len());
                let head: String = base.chars().take(keep).collect();
                format!("{head}{suffix}")
            })
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}
