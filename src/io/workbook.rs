//! `.xlsx` output: replays a [`WorkbookLayout`] with `rust_xlsxwriter`.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Image, Workbook, Worksheet, XlsxError};

use crate::error::AppError;
use crate::layout::{CellStyle, Placement, SheetLayout, Tone, WorkbookLayout};

const CLOSE_NUM_FORMAT: &str = "#,##0.00";
const RETURN_NUM_FORMAT: &str = "0.00";

/// Write `layout` to `path`, replacing any existing file.
pub fn save_workbook(layout: &WorkbookLayout, path: &Path) -> Result<(), AppError> {
    let mut workbook = build_workbook(layout)
        .map_err(|e| AppError::render(format!("Failed to build workbook '{}': {e}", path.display())))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    workbook
        .save(path)
        .map_err(|e| AppError::io(format!("Failed to save workbook '{}': {e}", path.display())))?;

    log::info!("Saved {}", path.display());
    Ok(())
}

fn build_workbook(layout: &WorkbookLayout) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    if layout.sheets().is_empty() {
        // An xlsx file needs at least one sheet.
        workbook.add_worksheet();
        return Ok(workbook);
    }
    for sheet in layout.sheets() {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }
    Ok(workbook)
}

fn write_sheet(ws: &mut Worksheet, sheet: &SheetLayout) -> Result<(), XlsxError> {
    ws.set_name(sheet.name())?;

    for &(col, width) in sheet.column_widths() {
        ws.set_column_width(col, width)?;
    }

    for placement in sheet.placements() {
        match placement {
            Placement::Merged {
                row,
                first_col,
                last_col,
                text,
                style,
            } => {
                ws.merge_range(*row, *first_col, *row, *last_col, text, &format_for(*style))?;
            }
            Placement::Text { row, col, text, style } => {
                ws.write_string_with_format(*row, *col, text, &format_for(*style))?;
            }
            Placement::Number { row, col, value, style } => match value {
                Some(v) if v.is_finite() => {
                    ws.write_number_with_format(*row, *col, *v, &format_for(*style))?;
                }
                _ => {
                    ws.write_blank(*row, *col, &format_for(*style))?;
                }
            },
            Placement::Link { row, col, link } => {
                ws.write_url_with_text(*row, *col, link.target.to_url().as_str(), link.text.as_str())?;
            }
            Placement::Image { row, col, image } => {
                let picture = Image::new_from_buffer(&image.png)?
                    .set_scale_width(image.scale)
                    .set_scale_height(image.scale);
                ws.insert_image(*row, *col, &picture)?;
            }
            Placement::RowHeight { row, height } => {
                ws.set_row_height(*row, *height)?;
            }
        }
    }
    Ok(())
}

fn format_for(style: CellStyle) -> Format {
    match style {
        CellStyle::Title => Format::new()
            .set_bold()
            .set_font_size(16)
            .set_font_color(Color::RGB(0x2C3E50))
            .set_align(FormatAlign::Center),
        CellStyle::SnapshotTitle => Format::new()
            .set_bold()
            .set_font_size(14)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter),
        CellStyle::LinkLabel => Format::new().set_bold(),
        CellStyle::Metadata => Format::new().set_font_size(10).set_font_color(Color::RGB(0x7F8C8D)),
        CellStyle::Header => Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x4472C4))
            .set_align(FormatAlign::Center),
        CellStyle::Date => Format::new(),
        CellStyle::Close => Format::new().set_num_format(CLOSE_NUM_FORMAT),
        CellStyle::Return(tone) => tone_format(tone),
    }
}

fn tone_format(tone: Tone) -> Format {
    let base = Format::new().set_num_format(RETURN_NUM_FORMAT);
    match tone.font_rgb() {
        Some(rgb) => base.set_font_color(Color::RGB(rgb)),
        None => base,
    }
}
