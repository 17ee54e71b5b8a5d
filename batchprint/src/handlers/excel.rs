//! Spreadsheets.
//!
//! Printed page counts depend on print areas, margins and fonts that only
//! Excel knows. Sheets with manual page breaks are counted exactly from the
//! breaks; every other sheet is estimated from its used range against a
//! fixed page capacity, and the whole workbook is then reported as
//! approximate.

use calamine::{Reader, open_workbook_auto};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::ooxml::ensure_not_encrypted;
use super::{office_measure, office_print, report_print, subject, unexpected_measurement};
use crate::automation::{OfficeApp, OfficeEngine, OfficeMeasurement, SheetLayout};
use crate::config::PrintSettings;
use crate::document::{FileType, extension_of};
use crate::handler::{FallbackChain, Handler, HandlerError, PageCount, classify_failure};

/// Rows assumed to fit on one printed page.
pub const ROWS_PER_PAGE: u32 = 45;

/// Columns assumed to fit across one printed page.
pub const COLUMNS_PER_PAGE: u32 = 8;

/// Pages one sheet prints on, and whether that number is estimated.
pub fn sheet_pages(sheet: &SheetLayout) -> (i64, bool) {
    if sheet.horizontal_breaks > 0 || sheet.vertical_breaks > 0 {
        let pages = (i64::from(sheet.horizontal_breaks) + 1) * (i64::from(sheet.vertical_breaks) + 1);
        return (pages, false);
    }
    if sheet.rows == 0 || sheet.columns == 0 {
        return (1, false);
    }
    let down = sheet.rows.div_ceil(ROWS_PER_PAGE);
    let across = sheet.columns.div_ceil(COLUMNS_PER_PAGE);
    (i64::from(down) * i64::from(across), true)
}

/// Total pages of a workbook, at least one.
///
/// # Errors
///
/// [`HandlerError::InvalidCount`] if the total does not fit a page count.
pub fn workbook_pages(sheets: &[SheetLayout]) -> Result<PageCount, HandlerError> {
    let mut total: i64 = 0;
    let mut approximate = false;
    for sheet in sheets {
        let (pages, estimated) = sheet_pages(sheet);
        debug!(sheet = %sheet.name, pages, estimated, "sheet measured");
        total = total.saturating_add(pages);
        approximate |= estimated;
    }
    let total = total.max(1);

    if approximate {
        PageCount::estimated(total)
    } else {
        PageCount::exact(total)
    }
}

/// Used ranges of every sheet, read without Excel.
fn read_used_ranges(path: &Path) -> Result<Vec<SheetLayout>, HandlerError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| classify_failure(&e.to_string()))?;
    let names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| classify_failure(&format!("sheet '{name}': {e}")))?;
        let (rows, columns) = range.get_size();
        sheets.push(SheetLayout {
            name,
            rows: u32::try_from(rows).unwrap_or(u32::MAX),
            columns: u32::try_from(columns).unwrap_or(u32::MAX),
            ..SheetLayout::default()
        });
    }
    Ok(sheets)
}

/// Counts printed pages through Excel, or estimates them from used ranges.
pub struct ExcelHandler {
    office: Arc<dyn OfficeEngine>,
}

impl ExcelHandler {
    /// Create a handler driving `office`.
    pub fn new(office: Arc<dyn OfficeEngine>) -> Self {
        Self { office }
    }

    fn automation_count(&self, path: &Path) -> Result<PageCount, HandlerError> {
        match office_measure(self.office.as_ref(), OfficeApp::Excel, path)? {
            OfficeMeasurement::Sheets(sheets) => workbook_pages(&sheets),
            other => Err(unexpected_measurement(OfficeApp::Excel, &other)),
        }
    }
}

impl Handler for ExcelHandler {
    fn name(&self) -> &'static str {
        "excel"
    }

    fn supported_file_types(&self) -> &[FileType] {
        &[FileType::Excel]
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".xls", ".xlsx", ".et"]
    }

    fn count_pages(&self, path: &Path) -> Result<PageCount, HandlerError> {
        ensure_not_encrypted(path)?;
        // calamine has no reader for the WPS spreadsheet format.
        let readable = extension_of(path).as_deref() != Some(".et");

        FallbackChain::new(subject(path))
            .attempt("automation", || self.automation_count(path))
            .attempt_if(readable, "used range", || workbook_pages(&read_used_ranges(path)?))
            .run()
    }

    fn print_document(&self, path: &Path, settings: &PrintSettings) -> bool {
        let result = ensure_not_encrypted(path)
            .and_then(|()| office_print(self.office.as_ref(), OfficeApp::Excel, path, settings));
        report_print(self.name(), path, result)
    }
}
