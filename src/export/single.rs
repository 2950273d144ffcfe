use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::error::Result;
use crate::export::SheetTable;
use crate::models::PointRecord;

pub const SINGLE_SHEET_NAME: &str = "Puntos";
pub const SINGLE_FILE_NAME: &str = "puntos_coral.xlsx";

/// The `Puntos` table: header row, then one row per record as submitted.
pub fn single_sheet(records: &[PointRecord], model_id: &str) -> SheetTable {
    let mut table = SheetTable::new(SINGLE_SHEET_NAME);
    table.push_header();
    table.push_points(records, model_id);
    table
}

/// Serialize one point set as an xlsx workbook.
pub fn export_single(records: &[PointRecord], model_id: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    workbook.push_worksheet(single_sheet(records, model_id).to_worksheet()?);
    let bytes = workbook.save_to_buffer()?;
    debug!(points = records.len(), model = model_id, size = bytes.len(), "single workbook written");
    Ok(bytes)
}
