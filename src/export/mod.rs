//! Spreadsheet and archive export of annotated point sets.
//!
//! Exporters first build a [`SheetTable`] (rows of [`Cell`]s) and only then
//! serialize it with rust_xlsxwriter, so the row layout can be checked without
//! parsing a workbook.

pub mod batch;
pub mod naming;
pub mod single;

pub use batch::{BatchArchive, BatchEntry, BatchExporter, UploadedImage};
pub use naming::{NamingResolver, safe_filename, safe_sheet_name};
pub use single::{export_single, single_sheet};

use rust_xlsxwriter::{Format, Worksheet};
use serde_json::Value;

use crate::error::Result;
use crate::models::PointRecord;

/// Column headers shared by every points table.
pub const POINT_COLUMNS: [&str; 10] = [
    "idx",
    "Etiqueta",
    "x",
    "y",
    "x_norm",
    "y_norm",
    "Predicción",
    "Confianza",
    "Modelo",
    "Método",
];

const COLUMN_WIDTHS: [f64; 10] = [8.0, 10.0, 10.0, 10.0, 14.0, 14.0, 20.0, 14.0, 16.0, 14.0];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Option<&Value>> for Cell {
    fn from(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Empty, Self::Number),
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Empty, Self::Number)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Empty, Self::text)
    }
}

/// One worksheet worth of cells. `rows[0]` is spreadsheet row 1; an empty row
/// is a blank line.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    /// Zero-based index of the column header row, rendered bold
    pub header_row: Option<usize>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            header_row: None,
        }
    }

    pub fn push_header(&mut self) {
        self.header_row = Some(self.rows.len());
        self.rows
            .push(POINT_COLUMNS.iter().map(|h| Cell::text(*h)).collect());
    }

    pub fn push_points(&mut self, records: &[PointRecord], model_id: &str) {
        self.rows
            .extend(records.iter().map(|r| point_row(r, model_id)));
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<Cell>] {
        match self.header_row {
            Some(h) => &self.rows[h + 1..],
            None => &self.rows,
        }
    }

    /// Serialize into a fresh worksheet.
    pub fn to_worksheet(&self) -> Result<Worksheet> {
        let mut sheet = Worksheet::new();
        sheet.set_name(&self.name)?;
        let bold = Format::new().set_bold();

        for (r, row) in self.rows.iter().enumerate() {
            let r = r as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        sheet.write_number(r, c, *n)?;
                    }
                    Cell::Text(s) if self.header_row == Some(r as usize) => {
                        sheet.write_string_with_format(r, c, s, &bold)?;
                    }
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                }
            }
        }

        for (c, width) in COLUMN_WIDTHS.iter().enumerate() {
            sheet.set_column_width(c as u16, *width)?;
        }
        Ok(sheet)
    }
}

/// Annotation method shown in the `Método` column.
pub fn infer_method(record: &PointRecord) -> &'static str {
    let method = record
        .method
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match method.as_str() {
        "manual" => return "manual",
        "automatico" => return "automatico",
        _ => {}
    }

    let source = record
        .source
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if source.starts_with("manual") {
        "manual"
    } else {
        "automatico"
    }
}

/// One data row in [`POINT_COLUMNS`] order.
pub fn point_row(record: &PointRecord, model_id: &str) -> Vec<Cell> {
    vec![
        Cell::from(record.idx.as_ref()),
        Cell::from(record.label.as_deref()),
        Cell::from(record.x.as_ref()),
        Cell::from(record.y.as_ref()),
        Cell::from(record.x_norm),
        Cell::from(record.y_norm),
        Cell::from(record.pred_label.as_deref()),
        Cell::from(record.confidence),
        Cell::text(model_id),
        Cell::text(infer_method(record)),
    ]
}
