#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

use calamine::{Data, Reader, Xlsx};
use std::io::{Cursor, Read};

/// Sheet names and cell grids of an xlsx workbook, in sheet order.
pub fn read_workbook(bytes: &[u8]) -> anyhow::Result<Vec<(String, Vec<Vec<Data>>)>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range.rows().map(|row| row.to_vec()).collect();
        sheets.push((name, rows));
    }
    Ok(sheets)
}

/// Entry names of a zip archive, plus the bytes of one named entry.
pub fn read_archive(bytes: &[u8], entry: &str) -> anyhow::Result<(Vec<String>, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))?;
    let names = (0..archive.len())
        .map(|i| Ok(archive.by_index(i)?.name().to_string()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut content = Vec::new();
    archive.by_name(entry)?.read_to_end(&mut content)?;
    Ok((names, content))
}
