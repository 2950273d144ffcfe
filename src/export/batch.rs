//! Batch export: many images in, one zip archive out.
//!
//! The archive holds one annotated PNG per decodable upload under
//! `annotated_images/` plus `tabla_puntos.xlsx` with one sheet per image.
//! Decoding, classification, rendering and PNG encoding run in parallel;
//! naming and archive assembly then run in input order so that collision
//! suffixes are deterministic.

use rayon::prelude::*;
use rust_xlsxwriter::Workbook;
use std::io::{Cursor, Write};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::annotation::generate_random;
use crate::error::Result;
use crate::export::naming::{NamingResolver, file_stem, safe_filename, safe_sheet_name};
use crate::export::{Cell, SheetTable};
use crate::models::PointRecord;
use crate::pipeline::{Annotator, decode_rgb};

pub const ARCHIVE_IMAGE_DIR: &str = "annotated_images";
pub const WORKBOOK_ENTRY: &str = "tabla_puntos.xlsx";
pub const EMPTY_SHEET_NAME: &str = "Sin datos";

/// One uploaded file
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-side filename, if the client sent one
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes,
        }
    }

    /// Filename to report, with `imagen_<position>.png` standing in for a
    /// missing or empty one. `position` is 1-based.
    pub fn display_name(&self, position: usize) -> String {
        match self.filename.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("imagen_{position}.png"),
        }
    }
}

/// A processed image and where its results went
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// 1-based position in the upload list
    pub position: usize,
    /// Sanitized upload filename, extension included
    pub source_name: String,
    /// Collision-free stem used for the archive entry
    pub sanitized_base_name: String,
    pub sheet_name: String,
    pub archive_path: String,
    pub points: Vec<PointRecord>,
}

/// Entries in input order plus the names already handed out.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub entries: Vec<BatchEntry>,
    sheet_names: NamingResolver,
    file_names: NamingResolver,
}

impl Default for BatchJob {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            sheet_names: NamingResolver::for_sheets(),
            file_names: NamingResolver::for_files(),
        }
    }
}

impl BatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim names for the next processed image and record it.
    pub fn push(&mut self, position: usize, source_name: String, points: Vec<PointRecord>) -> &BatchEntry {
        let stem = file_stem(&source_name);
        let sheet_name = self.sheet_names.claim(&safe_sheet_name(stem));
        let base = self.file_names.claim(stem);
        let archive_path = format!("{ARCHIVE_IMAGE_DIR}/{base} (anotada).png");

        let index = self.entries.len();
        self.entries.push(BatchEntry {
            position,
            source_name,
            sanitized_base_name: base,
            sheet_name,
            archive_path,
            points,
        });
        &self.entries[index]
    }
}

/// The finished archive
#[derive(Debug, Clone)]
pub struct BatchArchive {
    /// Suggested download name, `resultados_coral_<YYYYMMDD_HHMMSS>.zip`
    pub filename: String,
    pub bytes: Vec<u8>,
    pub entries: Vec<BatchEntry>,
    /// Names of uploads that could not be decoded, in input order
    pub skipped: Vec<String>,
}

/// Sheet for one image: `imagen` and `modelo` rows, a blank row, then the
/// points table.
pub fn batch_sheet(entry: &BatchEntry, model_id: &str) -> SheetTable {
    let mut table = SheetTable::new(&entry.sheet_name);
    table
        .rows
        .push(vec![Cell::text("imagen"), Cell::text(&entry.source_name)]);
    table
        .rows
        .push(vec![Cell::text("modelo"), Cell::text(model_id)]);
    table.rows.push(Vec::new());
    table.push_header();
    table.push_points(&entry.points, model_id);
    table
}

/// Placeholder sheet for a batch in which no image could be processed.
pub fn empty_sheet() -> SheetTable {
    let mut table = SheetTable::new(EMPTY_SHEET_NAME);
    table
        .rows
        .push(vec![Cell::text("No se pudo procesar ninguna imagen")]);
    table
}

pub fn archive_filename(timestamp: OffsetDateTime) -> Result<String> {
    let stamp = timestamp.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    Ok(format!("resultados_coral_{stamp}.zip"))
}

/// Local time for the archive name, or UTC when the local offset is unknown.
fn archive_timestamp() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|e| {
        debug!(error = %e, "local offset unavailable, stamping archive in UTC");
        OffsetDateTime::now_utc()
    })
}

enum Outcome {
    Done {
        source_name: String,
        png: Vec<u8>,
        points: Vec<PointRecord>,
    },
    Skipped(String),
}

pub struct BatchExporter<'a> {
    annotator: &'a Annotator,
}

impl<'a> BatchExporter<'a> {
    pub fn new(annotator: &'a Annotator) -> Self {
        Self { annotator }
    }

    /// Process `images` with `n` random points each and pack the results.
    pub fn export(&self, images: &[UploadedImage], n: usize, model_id: &str) -> Result<BatchArchive> {
        self.export_at(images, n, model_id, archive_timestamp())
    }

    /// [`export`](Self::export) with a fixed archive timestamp.
    pub fn export_at(
        &self,
        images: &[UploadedImage],
        n: usize,
        model_id: &str,
        timestamp: OffsetDateTime,
    ) -> Result<BatchArchive> {
        let settings = self.annotator.settings();
        settings.check_batch_size(images.len())?;
        settings.check_points(n)?;
        let classifier = self.annotator.classifiers().get(model_id)?;

        let outcomes = images
            .par_iter()
            .enumerate()
            .map(|(i, upload)| -> Result<Outcome> {
                let position = i + 1;
                let source_name = safe_filename(&upload.display_name(position));
                let image = match decode_rgb(&source_name, &upload.bytes) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!(image = %source_name, position, error = %e, "skipping undecodable image");
                        return Ok(Outcome::Skipped(source_name));
                    }
                };

                let (width, height) = image.dimensions();
                let mut rng = self.annotator.rng_for(i);
                let points = generate_random(&mut rng, width, height, n, settings.margin);
                let annotated = self.annotator.annotate(classifier.as_ref(), image, points)?;
                debug!(image = %source_name, position, width, height, "batch image annotated");

                Ok(Outcome::Done {
                    source_name,
                    png: annotated.to_png()?,
                    points: annotated.records(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut workbook = Workbook::new();
        let mut job = BatchJob::new();
        let mut skipped = Vec::new();

        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Outcome::Skipped(name) => skipped.push(name),
                Outcome::Done {
                    source_name,
                    png,
                    points,
                } => {
                    let entry = job.push(i + 1, source_name, points);
                    zip.start_file(entry.archive_path.as_str(), options)?;
                    zip.write_all(&png)?;
                    workbook.push_worksheet(batch_sheet(entry, model_id).to_worksheet()?);
                }
            }
        }
        if job.entries.is_empty() {
            workbook.push_worksheet(empty_sheet().to_worksheet()?);
        }

        zip.start_file(WORKBOOK_ENTRY, options)?;
        zip.write_all(&workbook.save_to_buffer()?)?;
        let bytes = zip.finish()?.into_inner();

        let filename = archive_filename(timestamp)?;
        info!(
            archive = %filename,
            model = model_id,
            images = images.len(),
            processed = job.entries.len(),
            skipped = skipped.len(),
            size = bytes.len(),
            "batch archive written"
        );
        Ok(BatchArchive {
            filename,
            bytes,
            entries: job.entries,
            skipped,
        })
    }
}
