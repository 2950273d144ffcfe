mod common;

use calamine::Data;
use common::*;
use quadrat::export::batch::{EMPTY_SHEET_NAME, WORKBOOK_ENTRY};
use quadrat::{BatchExporter, ErrorKind, UploadedImage};
use time::macros::datetime;

fn upload(name: &str, bytes: Vec<u8>) -> UploadedImage {
    UploadedImage::new(name, bytes)
}

#[test]
fn test_undecodable_image_is_skipped() -> anyhow::Result<()> {
    let annotator = test_annotator();
    let images = vec![
        upload("first.png", png_bytes(80, 60, TEST_RED)),
        upload("broken.jpg", b"definitely not a jpeg".to_vec()),
        upload("third.png", png_bytes(50, 90, TEST_BLUE)),
    ];

    let archive = BatchExporter::new(&annotator).export_at(
        &images,
        5,
        TEST_MODEL,
        datetime!(2025-01-31 23:59:58 UTC),
    )?;
    assert_eq!(archive.filename, "resultados_coral_20250131_235958.zip");
    assert_eq!(archive.skipped, ["broken.jpg"]);

    let positions: Vec<_> = archive.entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, [1, 3]);

    let (names, workbook) = read_archive(&archive.bytes, WORKBOOK_ENTRY)?;
    assert_eq!(
        names,
        [
            "annotated_images/first (anotada).png",
            "annotated_images/third (anotada).png",
            WORKBOOK_ENTRY,
        ]
    );

    let sheets = read_workbook(&workbook)?;
    let sheet_names: Vec<_> = sheets.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(sheet_names, ["first", "third"]);

    let rows = &sheets[1].1;
    assert_eq!(rows[0][0], Data::String("imagen".to_string()));
    assert_eq!(rows[0][1], Data::String("third.png".to_string()));
    assert_eq!(rows[1][1], Data::String(TEST_MODEL.to_string()));
    assert_eq!(rows[3][0], Data::String("idx".to_string()));
    assert_eq!(rows.len(), 4 + 5);
    assert!(rows[4..]
        .iter()
        .all(|r| r[6] == Data::String("Algas".to_string())));
    Ok(())
}

#[test]
fn test_colliding_names() -> anyhow::Result<()> {
    let annotator = test_annotator();
    let images = vec![
        upload("Img.png", png_bytes(40, 40, TEST_RED)),
        upload("dir/Img.jpg", png_bytes(40, 40, TEST_RED)),
        upload("Img.jpeg", png_bytes(40, 40, TEST_RED)),
    ];

    let archive = BatchExporter::new(&annotator).export(&images, 3, TEST_MODEL)?;
    let sheets: Vec<_> = archive.entries.iter().map(|e| e.sheet_name.as_str()).collect();
    assert_eq!(sheets, ["Img", "Img_2", "Img_3"]);

    let (names, workbook) = read_archive(&archive.bytes, WORKBOOK_ENTRY)?;
    for base in ["Img", "Img_2", "Img_3"] {
        assert!(names.contains(&format!("annotated_images/{base} (anotada).png")));
    }
    let written: Vec<_> = read_workbook(&workbook)?.into_iter().map(|(n, _)| n).collect();
    assert_eq!(written, ["Img", "Img_2", "Img_3"]);
    Ok(())
}

#[test]
fn test_nothing_decodable_gives_placeholder_sheet() -> anyhow::Result<()> {
    let annotator = test_annotator();
    let images = vec![upload("a.png", b"garbage".to_vec()), upload("", Vec::new())];

    let archive = BatchExporter::new(&annotator).export(&images, 3, TEST_MODEL)?;
    assert!(archive.entries.is_empty());
    assert_eq!(archive.skipped, ["a.png", "imagen_2.png"]);

    let (names, workbook) = read_archive(&archive.bytes, WORKBOOK_ENTRY)?;
    assert_eq!(names, [WORKBOOK_ENTRY]);
    let sheets = read_workbook(&workbook)?;
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].0, EMPTY_SHEET_NAME);
    Ok(())
}

#[test]
fn test_rejected_before_any_work() {
    let annotator = test_annotator();
    let exporter = BatchExporter::new(&annotator);
    let one = vec![upload("a.png", png_bytes(20, 20, TEST_RED))];
    let many: Vec<_> = (0..26)
        .map(|i| upload(&format!("{i}.png"), Vec::new()))
        .collect();

    let kind = |images: &[UploadedImage], n: usize, model: &str| {
        exporter
            .export(images, n, model)
            .map(|_| ())
            .unwrap_err()
            .kind()
    };
    let none: Vec<UploadedImage> = Vec::new();
    assert_eq!(kind(&none[..], 5, TEST_MODEL), ErrorKind::CountOutOfRange);
    assert_eq!(kind(&many[..], 5, TEST_MODEL), ErrorKind::CountOutOfRange);
    assert_eq!(kind(&one[..], 0, TEST_MODEL), ErrorKind::CountOutOfRange);
    assert_eq!(kind(&one[..], 5001, TEST_MODEL), ErrorKind::CountOutOfRange);
    assert_eq!(kind(&one[..], 5, "unknown"), ErrorKind::ModelNotFound);
}

#[test]
fn test_seeded_batch_is_reproducible() -> anyhow::Result<()> {
    let annotator = test_annotator();
    let images = vec![
        upload("a.png", png_bytes(120, 120, TEST_RED)),
        upload("b.png", png_bytes(120, 120, TEST_RED)),
    ];
    let exporter = BatchExporter::new(&annotator);

    let first = exporter.export(&images, 8, TEST_MODEL)?;
    let second = exporter.export(&images, 8, TEST_MODEL)?;
    assert_eq!(first.entries, second.entries);
    assert_ne!(first.entries[0].points, first.entries[1].points);
    Ok(())
}
