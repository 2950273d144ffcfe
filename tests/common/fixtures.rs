use image::{ImageBuffer, Rgb, RgbImage};
use quadrat::pipeline::encode_png;
use quadrat::{
    AnnotateError, Annotator, ClassPrediction, Classifier, ClassifierCache, ClassifierProvider,
    Result, Settings,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Model id the test provider knows about.
pub const TEST_MODEL: &str = "m1";

pub const TEST_RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const TEST_BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// PNG-encoded single-color image.
pub fn png_bytes(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let img: RgbImage = ImageBuffer::from_pixel(width, height, color);
    encode_png(&img).expect("Failed to encode test image")
}

/// Creates a 100x100 red test image on disk and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let img: RgbImage = ImageBuffer::from_pixel(100, 100, TEST_RED);
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Says "Coral" (class 1) when the patch is mostly red, "Algas" otherwise.
pub struct RednessClassifier;

impl Classifier for RednessClassifier {
    fn predict(&self, patches: &[RgbImage]) -> Result<Vec<ClassPrediction>> {
        Ok(patches
            .iter()
            .map(|patch| {
                let pixels = patch.pixels().len().max(1) as f32;
                let red = patch.pixels().map(|p| f32::from(p[0])).sum::<f32>() / pixels;
                ClassPrediction {
                    class_index: usize::from(red > 127.0),
                    confidence: 0.8,
                }
            })
            .collect())
    }
}

/// In-memory provider with a fixed set of classifiers.
#[derive(Default)]
pub struct StaticProvider {
    models: HashMap<String, Arc<dyn Classifier>>,
}

impl StaticProvider {
    pub fn with(mut self, model_id: &str, classifier: Arc<dyn Classifier>) -> Self {
        self.models.insert(model_id.to_string(), classifier);
        self
    }
}

impl ClassifierProvider for StaticProvider {
    fn get_classifier(&self, model_id: &str) -> Result<Arc<dyn Classifier>> {
        self.models
            .get(model_id)
            .cloned()
            .ok_or_else(|| AnnotateError::model_not_found(model_id))
    }
}

/// Annotator that knows [`TEST_MODEL`] and samples with a fixed seed.
pub fn test_annotator() -> Annotator {
    let provider = StaticProvider::default().with(TEST_MODEL, Arc::new(RednessClassifier));
    let settings = Settings {
        seed: Some(42),
        ..Settings::default()
    };
    Annotator::new(Arc::new(ClassifierCache::new(Arc::new(provider))))
        .expect("embedded font should parse")
        .with_settings(settings)
}
