//! Boundary to the patch classifier.
//!
//! The pipeline only knows the [`Classifier`] and [`ClassifierProvider`]
//! traits. [`ModelStore`] is the on-disk provider backed by rten models and
//! [`ClassifierCache`] keeps loaded classifiers around between requests.

pub mod cache;
pub mod preprocess;
pub mod rten_model;
pub mod store;

pub use cache::ClassifierCache;
pub use preprocess::Preprocessor;
pub use rten_model::RtenClassifier;
pub use store::{ModelInfo, ModelMeta, ModelStore};

use image::RgbImage;
use std::sync::Arc;

use crate::annotation::patch;
use crate::error::{AnnotateError, Result};
use crate::models::{ClassPrediction, Point};

/// A patch classifier. `predict` must return one prediction per patch, in
/// the same order.
pub trait Classifier: Send + Sync {
    fn predict(&self, patches: &[RgbImage]) -> Result<Vec<ClassPrediction>>;
}

/// Looks classifiers up by identifier.
pub trait ClassifierProvider: Send + Sync {
    /// Fails with [`AnnotateError::ModelNotFound`] when nothing is registered
    /// under `model_id`.
    fn get_classifier(&self, model_id: &str) -> Result<Arc<dyn Classifier>>;
}

/// Cut one patch per point and run them through the classifier as a single
/// batch.
pub fn predict_batch(
    classifier: &dyn Classifier,
    image: &RgbImage,
    points: &[Point],
    patch_size: u32,
) -> Result<Vec<ClassPrediction>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let patches: Vec<RgbImage> = points
        .iter()
        .map(|p| patch::crop_spec(image, &p.patch(patch_size)))
        .collect();
    let predictions = classifier.predict(&patches)?;

    if predictions.len() != patches.len() {
        return Err(AnnotateError::Classifier(format!(
            "expected {} predictions, got {}",
            patches.len(),
            predictions.len()
        )));
    }
    Ok(predictions)
}

/// Write predictions back onto the points they were computed for.
pub fn apply_predictions(
    points: &mut [Point],
    predictions: &[ClassPrediction],
    vocabulary: &[String],
) -> Result<()> {
    if points.len() != predictions.len() {
        return Err(AnnotateError::Classifier(format!(
            "{} predictions for {} points",
            predictions.len(),
            points.len()
        )));
    }

    for (point, pred) in points.iter_mut().zip(predictions) {
        let label = vocabulary.get(pred.class_index).ok_or_else(|| {
            AnnotateError::Classifier(format!(
                "class index {} outside vocabulary of {}",
                pred.class_index,
                vocabulary.len()
            ))
        })?;
        point.predicted_label = Some(label.clone());
        point.confidence = Some(f64::from(pred.confidence.clamp(0.0, 1.0)));
    }
    Ok(())
}

/// [`predict_batch`] followed by [`apply_predictions`].
pub fn classify_points(
    classifier: &dyn Classifier,
    image: &RgbImage,
    points: &mut [Point],
    patch_size: u32,
    vocabulary: &[String],
) -> Result<()> {
    let predictions = predict_batch(classifier, image, points, patch_size)?;
    apply_predictions(points, &predictions, vocabulary)
}
