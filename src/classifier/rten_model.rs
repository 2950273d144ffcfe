use image::RgbImage;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::classifier::Classifier;
use crate::classifier::preprocess::{Preprocessor, softmax_argmax};
use crate::error::{AnnotateError, Result};
use crate::models::ClassPrediction;

/// Patch classifier executed with rten. The model takes a
/// `[n, 3, size, size]` float batch and returns `[n, classes]` logits.
pub struct RtenClassifier {
    model: Model,
    preprocess: Preprocessor,
}

impl RtenClassifier {
    pub fn load(weights: &Path, preprocess: Preprocessor) -> Result<Self> {
        let model = Model::load_file(weights).map_err(|e| {
            AnnotateError::Classifier(format!("failed to load {}: {e}", weights.display()))
        })?;
        debug!(path = %weights.display(), input_size = preprocess.input_size, "loaded rten model");
        Ok(Self { model, preprocess })
    }
}

impl Classifier for RtenClassifier {
    fn predict(&self, patches: &[RgbImage]) -> Result<Vec<ClassPrediction>> {
        if patches.is_empty() {
            return Ok(Vec::new());
        }

        let side = self.preprocess.input_size as usize;
        let input = NdTensor::from_data(
            [patches.len(), 3, side, side],
            self.preprocess.batch_tensor(patches),
        );

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| AnnotateError::Classifier(format!("inference failed: {e}")))?;
        let logits: NdTensor<f32, 2> = output
            .try_into()
            .map_err(|e| AnnotateError::Classifier(format!("unexpected model output: {e}")))?;

        let [rows, classes] = logits.shape();
        if rows != patches.len() || classes == 0 {
            return Err(AnnotateError::Classifier(format!(
                "model returned [{rows}, {classes}] logits for {} patches",
                patches.len()
            )));
        }

        logits
            .to_vec()
            .chunks(classes)
            .map(|row| {
                softmax_argmax(row)
                    .ok_or_else(|| AnnotateError::Classifier("non-finite logits".to_string()))
            })
            .collect()
    }
}
