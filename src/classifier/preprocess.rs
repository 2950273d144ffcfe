use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::models::ClassPrediction;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Patch → network input: resize, scale to `[0, 1]`, per-channel
/// normalization, NCHW layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            input_size: 224,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

impl Preprocessor {
    /// Flattened `[n, 3, input_size, input_size]` tensor data for a batch.
    pub fn batch_tensor(&self, patches: &[RgbImage]) -> Vec<f32> {
        let side = self.input_size as usize;
        let plane = side * side;
        let mut data = vec![0.0f32; patches.len() * 3 * plane];

        for (n, patch) in patches.iter().enumerate() {
            let resized;
            let src = if patch.dimensions() == (self.input_size, self.input_size) {
                patch
            } else {
                resized = imageops::resize(
                    patch,
                    self.input_size,
                    self.input_size,
                    FilterType::Triangle,
                );
                &resized
            };

            let base = n * 3 * plane;
            for (i, px) in src.pixels().enumerate() {
                for c in 0..3 {
                    let v = f32::from(px[c]) / 255.0;
                    data[base + c * plane + i] = (v - self.mean[c]) / self.std[c];
                }
            }
        }
        data
    }
}

/// Softmax over one row of logits; returns the arg-max class and its
/// probability. `None` for an empty row.
pub fn softmax_argmax(logits: &[f32]) -> Option<ClassPrediction> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return None;
    }
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    let (class_index, best) = exps
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |acc, (i, &e)| if e > acc.1 { (i, e) } else { acc });

    Some(ClassPrediction {
        class_index,
        confidence: best / sum,
    })
}
