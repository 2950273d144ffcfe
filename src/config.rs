//! Runtime settings.
//!
//! Defaults match the survey service this tool replaces. A JSON file can
//! override any subset of fields; the CLI then overrides the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnnotateError, Result};

/// Class vocabulary the bundled reef models were trained on, in output order.
pub const DEFAULT_CLASSES: [&str; 6] = [
    "Algas",
    "Coral",
    "Otros organismos",
    "Sustrato inerte",
    "Tape",
    "nan",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the on-disk model store (`<dir>/<model_id>/{meta.json,model.rten}`)
    pub models_dir: PathBuf,
    /// Ordered class vocabulary; classifier outputs index into it
    pub classes: Vec<String>,
    pub default_points: usize,
    pub min_points: usize,
    pub max_points: usize,
    pub max_batch_images: usize,
    /// Side of the square patch cut around each point
    pub patch_size: u32,
    /// Distance kept from the image border when sampling
    pub margin: u32,
    /// Fixed RNG seed for reproducible sampling
    pub seed: Option<u64>,
    /// TrueType font tried before the platform fonts
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models_store"),
            classes: DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            default_points: 100,
            min_points: 1,
            max_points: 5000,
            max_batch_images: 25,
            patch_size: 32,
            margin: 10,
            seed: None,
            font_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, filling missing fields with defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings =
            serde_json::from_str(&raw).map_err(|e| AnnotateError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.validate().map_err(|message| AnnotateError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(settings)
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.classes.is_empty() {
            return Err("class vocabulary is empty".to_string());
        }
        if self.patch_size == 0 {
            return Err("patch_size must be positive".to_string());
        }
        if self.min_points == 0 || self.min_points > self.max_points {
            return Err(format!(
                "invalid point bounds {}..={}",
                self.min_points, self.max_points
            ));
        }
        if self.max_batch_images == 0 {
            return Err("max_batch_images must be positive".to_string());
        }
        Ok(())
    }

    /// Reject sample counts outside `[min_points, max_points]`.
    pub fn check_points(&self, n: usize) -> Result<()> {
        AnnotateError::check_count("points", n, self.min_points, self.max_points)
    }

    /// Reject batch sizes outside `[1, max_batch_images]`.
    pub fn check_batch_size(&self, count: usize) -> Result<()> {
        AnnotateError::check_count("images", count, 1, self.max_batch_images)
    }

    /// One-line listing of the class vocabulary, in index order.
    pub fn class_summary(&self) -> String {
        format!("{} classes: {}", self.classes.len(), self.classes.join(", "))
    }
}
