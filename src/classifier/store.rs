//! On-disk model store.
//!
//! Layout: one directory per model id holding `meta.json` and the rten
//! weights `model.rten`:
//!
//! ```text
//! models_store/
//!   resnet18_v2/
//!     meta.json
//!     model.rten
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classifier::preprocess::{IMAGENET_MEAN, IMAGENET_STD, Preprocessor};
use crate::classifier::rten_model::RtenClassifier;
use crate::classifier::{Classifier, ClassifierProvider};
use crate::error::{AnnotateError, Result};

pub const META_FILE: &str = "meta.json";
pub const WEIGHTS_FILE: &str = "model.rten";

/// Contents of `meta.json`. Only the preprocessing fields are interpreted;
/// everything else is passed through to listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<[f32; 3]>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelMeta {
    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor {
            input_size: self.input_size.filter(|s| *s > 0).unwrap_or(224),
            mean: self.mean.unwrap_or(IMAGENET_MEAN),
            std: self.std.unwrap_or(IMAGENET_STD),
        }
    }
}

/// One entry of [`ModelStore::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub model_name: String,
    pub has_weights: bool,
    pub input_size: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `model_id`. Ids that could escape the store root are
    /// treated as unknown.
    pub fn model_dir(&self, model_id: &str) -> Result<PathBuf> {
        let mut components = Path::new(model_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !model_id.contains(['/', '\\']) => {
                Ok(self.root.join(model_id))
            }
            _ => Err(AnnotateError::model_not_found(model_id)),
        }
    }

    pub fn read_meta(&self, model_id: &str) -> Result<ModelMeta> {
        let path = self.model_dir(model_id)?.join(META_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "model metadata unreadable");
            AnnotateError::model_not_found(model_id)
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            warn!(path = %path.display(), error = %e, "model metadata is not valid JSON");
            AnnotateError::model_not_found(model_id)
        })
    }

    /// Models with a readable `meta.json`, sorted by id.
    pub fn list(&self) -> Result<Vec<ModelInfo>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let folder = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().join(META_FILE).is_file() {
                continue;
            }

            let meta = match self.read_meta(&folder) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(model = %folder, error = %e, "skipping model with bad metadata");
                    continue;
                }
            };
            models.push(ModelInfo {
                input_size: meta.preprocessor().input_size,
                id: meta.id.unwrap_or_else(|| folder.clone()),
                model_name: meta.model_name.unwrap_or(folder),
                has_weights: entry.path().join(WEIGHTS_FILE).is_file(),
                extra: meta.extra,
            });
        }

        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }
}

impl ClassifierProvider for ModelStore {
    fn get_classifier(&self, model_id: &str) -> Result<Arc<dyn Classifier>> {
        let dir = self.model_dir(model_id)?;
        let weights = dir.join(WEIGHTS_FILE);
        if !dir.join(META_FILE).is_file() || !weights.is_file() {
            return Err(AnnotateError::model_not_found(model_id));
        }

        let meta = self.read_meta(model_id)?;
        let classifier = RtenClassifier::load(&weights, meta.preprocessor())?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn store_with(models: &[(&str, Option<&str>, bool)]) -> (tempfile::TempDir, ModelStore) {
        let dir = tempfile::TempDir::new().unwrap();
        for (id, meta, weights) in models {
            let model_dir = dir.path().join(id);
            std::fs::create_dir_all(&model_dir).unwrap();
            if let Some(meta) = meta {
                std::fs::write(model_dir.join(META_FILE), meta).unwrap();
            }
            if *weights {
                std::fs::write(model_dir.join(WEIGHTS_FILE), b"weights").unwrap();
            }
        }
        std::fs::write(dir.path().join("README.txt"), "not a model").unwrap();
        let store = ModelStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_list_sorted_with_weight_flags() {
        let (_dir, store) = store_with(&[
            ("vgg", Some(r#"{"model_name": "vgg16", "val_acc": 0.8}"#), false),
            ("alex", Some(r#"{"id": "alex", "input_size": 112}"#), true),
            ("empty", None, true),
        ]);

        let models = store.list().unwrap();
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["alex", "vgg"]);
        assert!(models[0].has_weights);
        assert_eq!(models[0].model_name, "alex");
        assert_eq!(models[0].input_size, 112);
        assert!(!models[1].has_weights);
        assert_eq!(models[1].model_name, "vgg16");
        assert_eq!(models[1].input_size, 224);
        assert_eq!(models[1].extra.get("val_acc"), Some(&Value::from(0.8)));
    }

    #[test]
    fn test_missing_artifacts_are_model_not_found() {
        let (_dir, store) = store_with(&[
            ("no_weights", Some("{}"), false),
            ("no_meta", None, true),
        ]);

        for id in ["no_weights", "no_meta", "absent", "", "..", "../etc", "a/b"] {
            let err = store.get_classifier(id).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::ModelNotFound, "id {id:?}");
        }
    }

    #[test]
    fn test_malformed_meta_is_model_not_found() {
        let (_dir, store) = store_with(&[
            ("broken", Some("{not json"), true),
            ("typed", Some(r#"{"input_size": "big"}"#), true),
        ]);

        for id in ["broken", "typed"] {
            let err = store.get_classifier(id).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::ModelNotFound, "id {id:?}");
        }
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let store = ModelStore::new("/definitely/not/here");
        assert!(store.list().unwrap().is_empty());
    }
}
