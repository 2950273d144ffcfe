pub mod annotation;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;

pub use classifier::{Classifier, ClassifierCache, ClassifierProvider, ModelStore};
pub use config::Settings;
pub use error::{AnnotateError, ErrorKind, Result};
pub use export::{BatchArchive, BatchExporter, UploadedImage, export_single};
pub use models::{ClassPrediction, PatchSpec, Point, PointRecord, PointSource};
pub use pipeline::{AnnotateRequest, Annotated, Annotator, PointsInput};
