use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointSource {
    Model,
    Manual,
}

impl PointSource {
    /// Interpret a free-form source tag. Anything starting with "manual"
    /// (case-insensitive) is manual, everything else came from the model.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_lowercase().starts_with("manual") {
            Self::Manual
        } else {
            Self::Model
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Manual => "manual",
        }
    }
}

/// A sampled or manually placed point with its classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub idx: u32,
    pub label: String,
    pub x: i64,
    pub y: i64,
    pub x_norm: f64,
    pub y_norm: f64,
    #[serde(rename = "pred_label", skip_serializing_if = "Option::is_none")]
    pub predicted_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub source: PointSource,
    /// Explicit annotation method tag supplied by a client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Unrecognized fields carried through from manual input
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Point {
    pub fn new(idx: u32, x: i64, y: i64, width: u32, height: u32, source: PointSource) -> Self {
        let (x_norm, y_norm) = normalized(x, y, width, height);
        Self {
            idx,
            label: index_label(idx),
            x,
            y,
            x_norm,
            y_norm,
            predicted_label: None,
            confidence: None,
            source,
            method: None,
            extra: Map::new(),
        }
    }

    pub fn patch(&self, size: u32) -> PatchSpec {
        PatchSpec {
            center_x: self.x,
            center_y: self.y,
            size,
        }
    }
}

/// `x / width`, `y / height`, with 0 for an empty dimension.
pub fn normalized(x: i64, y: i64, width: u32, height: u32) -> (f64, f64) {
    let x_norm = if width == 0 { 0.0 } else { x as f64 / width as f64 };
    let y_norm = if height == 0 { 0.0 } else { y as f64 / height as f64 };
    (x_norm, y_norm)
}

/// Spreadsheet-style column name for a 1-based index: 1 → "A", 26 → "Z",
/// 27 → "AA", 53 → "BA". Returns an empty string for 0.
pub fn index_label(idx: u32) -> String {
    let mut n = idx;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A point as submitted by a client: every field optional, coordinates may be
/// numbers or numeric strings, unknown keys preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_norm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_norm: Option<f64>,
    #[serde(
        default,
        alias = "predicted_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub pred_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&Point> for PointRecord {
    fn from(p: &Point) -> Self {
        Self {
            idx: Some(Value::from(p.idx)),
            label: Some(p.label.clone()),
            x: Some(Value::from(p.x)),
            y: Some(Value::from(p.y)),
            x_norm: Some(p.x_norm),
            y_norm: Some(p.y_norm),
            pred_label: p.predicted_label.clone(),
            confidence: p.confidence,
            source: Some(p.source.as_str().to_string()),
            method: p.method.clone(),
            extra: p.extra.clone(),
        }
    }
}

/// Square region of `size` pixels centered on a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSpec {
    pub center_x: i64,
    pub center_y: i64,
    pub size: u32,
}

impl PatchSpec {
    /// Top-left corner of the region in source coordinates.
    pub fn origin(&self) -> (i64, i64) {
        let half = i64::from(self.size / 2);
        (
            self.center_x.saturating_sub(half),
            self.center_y.saturating_sub(half),
        )
    }
}

/// Classifier output for one patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    /// Index into the class vocabulary
    pub class_index: usize,
    /// Probability of the chosen class, in `[0, 1]`
    pub confidence: f32,
}
