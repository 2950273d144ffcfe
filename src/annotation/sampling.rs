//! Point set construction: random sampling and manual-point normalization.

use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{AnnotateError, Result};
use crate::models::{Point, PointRecord, PointSource, index_label, normalized};

/// Sample `n` uniformly distributed points.
///
/// Coordinates fall in `[margin, max(margin + 1, dim - margin))` on each axis,
/// so tiny images still get points (clustered at the margin) instead of an
/// empty range.
pub fn generate_random<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    n: usize,
    margin: u32,
) -> Vec<Point> {
    let (x_lo, x_hi) = axis_range(width, margin);
    let (y_lo, y_hi) = axis_range(height, margin);

    (1..=n)
        .map(|i| {
            let x = rng.random_range(x_lo..x_hi);
            let y = rng.random_range(y_lo..y_hi);
            Point::new(i as u32, x, y, width, height, PointSource::Model)
        })
        .collect()
}

fn axis_range(dim: u32, margin: u32) -> (i64, i64) {
    let lo = i64::from(margin);
    let hi = (i64::from(dim) - lo).max(lo + 1);
    (lo, hi)
}

/// Turn client-supplied records into a well-formed point set.
///
/// Idempotent: feeding the output back in (via [`PointRecord::from`]) yields
/// the same points.
pub fn normalize_manual(records: &[PointRecord], width: u32, height: u32) -> Result<Vec<Point>> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut points = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let position = i + 1;
        let x = coerce_int(record.x.as_ref(), "x", position)?.unwrap_or(0);
        let y = coerce_int(record.y.as_ref(), "y", position)?.unwrap_or(0);

        let idx = match coerce_int(record.idx.as_ref(), "idx", position)? {
            Some(v) => u32::try_from(v).ok().filter(|v| *v > 0).ok_or_else(|| {
                AnnotateError::invalid_points(format!(
                    "point {position}: idx must be a positive integer, got {v}"
                ))
            })?,
            None => position as u32,
        };
        if !seen.insert(idx) {
            return Err(AnnotateError::invalid_points(format!(
                "duplicate idx {idx}"
            )));
        }

        let label = match record.label.as_deref() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => index_label(idx),
        };
        let source = record
            .source
            .as_deref()
            .map(PointSource::from_tag)
            .unwrap_or(PointSource::Manual);
        let (x_norm, y_norm) = normalized(x, y, width, height);

        points.push(Point {
            idx,
            label,
            x,
            y,
            x_norm,
            y_norm,
            predicted_label: record.pred_label.clone(),
            confidence: record.confidence,
            source,
            method: record.method.clone(),
            extra: record.extra.clone(),
        });
    }

    Ok(points)
}

/// Parse a manual points payload: either a bare array of records or an object
/// with a `points` array.
pub fn parse_points_payload(json: &str) -> Result<Vec<PointRecord>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| AnnotateError::invalid_points(format!("not valid JSON: {e}")))?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => obj
            .remove("points")
            .filter(Value::is_array)
            .ok_or_else(|| AnnotateError::invalid_points("expected a `points` array"))?,
        _ => return Err(AnnotateError::invalid_points("expected an array of points")),
    };

    serde_json::from_value(list)
        .map_err(|e| AnnotateError::invalid_points(format!("malformed point: {e}")))
}

/// Integer coercion in the spirit of a lenient form decoder: integers pass,
/// floats truncate toward zero, numeric strings are parsed.
fn coerce_int(value: Option<&Value>, field: &str, position: usize) -> Result<Option<i64>> {
    let invalid = |v: &Value| {
        AnnotateError::invalid_points(format!(
            "point {position}: `{field}` is not a number ({v})"
        ))
    };

    let Some(v) = value else {
        return Ok(None);
    };
    let parsed = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| invalid(v))
}

fn truncate(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
}
