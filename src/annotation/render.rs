//! Cross-marker overlay for point sets.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::annotation::font::LabelFont;
use crate::models::Point;

pub const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const STROKE_WIDTH: u32 = 2;
/// Gap between the marker and its label, in pixels.
const LABEL_GAP_X: i64 = 4;
const LABEL_GAP_Y: i64 = 2;

/// Marker geometry derived from the image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    /// Full extent of each cross arm, end to end
    pub cross_size: u32,
    pub font_size: u32,
}

impl MarkerStyle {
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        let scaled = (f64::from(width.min(height)) * 0.02).round() as u32;
        Self {
            cross_size: scaled.max(10),
            font_size: scaled.max(14),
        }
    }

    pub fn half(&self) -> i64 {
        i64::from(self.cross_size / 2)
    }
}

/// Draw every point onto a copy of `image`. The input is left untouched.
pub fn render(image: &RgbImage, points: &[Point], font: &LabelFont) -> RgbImage {
    let mut out = image.clone();
    let style = MarkerStyle::for_dimensions(out.width(), out.height());
    let half = style.half();

    for p in points {
        draw_cross(&mut out, p.x, p.y, half);

        let tx = clamp_i32(p.x.saturating_add(half + LABEL_GAP_X));
        let ty = clamp_i32(p.y.saturating_sub(half + LABEL_GAP_Y));
        font.draw(&mut out, MARKER_COLOR, tx, ty, style.font_size as f32, &p.label);
    }

    out
}

fn draw_cross(canvas: &mut RgbImage, x: i64, y: i64, half: i64) {
    let arm = (2 * half + 1) as u32;
    let offset = i64::from(STROKE_WIDTH / 2);

    let horizontal = Rect::at(clamp_i32(x.saturating_sub(half)), clamp_i32(y.saturating_sub(offset)))
        .of_size(arm, STROKE_WIDTH);
    let vertical = Rect::at(clamp_i32(x.saturating_sub(offset)), clamp_i32(y.saturating_sub(half)))
        .of_size(STROKE_WIDTH, arm);
    draw_filled_rect_mut(canvas, horizontal, MARKER_COLOR);
    draw_filled_rect_mut(canvas, vertical, MARKER_COLOR);
}

/// Pin far-away coordinates to something imageproc can clip safely.
fn clamp_i32(v: i64) -> i32 {
    v.clamp(-(1 << 20), 1 << 20) as i32
}
