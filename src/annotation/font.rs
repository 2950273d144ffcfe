//! Font used for point labels.
//!
//! A TrueType font is looked up on the usual platform paths; when none can be
//! loaded labels fall back to the DejaVu Sans face compiled into the binary.

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AnnotateError, Result};

/// Platform font locations, tried in order.
pub const PLATFORM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Clone)]
pub enum LabelFont {
    /// Loaded from a file on disk
    TrueType(FontArc),
    /// The embedded DejaVu Sans face
    Builtin(FontArc),
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueType(_) => f.write_str("LabelFont::TrueType"),
            Self::Builtin(_) => f.write_str("LabelFont::Builtin"),
        }
    }
}

impl LabelFont {
    pub fn builtin() -> Result<Self> {
        FontArc::try_from_slice(EMBEDDED_FONT)
            .map(Self::Builtin)
            .map_err(|e| AnnotateError::Font(format!("embedded font: {e}")))
    }

    /// Resolve the label font: `preferred` first, then the platform fonts,
    /// then the embedded font.
    pub fn resolve(preferred: Option<&Path>) -> Result<Self> {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(PLATFORM_FONTS.iter().map(PathBuf::from));
        Self::first_loadable(candidates)
    }

    pub fn first_loadable(candidates: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        for path in candidates {
            if let Some(font) = Self::from_file(&path) {
                debug!(path = %path.display(), "loaded label font");
                return Ok(font);
            }
        }
        debug!("no TrueType font found, using embedded font");
        Self::builtin()
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        FontArc::try_from_vec(bytes).ok().map(Self::TrueType)
    }

    fn face(&self) -> &FontArc {
        match self {
            Self::TrueType(font) | Self::Builtin(font) => font,
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels falling
    /// outside the canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(size), self.face(), text);
    }
}
