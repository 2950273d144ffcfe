pub mod font;
pub mod patch;
pub mod render;
pub mod sampling;

pub use font::LabelFont;
pub use patch::crop;
pub use render::{MarkerStyle, render};
pub use sampling::{generate_random, normalize_manual, parse_points_payload};
