// MODEL: Glyphs, their lifecycle and the camera
pub mod glyph;
pub mod sequence;
pub mod camera;

pub use glyph::{Glyph, GlyphId, SpawnState};
pub use sequence::{Command, GlyphSequence};
pub use camera::Camera;
