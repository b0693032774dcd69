// config.rs - Scene, spawn and physics parameters
//
// Everything that shapes the scene is collected here so the lifecycle,
// physics and renderer read the same numbers.

use glam::Vec3;

/// Maximum number of glyphs kept alive at once.
pub const TYPED_LIMIT: usize = 80;

/// Glyph spawned by the Enter key.
pub const RETURN_GLYPH: char = '↵';

/// Top level configuration for the whole scene
///
/// Usage:
///   // Use default configuration
///   let config = SceneConfig::default();
///
///   // Or customize:
///   let mut config = SceneConfig::default();
///   config.typed_limit = 20;              // Fewer glyphs on screen
///   config.physics.gravity.y = -9.81;     // Earth gravity instead of arcade gravity
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub typed_limit: usize,
    pub physics: PhysicsConfig,
    pub spawn: SpawnRanges,
    pub glyph_body: GlyphBodyConfig,
    pub material: MaterialConfig,
    pub arena: ArenaConfig,
    pub camera: CameraConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            typed_limit: TYPED_LIMIT,
            physics: PhysicsConfig::default(),
            spawn: SpawnRanges::default(),
            glyph_body: GlyphBodyConfig::default(),
            material: MaterialConfig::default(),
            arena: ArenaConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fixed simulation step in seconds
    pub timestep: f32,
    /// Upper bound on simulation steps per rendered frame
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -60.0, 0.0),
            timestep: 1.0 / 60.0,
            max_substeps: 4,
        }
    }
}

/// Ranges for the randomized initial state of a glyph.
///
/// Symmetric ranges are given by their full width and centered on zero,
/// so `position_width.x = 10.0` means x is drawn from `[-5, 5]`.
#[derive(Clone, Copy, Debug)]
pub struct SpawnRanges {
    pub position_width: Vec3,
    pub min_height: f32,
    pub height_jitter: f32,
    pub max_rotation: f32,
    /// Only x and z are used, y is always downward
    pub velocity_width: Vec3,
    pub max_fall_speed: f32,
}

impl Default for SpawnRanges {
    fn default() -> Self {
        Self {
            position_width: Vec3::new(10.0, 0.0, 6.0),
            min_height: 30.0,
            height_jitter: 15.0,
            max_rotation: std::f32::consts::PI,
            velocity_width: Vec3::new(6.0, 0.0, 2.0),
            max_fall_speed: 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GlyphBodyConfig {
    pub half_extents: Vec3,
    pub mass: f32,
    pub restitution: f32,
}

impl Default for GlyphBodyConfig {
    fn default() -> Self {
        // glyph size 50 at scale 0.08 is 4 units tall; depth is extrusion + bevel
        Self {
            half_extents: Vec3::new(1.4, 2.0, 0.76),
            mass: 0.5,
            restitution: 0.4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MaterialConfig {
    pub color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
}

impl MaterialConfig {
    /// Metallic silver, `#d9dfe8`
    pub fn metallic_silver() -> Self {
        Self {
            color: parse_hex_color("#d9dfe8").unwrap_or([0.85, 0.875, 0.91, 1.0]),
            metalness: 1.0,
            roughness: 0.15,
            clearcoat: 0.8,
            clearcoat_roughness: 0.05,
        }
    }

    /// Matte floor the glyphs land on
    pub fn floor() -> Self {
        Self {
            color: [0.93, 0.93, 0.94, 1.0],
            metalness: 0.0,
            roughness: 0.9,
            clearcoat: 0.0,
            clearcoat_roughness: 1.0,
        }
    }
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self::metallic_silver()
    }
}

/// Axis aligned static box, given by center and half extents
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticCuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl StaticCuboid {
    pub const fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self { center, half_extents }
    }

    /// Height of the top face
    pub fn top(&self) -> f32 {
        self.center.y + self.half_extents.y
    }
}

#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub ground: StaticCuboid,
    pub walls: [StaticCuboid; 4],
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ground: StaticCuboid::new(Vec3::new(0.0, -6.0, 0.0), Vec3::new(100.0, 1.0, 100.0)),
            walls: [
                StaticCuboid::new(Vec3::new(0.0, 0.0, -30.0), Vec3::new(30.0, 100.0, 1.0)),
                StaticCuboid::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(30.0, 100.0, 1.0)),
                StaticCuboid::new(Vec3::new(-30.0, 0.0, 0.0), Vec3::new(1.0, 100.0, 30.0)),
                StaticCuboid::new(Vec3::new(30.0, 0.0, 0.0), Vec3::new(1.0, 100.0, 30.0)),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub background: [f64; 4],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(-20.0, 40.0, 30.0),
            target: Vec3::ZERO,
            fov_y_degrees: 45.0,
            z_near: 1.0,
            z_far: 300.0,
            background: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Parse `#rrggbb` into linear RGBA.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 4]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<f32> {
        let v = u8::from_str_radix(&digits[i..i + 2], 16).ok()?;
        Some(srgb_to_linear(v as f32 / 255.0))
    };
    Some([channel(0)?, channel(2)?, channel(4)?, 1.0])
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        let white = parse_hex_color("#ffffff").unwrap();
        assert_eq!(white, [1.0, 1.0, 1.0, 1.0]);

        let black = parse_hex_color("#000000").unwrap();
        assert_eq!(black, [0.0, 0.0, 0.0, 1.0]);

        let silver = parse_hex_color("#d9dfe8").unwrap();
        assert!(silver[0] < silver[1] && silver[1] < silver[2], "silver leans blue");
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        assert!(parse_hex_color("d9dfe8").is_none());
        assert!(parse_hex_color("#d9dfe").is_none());
        assert!(parse_hex_color("#zzzzzz").is_none());
        assert!(parse_hex_color("#d9dfé8").is_none());
    }

    #[test]
    fn test_default_arena_encloses_spawn_area() {
        let config = SceneConfig::default();
        let ground_top = config.arena.ground.top();
        assert!(config.spawn.min_height > ground_top);

        let half_x = config.spawn.position_width.x / 2.0;
        let half_z = config.spawn.position_width.z / 2.0;
        for wall in &config.arena.walls {
            let inner_x = wall.center.x.abs() - wall.half_extents.x;
            let inner_z = wall.center.z.abs() - wall.half_extents.z;
            assert!(wall.center.x == 0.0 || inner_x > half_x);
            assert!(wall.center.z == 0.0 || inner_z > half_z);
        }
    }
}
