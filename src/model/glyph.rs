use std::fmt;

use glam::Vec3;
use rand::Rng;
use uuid::{Builder, Uuid};

use crate::config::SpawnRanges;

/// Identity of a live glyph.
///
/// The id is the only key the physics and render side use to tell
/// "same glyph as last frame" from "new glyph", so it must never repeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(Uuid);

impl GlyphId {
    /// Fresh id from the OS random source, or a time + random composite
    /// if the OS source fails.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        let strong = getrandom::fill(&mut bytes).map(|()| bytes);
        Self::from_entropy(strong, unix_millis(), rng)
    }

    fn from_entropy<R: Rng + ?Sized>(
        strong: Result<[u8; 16], getrandom::Error>,
        millis: u64,
        rng: &mut R,
    ) -> Self {
        match strong {
            Ok(bytes) => Self(Builder::from_random_bytes(bytes).into_uuid()),
            Err(err) => {
                // weaker: two ids only collide if millis and 80 random bits both match
                tracing::warn!(%err, "OS random source unavailable, using time-based glyph id");
                let mut tail = [0u8; 10];
                rng.fill(&mut tail[..]);
                Self(Builder::from_unix_timestamp_millis(millis, &tail).into_uuid())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(target_arch = "wasm32")]
fn unix_millis() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Initial pose and velocity of a glyph, drawn once when it is spawned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnState {
    pub position: Vec3,
    /// Euler angles (XYZ) in radians
    pub rotation: Vec3,
    pub velocity: Vec3,
}

impl SpawnState {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, ranges: &SpawnRanges) -> Self {
        let position = Vec3::new(
            spread(rng, ranges.position_width.x),
            ranges.min_height + upto(rng, ranges.height_jitter),
            spread(rng, ranges.position_width.z),
        );
        let rotation = Vec3::new(
            upto(rng, ranges.max_rotation),
            upto(rng, ranges.max_rotation),
            upto(rng, ranges.max_rotation),
        );
        let velocity = Vec3::new(
            spread(rng, ranges.velocity_width.x),
            -upto(rng, ranges.max_fall_speed),
            spread(rng, ranges.velocity_width.z),
        );
        Self { position, rotation, velocity }
    }
}

/// Uniform in `[-width/2, width/2]`
fn spread<R: Rng + ?Sized>(rng: &mut R, width: f32) -> f32 {
    if width > 0.0 {
        let half = width / 2.0;
        rng.random_range(-half..=half)
    } else {
        0.0
    }
}

/// Uniform in `[0, max]`
fn upto<R: Rng + ?Sized>(rng: &mut R, max: f32) -> f32 {
    if max > 0.0 {
        rng.random_range(0.0..=max)
    } else {
        0.0
    }
}

/// A typed character living in the scene
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub id: GlyphId,
    pub ch: char,
    pub spawn: SpawnState,
}

impl Glyph {
    /// Text drawn on the glyph body. Letters are shown upper case.
    pub fn label(&self) -> String {
        self.ch.to_uppercase().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::f32::consts::PI;

    #[test]
    fn test_spawn_state_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let ranges = SpawnRanges::default();

        for _ in 0..1000 {
            let s = SpawnState::sample(&mut rng, &ranges);
            assert!((30.0..=45.0).contains(&s.position.y), "y = {}", s.position.y);
            assert!((-5.0..=5.0).contains(&s.position.x));
            assert!((-3.0..=3.0).contains(&s.position.z));
            assert!((-5.0..=0.0).contains(&s.velocity.y), "vy = {}", s.velocity.y);
            assert!((-3.0..=3.0).contains(&s.velocity.x));
            assert!((-1.0..=1.0).contains(&s.velocity.z));
            for r in s.rotation.to_array() {
                assert!((0.0..=PI).contains(&r), "rotation = {r}");
            }
        }
    }

    #[test]
    fn test_spawn_state_is_deterministic_for_a_seed() {
        let ranges = SpawnRanges::default();
        let a = SpawnState::sample(&mut StdRng::seed_from_u64(42), &ranges);
        let b = SpawnState::sample(&mut StdRng::seed_from_u64(42), &ranges);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_width_ranges_collapse() {
        let mut rng = StdRng::seed_from_u64(1);
        let ranges = SpawnRanges {
            position_width: Vec3::ZERO,
            min_height: 12.0,
            height_jitter: 0.0,
            max_rotation: 0.0,
            velocity_width: Vec3::ZERO,
            max_fall_speed: 0.0,
        };
        let s = SpawnState::sample(&mut rng, &ranges);
        assert_eq!(s.position, Vec3::new(0.0, 12.0, 0.0));
        assert_eq!(s.rotation, Vec3::ZERO);
        assert_eq!(s.velocity.length(), 0.0);
    }

    #[test]
    fn test_generated_ids_are_unique_v4() {
        let mut rng = StdRng::seed_from_u64(3);
        let ids: Vec<GlyphId> = (0..500).map(|_| GlyphId::generate(&mut rng)).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| id.as_uuid().get_version_num() == 4));
    }

    #[test]
    fn test_fallback_ids_are_time_based_and_distinct() {
        let mut rng = StdRng::seed_from_u64(9);
        let millis = 1_700_000_000_000;
        let a = GlyphId::from_entropy(Err(getrandom::Error::UNSUPPORTED), millis, &mut rng);
        let b = GlyphId::from_entropy(Err(getrandom::Error::UNSUPPORTED), millis, &mut rng);
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_label_is_upper_case() {
        let mut rng = StdRng::seed_from_u64(0);
        let glyph = Glyph {
            id: GlyphId::generate(&mut rng),
            ch: 'q',
            spawn: SpawnState::sample(&mut rng, &SpawnRanges::default()),
        };
        assert_eq!(glyph.label(), "Q");

        let ret = Glyph { ch: '↵', ..glyph };
        assert_eq!(ret.label(), "↵");
    }
}
