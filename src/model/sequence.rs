use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::glyph::{Glyph, GlyphId, SpawnState};
use crate::config::{SceneConfig, SpawnRanges};

/// Lifecycle commands produced by the input router
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Clear,
    DeleteLast,
    Spawn(char),
}

/// Ordered, capped collection of live glyphs (oldest first).
///
/// Every insertion is followed by front eviction, so `len() <= limit()`
/// holds between any two calls. Evicted glyphs are gone for good; the
/// physics side notices their ids missing on the next sync.
pub struct GlyphSequence<R = StdRng> {
    glyphs: VecDeque<Glyph>,
    limit: usize,
    ranges: SpawnRanges,
    rng: R,
}

impl GlyphSequence<StdRng> {
    pub fn new(config: &SceneConfig) -> Self {
        let rng = StdRng::try_from_os_rng().unwrap_or_else(|err| {
            tracing::warn!(%err, "OS random source unavailable, seeding spawn rng from clock");
            StdRng::seed_from_u64(clock_seed())
        });
        Self::with_rng(config.typed_limit, config.spawn, rng)
    }
}

impl<R: Rng> GlyphSequence<R> {
    /// `limit` is raised to 1 if zero; a sequence that cannot hold the
    /// glyph it just spawned would hand out ids that never live.
    pub fn with_rng(limit: usize, ranges: SpawnRanges, rng: R) -> Self {
        let limit = limit.max(1);
        Self {
            glyphs: VecDeque::with_capacity(limit + 1),
            limit,
            ranges,
            rng,
        }
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Clear => {
                self.clear();
            }
            Command::DeleteLast => {
                self.delete_last();
            }
            Command::Spawn(ch) => {
                self.spawn(ch);
            }
        }
    }

    /// Drop every glyph, returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.glyphs.len();
        self.glyphs.clear();
        tracing::debug!(removed, "cleared glyphs");
        removed
    }

    pub fn delete_last(&mut self) -> Option<Glyph> {
        let removed = self.glyphs.pop_back();
        if let Some(glyph) = &removed {
            tracing::debug!(id = %glyph.id, ch = %glyph.ch, "deleted last glyph");
        }
        removed
    }

    /// Append a new glyph for `ch` and evict from the front past the limit.
    ///
    /// NUL and other control characters count as "no character" and are
    /// ignored, whatever the caller filtered already.
    pub fn spawn(&mut self, ch: char) -> Option<GlyphId> {
        if ch.is_control() {
            return None;
        }

        let id = GlyphId::generate(&mut self.rng);
        let spawn = SpawnState::sample(&mut self.rng, &self.ranges);
        self.glyphs.push_back(Glyph { id, ch, spawn });

        let mut evicted = 0;
        while self.glyphs.len() > self.limit {
            self.glyphs.pop_front();
            evicted += 1;
        }
        tracing::debug!(%id, %ch, evicted, live = self.glyphs.len(), "spawned glyph");

        Some(id)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, index: usize) -> Option<&Glyph> {
        self.glyphs.get(index)
    }

    #[cfg(test)]
    pub(crate) fn last(&self) -> Option<&Glyph> {
        self.glyphs.back()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: GlyphId) -> bool {
        self.glyphs.iter().any(|g| g.id == id)
    }
}

fn clock_seed() -> u64 {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            (js_sys::Date::now() * 1000.0) as u64 ^ (js_sys::Math::random() * u64::MAX as f64) as u64
        } else {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x9e37_79b9_7f4a_7c15)
        }
    }
}
