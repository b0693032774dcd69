use std::collections::HashSet;

use crate::model::{Glyph, GlyphId, GlyphSequence};

/// What has to change on the engine side to match the sequence
#[derive(Debug, Default, PartialEq)]
pub struct Diff<'a> {
    /// In the sequence, no resources yet (sequence order)
    pub create: Vec<&'a Glyph>,
    /// Resources exist, id no longer in the sequence
    pub destroy: Vec<GlyphId>,
}

impl Diff<'_> {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.destroy.is_empty()
    }
}

/// Compare the ids that currently own engine resources with the live sequence.
pub fn diff<'a, R>(
    instantiated: impl IntoIterator<Item = GlyphId>,
    sequence: &'a GlyphSequence<R>,
) -> Diff<'a>
where
    R: rand::Rng,
{
    let live: HashSet<GlyphId> = sequence.iter().map(|g| g.id).collect();
    let existing: HashSet<GlyphId> = instantiated.into_iter().collect();

    let create = sequence.iter().filter(|g| !existing.contains(&g.id)).collect();
    let mut destroy: Vec<GlyphId> = existing.difference(&live).copied().collect();
    destroy.sort();

    Diff { create, destroy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnRanges;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequence(limit: usize) -> GlyphSequence<StdRng> {
        GlyphSequence::with_rng(limit, SpawnRanges::default(), StdRng::seed_from_u64(21))
    }

    #[test]
    fn test_everything_new_on_first_frame() {
        let mut seq = sequence(10);
        seq.spawn('a');
        seq.spawn('b');

        let d = diff(std::iter::empty(), &seq);
        let chars: String = d.create.iter().map(|g| g.ch).collect();
        assert_eq!(chars, "ab");
        assert!(d.destroy.is_empty());
    }

    #[test]
    fn test_steady_state_is_empty() {
        let mut seq = sequence(10);
        seq.spawn('a');
        let ids: Vec<_> = seq.iter().map(|g| g.id).collect();

        assert!(diff(ids, &seq).is_empty());
    }

    #[test]
    fn test_eviction_destroys_and_creates() {
        let mut seq = sequence(2);
        seq.spawn('a');
        seq.spawn('b');
        let before: Vec<_> = seq.iter().map(|g| g.id).collect();

        seq.spawn('c');
        let d = diff(before.clone(), &seq);

        assert_eq!(d.destroy, vec![before[0]]);
        assert_eq!(d.create.len(), 1);
        assert_eq!(d.create[0].ch, 'c');
    }

    #[test]
    fn test_clear_destroys_all() {
        let mut seq = sequence(10);
        for ch in "abc".chars() {
            seq.spawn(ch);
        }
        let before: Vec<_> = seq.iter().map(|g| g.id).collect();
        seq.clear();

        let d = diff(before.clone(), &seq);
        let mut expected = before;
        expected.sort();
        assert_eq!(d.destroy, expected);
        assert!(d.create.is_empty());
    }
}
