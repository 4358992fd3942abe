use std::collections::HashMap;

use indexmap::IndexSet;

use crate::foundation::core::{ChannelId, StripId};
use crate::timeline::model::{Strip, Timeline};

/// One generation of the derived lookup maps.
///
/// An index is built wholesale by a single depth-first walk and never
/// mutated afterwards except for its validity flag; a stale index is
/// replaced, not patched, so no entry can outlive the structure that
/// produced it.
#[derive(Debug, Default)]
pub(crate) struct LookupIndex {
    /// Display name to strip, across all nesting levels. On duplicate
    /// names the later-registered strip (walk order) wins.
    strip_by_name: HashMap<String, StripId>,
    /// Strip to the meta strip directly holding it; `None` for top-level
    /// strips.
    meta_by_strip: HashMap<StripId, Option<StripId>>,
    /// Strip to the effect strips that take it as an input, in
    /// registration order.
    effects_by_strip: HashMap<StripId, IndexSet<StripId>>,
    /// Channel to the meta strip declaring it. Root-declared channels are
    /// not registered; their owner is the document root.
    owner_by_channel: HashMap<ChannelId, StripId>,
    is_valid: bool,
}

impl LookupIndex {
    /// Build a fresh index from the timeline's current structure.
    pub(crate) fn build(tl: &Timeline) -> Self {
        let mut index = Self::default();
        index.walk(tl, None, tl.root_strips());
        index.is_valid = true;
        index
    }

    fn walk(&mut self, tl: &Timeline, parent: Option<StripId>, siblings: &[StripId]) {
        if let Some(meta_id) = parent
            && let Some(meta) = tl.strip(meta_id)
        {
            for channel in &meta.channels {
                self.owner_by_channel.insert(channel.id, meta_id);
            }
        }

        for sid in siblings {
            let Some(strip) = tl.strip(*sid) else {
                // Dangling sibling reference; validate() reports these.
                continue;
            };
            self.strip_by_name.insert(strip.name.clone(), strip.id);
            self.meta_by_strip.insert(strip.id, parent);
            self.register_effect(strip);
            if strip.is_meta() {
                self.walk(tl, Some(strip.id), &strip.children);
            }
        }
    }

    fn register_effect(&mut self, strip: &Strip) {
        if !strip.is_effect() {
            return;
        }
        for input in [strip.input1, strip.input2].into_iter().flatten() {
            self.effects_by_strip
                .entry(input)
                .or_default()
                .insert(strip.id);
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub(crate) fn invalidate(&mut self) {
        self.is_valid = false;
    }

    pub(crate) fn strip_by_name(&self, name: &str) -> Option<StripId> {
        self.strip_by_name.get(name).copied()
    }

    pub(crate) fn meta_by_strip(&self, strip: StripId) -> Option<StripId> {
        self.meta_by_strip.get(&strip).copied().flatten()
    }

    /// Dependent effects of `strip`, empty when it has none. A miss is a
    /// plain empty answer and leaves the map untouched.
    pub(crate) fn effects_by_strip(&self, strip: StripId) -> Vec<StripId> {
        self.effects_by_strip
            .get(&strip)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn owner_by_channel(&self, channel: ChannelId) -> Option<StripId> {
        self.owner_by_channel.get(&channel).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{FrameIndex, FrameRange, Fps};
    use crate::timeline::model::{EffectKind, StripKind};

    fn timeline() -> Timeline {
        Timeline::new(Fps::new(24, 1).unwrap(), FrameIndex(100))
    }

    fn range() -> FrameRange {
        FrameRange::new(FrameIndex(0), FrameIndex(100)).unwrap()
    }

    #[test]
    fn walk_registers_all_levels() {
        let mut tl = timeline();
        let meta = tl.add_strip(None, "M", StripKind::Meta, range()).unwrap();
        let inner = tl
            .add_strip(Some(meta), "C", StripKind::Movie, range())
            .unwrap();

        let index = LookupIndex::build(&tl);
        assert!(index.is_valid());
        assert_eq!(index.strip_by_name("M"), Some(meta));
        assert_eq!(index.strip_by_name("C"), Some(inner));
        assert_eq!(index.meta_by_strip(meta), None);
        assert_eq!(index.meta_by_strip(inner), Some(meta));
    }

    #[test]
    fn later_duplicate_name_wins() {
        let mut tl = timeline();
        let first = tl.add_strip(None, "A", StripKind::Movie, range()).unwrap();
        let second = tl.add_strip(None, "A", StripKind::Movie, range()).unwrap();

        let index = LookupIndex::build(&tl);
        assert_ne!(first, second);
        assert_eq!(index.strip_by_name("A"), Some(second));
    }

    #[test]
    fn effects_registered_per_input_in_order() {
        let mut tl = timeline();
        let a = tl.add_strip(None, "A", StripKind::Movie, range()).unwrap();
        let x = tl
            .add_strip(None, "X", StripKind::Effect(EffectKind::Cross), range())
            .unwrap();
        let y = tl
            .add_strip(None, "Y", StripKind::Effect(EffectKind::Glow), range())
            .unwrap();
        tl.set_effect_inputs(x, Some(a), Some(a)).unwrap();
        tl.set_effect_inputs(y, Some(a), None).unwrap();

        let index = LookupIndex::build(&tl);
        // x appears once even though both of its inputs are `a`.
        assert_eq!(index.effects_by_strip(a), vec![x, y]);
        assert_eq!(index.effects_by_strip(x), Vec::<StripId>::new());
    }

    #[test]
    fn channels_map_to_declaring_meta_only() {
        let mut tl = timeline();
        let meta = tl.add_strip(None, "M", StripKind::Meta, range()).unwrap();
        let root_ch = tl.add_channel(None, "video 1").unwrap();
        let meta_ch = tl.add_channel(Some(meta), "inner 1").unwrap();

        let index = LookupIndex::build(&tl);
        assert_eq!(index.owner_by_channel(meta_ch), Some(meta));
        assert_eq!(index.owner_by_channel(root_ch), None);
    }
}
