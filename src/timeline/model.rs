use std::collections::{BTreeMap, HashSet};

use crate::foundation::core::{ChannelId, FrameIndex, FrameRange, Fps, StripId, TimelineId};
use crate::foundation::error::{StripIndexError, StripIndexResult};

/// Type tag of a strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StripKind {
    Movie,
    Sound,
    Image,
    /// Container strip holding a nested sub-timeline of child strips.
    Meta,
    /// Strip whose content is derived from one or two input strips.
    Effect(EffectKind),
}

impl StripKind {
    pub fn is_effect(self) -> bool {
        matches!(self, Self::Effect(_))
    }

    pub fn is_meta(self) -> bool {
        matches!(self, Self::Meta)
    }
}

/// Concrete effect implemented by an [`StripKind::Effect`] strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EffectKind {
    Cross,
    GammaCross,
    Wipe,
    AlphaOver,
    Add,
    Subtract,
    Multiply,
    Glow,
    Speed,
}

/// A layering lane declared by a meta strip or by the document root.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub muted: bool,
    pub locked: bool,
}

/// A timed element in the editing timeline.
///
/// `children` and `channels` are populated only for [`StripKind::Meta`]
/// strips; `input1`/`input2` only for [`StripKind::Effect`] strips. All
/// cross-strip references are non-owning [`StripId`] handles into the
/// owning [`Timeline`]'s arena.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Strip {
    pub id: StripId,
    /// Display name, meant to be unique across the whole timeline
    /// (nesting included). Enforced by [`Timeline::validate`], accepted
    /// silently by the lookup index.
    pub name: String,
    pub kind: StripKind,
    /// Placement on the timeline, `[start, end)`.
    pub range: FrameRange,
    /// Lane number the strip sits on. Not structural: changing it does not
    /// require invalidating lookup caches.
    pub lane: u32,
    /// First effect input, if this is an effect strip.
    pub input1: Option<StripId>,
    /// Second effect input, if this is a two-input effect strip.
    pub input2: Option<StripId>,
    /// Child strips of a meta strip, in sibling order.
    pub children: Vec<StripId>,
    /// Channels declared by a meta strip.
    pub channels: Vec<Channel>,
    /// Per-effect parameters, opaque to this crate.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Strip {
    pub fn is_effect(&self) -> bool {
        self.kind.is_effect()
    }

    pub fn is_meta(&self) -> bool {
        self.kind.is_meta()
    }
}

/// The timeline-owning editing context: source of truth for strips and
/// channels.
///
/// Strips live in an id-keyed arena; the hierarchy is expressed through the
/// root list and each meta strip's `children` list. Handles are monotonic
/// and never reused, so a handle to a removed strip misses instead of
/// aliasing.
///
/// # Lookup cache contract
///
/// Every structural mutator on this type ([`add_strip`](Self::add_strip),
/// [`remove_strip`](Self::remove_strip), [`rename_strip`](Self::rename_strip),
/// [`set_effect_inputs`](Self::set_effect_inputs), [`move_strip`](Self::move_strip),
/// [`add_channel`](Self::add_channel), [`remove_channel`](Self::remove_channel))
/// requires callers holding a [`StripLookupCache`](crate::StripLookupCache)
/// to call its `invalidate` afterwards. The cache does no change detection
/// of its own; skipping the call yields stale (never torn) answers.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Runtime identity; never serialized or cloned, so a deserialized or
    /// copied timeline cannot alias another live timeline's cache slot.
    #[serde(skip, default = "TimelineId::fresh")]
    id: TimelineId,
    pub fps: Fps,
    pub duration: FrameIndex,
    strips: BTreeMap<StripId, Strip>,
    root: Vec<StripId>,
    channels: Vec<Channel>,
    next_strip: u64,
    next_channel: u64,
}

impl Clone for Timeline {
    /// Clones mint a fresh [`TimelineId`]: a copy is a new editing context
    /// and must not hit the original's cache slot.
    fn clone(&self) -> Self {
        Self {
            id: TimelineId::fresh(),
            fps: self.fps,
            duration: self.duration,
            strips: self.strips.clone(),
            root: self.root.clone(),
            channels: self.channels.clone(),
            next_strip: self.next_strip,
            next_channel: self.next_channel,
        }
    }
}

impl Timeline {
    pub fn new(fps: Fps, duration: FrameIndex) -> Self {
        Self {
            id: TimelineId::fresh(),
            fps,
            duration,
            strips: BTreeMap::new(),
            root: Vec::new(),
            channels: Vec::new(),
            next_strip: 0,
            next_channel: 0,
        }
    }

    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn strip(&self, id: StripId) -> Option<&Strip> {
        self.strips.get(&id)
    }

    /// Top-level strips in sibling order.
    pub fn root_strips(&self) -> &[StripId] {
        &self.root
    }

    /// Channels declared at the document root.
    pub fn root_channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    /// All strips in arena (id) order, nesting flattened.
    pub fn strips(&self) -> impl Iterator<Item = &Strip> {
        self.strips.values()
    }

    /// Add a strip under `parent` (a meta strip) or at the document root.
    pub fn add_strip(
        &mut self,
        parent: Option<StripId>,
        name: impl Into<String>,
        kind: StripKind,
        range: FrameRange,
    ) -> StripIndexResult<StripId> {
        if let Some(pid) = parent {
            let p = self
                .strips
                .get(&pid)
                .ok_or_else(|| StripIndexError::edit(format!("unknown parent strip {pid:?}")))?;
            if !p.is_meta() {
                return Err(StripIndexError::edit(format!(
                    "parent strip '{}' is not a meta strip",
                    p.name
                )));
            }
        }

        let id = StripId(self.next_strip);
        self.next_strip += 1;
        self.strips.insert(
            id,
            Strip {
                id,
                name: name.into(),
                kind,
                range,
                lane: 0,
                input1: None,
                input2: None,
                children: Vec::new(),
                channels: Vec::new(),
                params: serde_json::Value::Null,
            },
        );

        match parent {
            Some(pid) => {
                if let Some(p) = self.strips.get_mut(&pid) {
                    p.children.push(id);
                }
            }
            None => self.root.push(id),
        }
        Ok(id)
    }

    /// Remove a strip and, for meta strips, its whole subtree. Effect
    /// inputs elsewhere that pointed into the removed subtree are cleared.
    pub fn remove_strip(&mut self, id: StripId) -> StripIndexResult<()> {
        if !self.strips.contains_key(&id) {
            return Err(StripIndexError::edit(format!("unknown strip {id:?}")));
        }

        self.detach(id);
        let doomed: HashSet<StripId> = self.collect_subtree(id).into_iter().collect();
        for sid in &doomed {
            self.strips.remove(sid);
        }
        for strip in self.strips.values_mut() {
            if strip.input1.is_some_and(|i| doomed.contains(&i)) {
                strip.input1 = None;
            }
            if strip.input2.is_some_and(|i| doomed.contains(&i)) {
                strip.input2 = None;
            }
        }
        Ok(())
    }

    pub fn rename_strip(&mut self, id: StripId, name: impl Into<String>) -> StripIndexResult<()> {
        let strip = self
            .strips
            .get_mut(&id)
            .ok_or_else(|| StripIndexError::edit(format!("unknown strip {id:?}")))?;
        strip.name = name.into();
        Ok(())
    }

    /// Set the up-to-two inputs of an effect strip. Either input may be
    /// absent; present inputs must exist and differ from the effect itself.
    pub fn set_effect_inputs(
        &mut self,
        id: StripId,
        input1: Option<StripId>,
        input2: Option<StripId>,
    ) -> StripIndexResult<()> {
        for input in [input1, input2].into_iter().flatten() {
            if input == id {
                return Err(StripIndexError::edit("effect strip cannot input itself"));
            }
            if !self.strips.contains_key(&input) {
                return Err(StripIndexError::edit(format!("unknown input strip {input:?}")));
            }
        }

        let strip = self
            .strips
            .get_mut(&id)
            .ok_or_else(|| StripIndexError::edit(format!("unknown strip {id:?}")))?;
        if !strip.is_effect() {
            return Err(StripIndexError::edit(format!(
                "strip '{}' is not an effect strip",
                strip.name
            )));
        }
        strip.input1 = input1;
        strip.input2 = input2;
        Ok(())
    }

    /// Reparent a strip under `new_parent` (a meta strip) or to the root.
    /// Rejects moves into the strip's own subtree.
    pub fn move_strip(&mut self, id: StripId, new_parent: Option<StripId>) -> StripIndexResult<()> {
        if !self.strips.contains_key(&id) {
            return Err(StripIndexError::edit(format!("unknown strip {id:?}")));
        }
        if let Some(pid) = new_parent {
            let p = self
                .strips
                .get(&pid)
                .ok_or_else(|| StripIndexError::edit(format!("unknown parent strip {pid:?}")))?;
            if !p.is_meta() {
                return Err(StripIndexError::edit(format!(
                    "parent strip '{}' is not a meta strip",
                    p.name
                )));
            }
            if self.collect_subtree(id).contains(&pid) {
                return Err(StripIndexError::edit(
                    "cannot move a strip into its own subtree",
                ));
            }
        }

        self.detach(id);
        match new_parent {
            Some(pid) => {
                if let Some(p) = self.strips.get_mut(&pid) {
                    p.children.push(id);
                }
            }
            None => self.root.push(id),
        }
        Ok(())
    }

    /// Declare a channel on a meta strip, or at the document root when
    /// `owner` is `None`.
    pub fn add_channel(
        &mut self,
        owner: Option<StripId>,
        name: impl Into<String>,
    ) -> StripIndexResult<ChannelId> {
        let id = ChannelId(self.next_channel);
        let channel = Channel {
            id,
            name: name.into(),
            muted: false,
            locked: false,
        };

        match owner {
            Some(sid) => {
                let s = self
                    .strips
                    .get_mut(&sid)
                    .ok_or_else(|| StripIndexError::edit(format!("unknown strip {sid:?}")))?;
                if !s.is_meta() {
                    return Err(StripIndexError::edit(format!(
                        "strip '{}' cannot declare channels (not a meta strip)",
                        s.name
                    )));
                }
                s.channels.push(channel);
            }
            None => self.channels.push(channel),
        }
        self.next_channel += 1;
        Ok(id)
    }

    pub fn remove_channel(&mut self, id: ChannelId) -> StripIndexResult<()> {
        let before = self.channels.len();
        self.channels.retain(|c| c.id != id);
        if self.channels.len() != before {
            return Ok(());
        }
        for strip in self.strips.values_mut() {
            let before = strip.channels.len();
            strip.channels.retain(|c| c.id != id);
            if strip.channels.len() != before {
                return Ok(());
            }
        }
        Err(StripIndexError::edit(format!("unknown channel {id:?}")))
    }

    /// Set the lane of a strip. Lanes are not structural; no cache
    /// invalidation is needed after this.
    pub fn set_lane(&mut self, id: StripId, lane: u32) -> StripIndexResult<()> {
        let strip = self
            .strips
            .get_mut(&id)
            .ok_or_else(|| StripIndexError::edit(format!("unknown strip {id:?}")))?;
        strip.lane = lane;
        Ok(())
    }

    /// Replace the opaque effect parameters of a strip. Not structural.
    pub fn set_params(&mut self, id: StripId, params: serde_json::Value) -> StripIndexResult<()> {
        let strip = self
            .strips
            .get_mut(&id)
            .ok_or_else(|| StripIndexError::edit(format!("unknown strip {id:?}")))?;
        strip.params = params;
        Ok(())
    }

    /// Check the model's cross-references and preconditions.
    ///
    /// Display-name uniqueness is verified here and only here: the lookup
    /// index tolerates duplicates (later registration wins), so this is the
    /// place where an editor learns about them.
    pub fn validate(&self) -> StripIndexResult<()> {
        let mut seen_names: HashSet<&str> = HashSet::new();
        let mut seen_ids: HashSet<StripId> = HashSet::new();

        let sibling_lists = std::iter::once(&self.root).chain(
            self.strips
                .values()
                .filter(|s| s.is_meta())
                .map(|s| &s.children),
        );
        for list in sibling_lists {
            for sid in list {
                let strip = self.strips.get(sid).ok_or_else(|| {
                    StripIndexError::validation(format!("dangling strip reference {sid:?}"))
                })?;
                if !seen_ids.insert(*sid) {
                    return Err(StripIndexError::validation(format!(
                        "strip '{}' is listed under more than one parent",
                        strip.name
                    )));
                }
            }
        }
        if seen_ids.len() != self.strips.len() {
            return Err(StripIndexError::validation(
                "arena contains strips unreachable from the root",
            ));
        }

        for strip in self.strips.values() {
            if strip.name.trim().is_empty() {
                return Err(StripIndexError::validation(format!(
                    "strip {:?} has an empty name",
                    strip.id
                )));
            }
            if !seen_names.insert(strip.name.as_str()) {
                return Err(StripIndexError::validation(format!(
                    "duplicate strip name '{}'",
                    strip.name
                )));
            }
            if strip.range.start.0 > strip.range.end.0 {
                return Err(StripIndexError::validation(format!(
                    "strip '{}' has an inverted range",
                    strip.name
                )));
            }
            if !strip.is_meta() && (!strip.children.is_empty() || !strip.channels.is_empty()) {
                return Err(StripIndexError::validation(format!(
                    "strip '{}' holds children or channels but is not a meta strip",
                    strip.name
                )));
            }
            if !strip.is_effect() && (strip.input1.is_some() || strip.input2.is_some()) {
                return Err(StripIndexError::validation(format!(
                    "strip '{}' has effect inputs but is not an effect strip",
                    strip.name
                )));
            }
            for input in [strip.input1, strip.input2].into_iter().flatten() {
                if input == strip.id {
                    return Err(StripIndexError::validation(format!(
                        "effect strip '{}' inputs itself",
                        strip.name
                    )));
                }
                if !self.strips.contains_key(&input) {
                    return Err(StripIndexError::validation(format!(
                        "effect strip '{}' references missing input {input:?}",
                        strip.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Remove `id` from whichever sibling list holds it.
    fn detach(&mut self, id: StripId) {
        if let Some(pos) = self.root.iter().position(|s| *s == id) {
            self.root.remove(pos);
            return;
        }
        let owner = self
            .strips
            .values()
            .find(|s| s.children.contains(&id))
            .map(|s| s.id);
        if let Some(owner) = owner
            && let Some(meta) = self.strips.get_mut(&owner)
        {
            meta.children.retain(|s| *s != id);
        }
    }

    /// `id` plus every strip transitively nested under it.
    fn collect_subtree(&self, id: StripId) -> Vec<StripId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(sid) = stack.pop() {
            out.push(sid);
            if let Some(s) = self.strips.get(&sid) {
                stack.extend(s.children.iter().copied());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_timeline() -> Timeline {
        Timeline::new(Fps::new(30, 1).unwrap(), FrameIndex(240))
    }

    fn full_range() -> FrameRange {
        FrameRange::new(FrameIndex(0), FrameIndex(240)).unwrap()
    }

    #[test]
    fn add_strip_under_root_and_meta() {
        let mut tl = basic_timeline();
        let meta = tl
            .add_strip(None, "M", StripKind::Meta, full_range())
            .unwrap();
        let child = tl
            .add_strip(Some(meta), "C", StripKind::Movie, full_range())
            .unwrap();

        assert_eq!(tl.root_strips(), &[meta]);
        assert_eq!(tl.strip(meta).unwrap().children, vec![child]);
        assert_eq!(tl.strip_count(), 2);
        tl.validate().unwrap();
    }

    #[test]
    fn add_strip_rejects_non_meta_parent() {
        let mut tl = basic_timeline();
        let movie = tl
            .add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();
        let err = tl
            .add_strip(Some(movie), "B", StripKind::Movie, full_range())
            .unwrap_err();
        assert!(err.to_string().contains("not a meta strip"));
    }

    #[test]
    fn remove_strip_drops_subtree_and_clears_inputs() {
        let mut tl = basic_timeline();
        let meta = tl
            .add_strip(None, "M", StripKind::Meta, full_range())
            .unwrap();
        let inner = tl
            .add_strip(Some(meta), "C", StripKind::Movie, full_range())
            .unwrap();
        let fx = tl
            .add_strip(None, "X", StripKind::Effect(EffectKind::Glow), full_range())
            .unwrap();
        tl.set_effect_inputs(fx, Some(inner), None).unwrap();

        tl.remove_strip(meta).unwrap();

        assert!(tl.strip(meta).is_none());
        assert!(tl.strip(inner).is_none());
        assert_eq!(tl.strip(fx).unwrap().input1, None);
        tl.validate().unwrap();
    }

    #[test]
    fn set_effect_inputs_rejects_self_and_non_effect() {
        let mut tl = basic_timeline();
        let a = tl
            .add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();
        let fx = tl
            .add_strip(None, "X", StripKind::Effect(EffectKind::Cross), full_range())
            .unwrap();

        assert!(tl.set_effect_inputs(fx, Some(fx), None).is_err());
        assert!(tl.set_effect_inputs(a, Some(fx), None).is_err());
        tl.set_effect_inputs(fx, Some(a), None).unwrap();
        assert_eq!(tl.strip(fx).unwrap().input1, Some(a));
    }

    #[test]
    fn move_strip_rejects_own_subtree() {
        let mut tl = basic_timeline();
        let outer = tl
            .add_strip(None, "M1", StripKind::Meta, full_range())
            .unwrap();
        let inner = tl
            .add_strip(Some(outer), "M2", StripKind::Meta, full_range())
            .unwrap();

        assert!(tl.move_strip(outer, Some(inner)).is_err());
        tl.move_strip(inner, None).unwrap();
        assert_eq!(tl.root_strips(), &[outer, inner]);
        assert!(tl.strip(outer).unwrap().children.is_empty());
    }

    #[test]
    fn channels_live_on_root_or_meta() {
        let mut tl = basic_timeline();
        let meta = tl
            .add_strip(None, "M", StripKind::Meta, full_range())
            .unwrap();
        let movie = tl
            .add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();

        let root_ch = tl.add_channel(None, "video 1").unwrap();
        let meta_ch = tl.add_channel(Some(meta), "inner 1").unwrap();
        assert!(tl.add_channel(Some(movie), "nope").is_err());

        assert_eq!(tl.root_channels()[0].id, root_ch);
        assert_eq!(tl.strip(meta).unwrap().channels[0].id, meta_ch);

        tl.remove_channel(meta_ch).unwrap();
        assert!(tl.strip(meta).unwrap().channels.is_empty());
        assert!(tl.remove_channel(meta_ch).is_err());
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let mut tl = basic_timeline();
        tl.add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();
        tl.add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();
        let err = tl.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate strip name"));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut tl = basic_timeline();
        tl.add_strip(None, "  ", StripKind::Movie, full_range())
            .unwrap();
        assert!(tl.validate().is_err());
    }

    #[test]
    fn clone_mints_fresh_identity() {
        let mut tl = basic_timeline();
        tl.add_strip(None, "A", StripKind::Movie, full_range())
            .unwrap();
        let copy = tl.clone();
        assert_eq!(copy.strip_count(), 1);
        assert_ne!(copy.id(), tl.id());
    }

    #[test]
    fn json_roundtrip_mints_fresh_identity() {
        let mut tl = basic_timeline();
        let meta = tl
            .add_strip(None, "M", StripKind::Meta, full_range())
            .unwrap();
        tl.add_strip(Some(meta), "C", StripKind::Movie, full_range())
            .unwrap();
        tl.add_channel(Some(meta), "inner 1").unwrap();

        let s = serde_json::to_string_pretty(&tl).unwrap();
        let de: Timeline = serde_json::from_str(&s).unwrap();
        assert_eq!(de.strip_count(), 2);
        assert_eq!(de.strip(meta).unwrap().channels.len(), 1);
        assert_ne!(de.id(), tl.id());
        de.validate().unwrap();
    }
}
