use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, PoisonError};

use crate::foundation::core::{ChannelId, StripId, TimelineId};
use crate::lookup::index::LookupIndex;
use crate::timeline::model::Timeline;

/// Reverse-lookup cache over timeline strip graphs.
///
/// Holds one lookup index per timeline, keyed by [`TimelineId`], all
/// behind a single mutex. That mutex is the subsystem's coarse lock: every
/// operation, rebuild included, holds it for its whole duration, so a
/// rebuild is atomic with respect to concurrent lookups and invalidation,
/// and no caller can observe a torn index. Lookups against different
/// timelines serialize against each other too; the expected call rate
/// (interactive editing) does not justify finer locking.
///
/// The cache owns no strips or channels, only handles. Answers are exact
/// while the underlying index is valid; after a structural edit the caller
/// must [`invalidate`](Self::invalidate), and the next lookup rebuilds the
/// index wholesale before answering. Lookup misses are plain absent
/// results, never errors.
#[derive(Debug, Default)]
pub struct StripLookupCache {
    slots: Mutex<HashMap<TimelineId, LookupIndex>>,
}

/// Snapshot of the cache's slot table, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Timelines with a cached index, valid or not.
    pub timelines: usize,
    /// Timelines whose index is currently valid.
    pub valid: usize,
}

impl StripLookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a strip by its display name, across all nesting levels.
    #[tracing::instrument(skip(self, tl))]
    pub fn strip_by_name(&self, tl: &Timeline, name: &str) -> Option<StripId> {
        let mut slots = self.lock();
        Self::ensure(&mut slots, tl).strip_by_name(name)
    }

    /// The meta strip directly holding `strip`, or `None` for top-level
    /// (and unknown) strips.
    #[tracing::instrument(skip(self, tl))]
    pub fn parent_meta(&self, tl: &Timeline, strip: StripId) -> Option<StripId> {
        let mut slots = self.lock();
        Self::ensure(&mut slots, tl).meta_by_strip(strip)
    }

    /// All effect strips taking `strip` as an input, in registration
    /// order. Empty, never an error, when there are none.
    #[tracing::instrument(skip(self, tl))]
    pub fn effects_of(&self, tl: &Timeline, strip: StripId) -> Vec<StripId> {
        let mut slots = self.lock();
        Self::ensure(&mut slots, tl).effects_by_strip(strip)
    }

    /// The meta strip declaring `channel`, or `None` for channels declared
    /// at the document root.
    #[tracing::instrument(skip(self, tl))]
    pub fn channel_owner(&self, tl: &Timeline, channel: ChannelId) -> Option<StripId> {
        let mut slots = self.lock();
        Self::ensure(&mut slots, tl).owner_by_channel(channel)
    }

    /// Mark the timeline's index stale without rebuilding it.
    ///
    /// Must be called after every structural mutation of the timeline
    /// (add/remove/move/rename strips, channel changes, effect-input
    /// changes); this is the sole contract the editor has to honor. The
    /// next lookup rebuilds before answering.
    pub fn invalidate(&self, tl: &Timeline) {
        let mut slots = self.lock();
        if let Some(index) = slots.get_mut(&tl.id()) {
            index.invalidate();
            tracing::debug!(timeline = tl.id().0, "strip lookup invalidated");
        }
    }

    /// Drop the timeline's index immediately. Called when the owning
    /// context is torn down; a later lookup simply rebuilds from scratch.
    pub fn free(&self, tl: &Timeline) {
        let mut slots = self.lock();
        if slots.remove(&tl.id()).is_some() {
            tracing::debug!(timeline = tl.id().0, "strip lookup freed");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.lock();
        CacheStats {
            timelines: slots.len(),
            valid: slots.values().filter(|ix| ix.is_valid()).count(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TimelineId, LookupIndex>> {
        // The guarded sections never leave a half-built index behind (a
        // panicking build does not publish its slot), so a poisoned lock
        // is safe to re-enter.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the timeline's index, rebuilding it wholesale first if it is
    /// missing or stale. Old entries are replaced, never patched.
    fn ensure<'a>(
        slots: &'a mut HashMap<TimelineId, LookupIndex>,
        tl: &Timeline,
    ) -> &'a LookupIndex {
        match slots.entry(tl.id()) {
            Entry::Occupied(entry) if entry.get().is_valid() => entry.into_mut(),
            Entry::Occupied(mut entry) => {
                entry.insert(Self::rebuild(tl));
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Self::rebuild(tl)),
        }
    }

    fn rebuild(tl: &Timeline) -> LookupIndex {
        let index = LookupIndex::build(tl);
        tracing::debug!(
            timeline = tl.id().0,
            strips = tl.strip_count(),
            "strip lookup rebuilt"
        );
        index
    }
}
