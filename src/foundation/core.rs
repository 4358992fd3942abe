use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::error::{StripIndexError, StripIndexResult};

/// Process-unique identity of a timeline-owning context.
///
/// Minted from a global counter so two live timelines never share an id,
/// which is what keys their lookup slots apart in
/// [`StripLookupCache`](crate::StripLookupCache).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TimelineId(pub u64);

static NEXT_TIMELINE_ID: AtomicU64 = AtomicU64::new(1);

impl TimelineId {
    /// Mint a fresh, never-before-used id.
    pub fn fresh() -> Self {
        Self(NEXT_TIMELINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Non-owning handle to a strip in a timeline's arena.
///
/// Handles are never reused within a timeline; a handle to a removed strip
/// simply misses on lookup.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct StripId(pub u64);

/// Non-owning handle to a timeline channel (layering lane record).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ChannelId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> StripIndexResult<Self> {
        if start.0 > end.0 {
            return Err(StripIndexError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> StripIndexResult<Self> {
        if den == 0 {
            return Err(StripIndexError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StripIndexError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_contains_boundaries() {
        let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
        assert!(!r.contains(FrameIndex(1)));
        assert!(r.contains(FrameIndex(2)));
        assert!(r.contains(FrameIndex(4)));
        assert!(!r.contains(FrameIndex(5)));
    }

    #[test]
    fn frame_range_rejects_inverted() {
        assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    }

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!((Fps::new(30, 1).unwrap().as_f64() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn timeline_ids_are_unique() {
        let a = TimelineId::fresh();
        let b = TimelineId::fresh();
        assert_ne!(a, b);
    }
}
