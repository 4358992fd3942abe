//! Stripindex maintains derived lookup indices over a non-linear editing
//! timeline's strip graph.
//!
//! A [`Timeline`] owns strips (clips, sounds, images, nested meta strips,
//! and effect strips with up to two inputs) plus the channels declared by
//! metas and the document root. A [`StripLookupCache`] answers the reverse
//! questions the primary storage cannot answer cheaply:
//!
//! - **name → strip**: [`StripLookupCache::strip_by_name`]
//! - **strip → parent meta**: [`StripLookupCache::parent_meta`]
//! - **strip → dependent effects**: [`StripLookupCache::effects_of`]
//! - **channel → owning meta**: [`StripLookupCache::channel_owner`]
//!
//! The four maps are one unit: any lookup against a stale or missing index
//! rebuilds all of them wholesale with a single depth-first walk before
//! answering. The cache does no change detection; after any structural
//! edit the caller invalidates ([`StripLookupCache::invalidate`]) and the
//! next lookup pays for the rebuild. Misses are absent values, never
//! errors.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Non-owning**: the cache stores only [`StripId`]/[`ChannelId`]
//!   handles; dropping it never affects strip lifetime.
//! - **Coarse locking**: one subsystem mutex serializes every operation,
//!   rebuilds included, so callers on any thread see either the old index
//!   or the new one, never a partial state.
//! - **Wholesale rebuild**: a fresh index replaces the old one entirely;
//!   renamed or deleted strips cannot leave dangling entries behind.
//!
//! # Getting started
//!
//! ```
//! use stripindex::{
//!     EffectKind, Fps, FrameIndex, FrameRange, StripKind, StripLookupCache, Timeline,
//! };
//!
//! let mut tl = Timeline::new(Fps::new(30, 1)?, FrameIndex(240));
//! let range = FrameRange::new(FrameIndex(0), FrameIndex(240))?;
//! let a = tl.add_strip(None, "A", StripKind::Movie, range)?;
//! let x = tl.add_strip(None, "X", StripKind::Effect(EffectKind::Glow), range)?;
//! tl.set_effect_inputs(x, Some(a), None)?;
//!
//! let cache = StripLookupCache::new();
//! assert_eq!(cache.strip_by_name(&tl, "A"), Some(a));
//! assert_eq!(cache.effects_of(&tl, a), vec![x]);
//!
//! tl.rename_strip(a, "A2")?;
//! cache.invalidate(&tl);
//! assert_eq!(cache.strip_by_name(&tl, "A"), None);
//! assert_eq!(cache.strip_by_name(&tl, "A2"), Some(a));
//! # Ok::<(), stripindex::StripIndexError>(())
//! ```
#![forbid(unsafe_code)]

mod foundation;
mod lookup;
mod timeline;

pub use foundation::core::{ChannelId, Fps, FrameIndex, FrameRange, StripId, TimelineId};
pub use foundation::error::{StripIndexError, StripIndexResult};
pub use lookup::cache::{CacheStats, StripLookupCache};
pub use timeline::model::{Channel, EffectKind, Strip, StripKind, Timeline};
