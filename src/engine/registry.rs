//! Track registry shared between the control and render contexts
//!
//! The set of tracks lives in an immutable [`TrackTable`] published through an
//! `ArcSwap`: reconfiguration builds a complete new table and swaps it in, so
//! the render context sees either the old table or the new one, never a mix.
//!
//! Inside a table each field group of a track is its own atomic. Control-side
//! writes (volume, enabled) and the render-side filter write-back are single
//! stores and never wait on each other.
//!
//! A swapped-out table is parked in a retired list until the render context
//! lets go of it, so its memory is always released on the control side.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TrackConfig;
use crate::dsp::NoiseKind;

// ============================================================================
// Track Identity
// ============================================================================

/// Stable identity of a track within one configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Fresh random id
    pub fn new() -> Self {
        TrackId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        TrackId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TrackId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TrackId)
    }
}

// ============================================================================
// Atomic Helpers
// ============================================================================

/// f32 stored as its bit pattern
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Clamp a volume into [0, 1]; NaN becomes silence
#[inline]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Track Slot
// ============================================================================

/// Live state of one track inside a published table
#[derive(Debug)]
pub struct TrackSlot {
    id: TrackId,
    kind: NoiseKind,
    volume: AtomicF32,
    enabled: AtomicBool,
    filter: AtomicF32,
}

impl TrackSlot {
    fn from_config(track: &TrackConfig) -> Self {
        Self {
            id: track.id,
            kind: track.kind,
            volume: AtomicF32::new(clamp_volume(track.volume)),
            enabled: AtomicBool::new(track.enabled),
            filter: AtomicF32::new(0.0),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Current filter memory
    #[inline]
    pub fn filter_value(&self) -> f32 {
        self.filter.load()
    }

    /// Render-side write-back of filter memory
    #[inline]
    pub(crate) fn store_filter(&self, value: f32) {
        self.filter.store(value);
    }

    fn state(&self) -> TrackState {
        TrackState {
            id: self.id,
            kind: self.kind,
            volume: self.volume(),
            enabled: self.is_enabled(),
            filter_value: self.filter_value(),
        }
    }
}

/// Plain copy of one track's state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackState {
    pub id: TrackId,
    pub kind: NoiseKind,
    pub volume: f32,
    pub enabled: bool,
    pub filter_value: f32,
}

// ============================================================================
// Track Table
// ============================================================================

/// Immutable set of tracks for one configuration
#[derive(Debug, Default)]
pub struct TrackTable {
    slots: Vec<TrackSlot>,
    index: HashMap<TrackId, usize>,
}

impl TrackTable {
    /// Build a table with fresh filter memory for every track
    ///
    /// Duplicate ids collapse onto the first position, last definition wins.
    pub fn from_configs(tracks: &[TrackConfig]) -> Self {
        let mut table = TrackTable {
            slots: Vec::with_capacity(tracks.len()),
            index: HashMap::with_capacity(tracks.len()),
        };
        for track in tracks {
            let slot = TrackSlot::from_config(track);
            match table.index.get(&track.id) {
                Some(&existing) => table.slots[existing] = slot,
                None => {
                    table.index.insert(track.id, table.slots.len());
                    table.slots.push(slot);
                }
            }
        }
        table
    }

    pub fn slots(&self) -> &[TrackSlot] {
        &self.slots
    }

    pub fn get(&self, id: TrackId) -> Option<&TrackSlot> {
        self.index.get(&id).map(|&i| &self.slots[i])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Shared mix state: the published track table plus the master volume
#[derive(Debug)]
pub struct TrackRegistry {
    table: ArcSwap<TrackTable>,
    master_volume: AtomicF32,
    /// Control side only
    retired: Mutex<Vec<Arc<TrackTable>>>,
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackRegistry {
    /// Empty registry at full master volume
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(TrackTable::default()),
            master_volume: AtomicF32::new(1.0),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Replace every track wholesale; returns the number of tracks published
    pub fn configure(&self, tracks: &[TrackConfig]) -> usize {
        let table = TrackTable::from_configs(tracks);
        let count = table.len();
        let old = self.table.swap(Arc::new(table));
        self.retired.lock().push(old);
        self.reclaim();
        count
    }

    /// Free retired tables the render context no longer holds
    ///
    /// Returns the number of tables released.
    pub fn reclaim(&self) -> usize {
        let mut retired = self.retired.lock();
        let before = retired.len();
        // A count of one is our own reference
        retired.retain(|table| Arc::strong_count(table) > 1);
        before - retired.len()
    }

    /// Number of swapped-out tables still waiting on the render context
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Set a track's volume; `false` when the id is unknown
    pub fn set_volume(&self, id: TrackId, volume: f32) -> bool {
        match self.table.load().get(id) {
            Some(slot) => {
                slot.volume.store(clamp_volume(volume));
                true
            }
            None => false,
        }
    }

    /// Enable or disable a track; `false` when the id is unknown
    pub fn set_enabled(&self, id: TrackId, enabled: bool) -> bool {
        match self.table.load().get(id) {
            Some(slot) => {
                slot.enabled.store(enabled, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume.load()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume.store(clamp_volume(volume));
    }

    /// Current table, held for the duration of one render block
    #[inline]
    pub fn current(&self) -> Arc<TrackTable> {
        self.table.load_full()
    }

    /// Copy of one track's state
    pub fn track(&self, id: TrackId) -> Option<TrackState> {
        self.table.load().get(id).map(TrackSlot::state)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.table.load().get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    /// Copy of the whole mix state, in configuration order
    pub fn snapshot(&self) -> MixSnapshot {
        let table = self.table.load();
        MixSnapshot {
            tracks: table.slots().iter().map(TrackSlot::state).collect(),
            master_volume: self.master_volume(),
        }
    }
}

/// Point-in-time copy of the registry for observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixSnapshot {
    pub tracks: Vec<TrackState>,
    pub master_volume: f32,
}

impl MixSnapshot {
    pub fn get(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn enabled_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.enabled).count()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
