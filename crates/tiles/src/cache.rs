//! In-process tile cache with explicit freshness states.

use singletrack_core::TileCoord;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;
use time::OffsetDateTime;

/// Freshness of a cached payload. Absence of an entry is the fourth,
/// implicit state (not found).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    /// Rendered, zero features. Bytes are empty.
    Empty,
    /// Rendered and current.
    Valid,
    /// A write touched this tile since the last render. Bytes (possibly
    /// non-empty) are the stale prior payload, retained for fallback.
    Invalidated,
}

impl TileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Valid => "valid",
            Self::Invalidated => "invalidated",
        }
    }
}

/// A cached tile payload.
#[derive(Debug, Clone)]
pub struct CachedTile {
    pub bytes: Vec<u8>,
    pub status: TileStatus,
    pub generated_at: OffsetDateTime,
}

/// Keyed tile store, safe for concurrent readers and writers.
///
/// The lock scope is limited to the map mutation; rendering always happens
/// outside. This is a process-local accelerator over the authoritative
/// spatial database — dropping it entirely is always safe.
#[derive(Debug, Default)]
pub struct TileCache {
    entries: RwLock<HashMap<TileCoord, CachedTile>>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current known state of a tile. Never triggers regeneration.
    pub fn get(&self, coord: TileCoord) -> Option<CachedTile> {
        self.entries
            .read()
            .expect("tile cache lock poisoned")
            .get(&coord)
            .cloned()
    }

    /// Record a completed render. Status becomes `Valid` for non-empty
    /// bytes, `Empty` otherwise; any prior state, including `Invalidated`,
    /// is fully overwritten.
    pub fn store(&self, coord: TileCoord, bytes: Vec<u8>) {
        let status = if bytes.is_empty() {
            TileStatus::Empty
        } else {
            TileStatus::Valid
        };
        let entry = CachedTile {
            bytes,
            status,
            generated_at: OffsetDateTime::now_utc(),
        };
        self.entries
            .write()
            .expect("tile cache lock poisoned")
            .insert(coord, entry);
    }

    /// Flag tiles as stale. Existing entries keep their bytes for fallback;
    /// unknown tiles get an empty placeholder so a future read knows
    /// regeneration is owed. Returns the number of entries newly marked
    /// invalid; entries already invalidated (and duplicate input coords)
    /// do not count again.
    pub fn invalidate(&self, coords: &[TileCoord]) -> usize {
        let mut entries = self.entries.write().expect("tile cache lock poisoned");
        let mut marked = 0;
        for coord in coords {
            match entries.entry(*coord) {
                Entry::Occupied(mut e) => {
                    if e.get().status != TileStatus::Invalidated {
                        e.get_mut().status = TileStatus::Invalidated;
                        marked += 1;
                    }
                }
                Entry::Vacant(v) => {
                    v.insert(CachedTile {
                        bytes: Vec::new(),
                        status: TileStatus::Invalidated,
                        generated_at: OffsetDateTime::now_utc(),
                    });
                    marked += 1;
                }
            }
        }
        marked
    }

    /// Drop every entry. Operational reset only.
    pub fn clear_all(&self) {
        self.entries
            .write()
            .expect("tile cache lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("tile cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
