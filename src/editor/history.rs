//! Bounded undo/redo history of full heightmap snapshots.

use std::time::Instant;

use crate::math::GridRect;
use crate::terrain::{Heightmap, TerrainNode};

/// Default maximum number of retained snapshots
pub const DEFAULT_MAX_UNDO_STEPS: usize = 20;

/// One full copy of a heightmap's samples
#[derive(Clone, Debug)]
pub struct TerrainSnapshot {
    pub region: GridRect,
    pub heights: Vec<f32>,
    pub size: u32,
    pub timestamp: Instant,
}

impl TerrainSnapshot {
    fn of(heightmap: &Heightmap) -> Self {
        let size = heightmap.size();
        Self {
            region: GridRect::from_extent(0, 0, size, size),
            heights: heightmap.data().to_vec(),
            size,
            timestamp: Instant::now(),
        }
    }
}

/// Undo/redo stack over heightmap snapshots.
///
/// The cursor counts snapshots behind the present: undo is possible iff it
/// is positive, redo iff it is not at the last retained snapshot. A new
/// capture truncates any redo tail; the oldest snapshot is evicted once the
/// depth bound is hit. Each snapshot costs `size^2 * 4` bytes.
#[derive(Debug)]
pub struct EditHistory {
    snapshots: Vec<TerrainSnapshot>,
    cursor: usize,
    max_steps: usize,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::with_max_steps(DEFAULT_MAX_UNDO_STEPS)
    }

    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            max_steps: max_steps.max(1),
        }
    }

    /// Record the heightmap's current contents as a new undo point.
    ///
    /// Discards any redo tail and evicts the oldest snapshot past the depth
    /// bound. Skips invalid heightmaps.
    pub fn capture(&mut self, heightmap: &Heightmap) {
        if !heightmap.is_valid() {
            return;
        }

        self.snapshots.truncate(self.cursor);
        self.snapshots.push(TerrainSnapshot::of(heightmap));
        self.cursor = self.snapshots.len();

        if self.snapshots.len() > self.max_steps {
            self.snapshots.remove(0);
            self.cursor -= 1;
        }

        log::debug!("captured undo snapshot {}/{}", self.cursor, self.max_steps);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step back one snapshot, restoring it into the terrain.
    ///
    /// The present state is captured first when stepping off the top so a
    /// redo can return to it. Returns false with state unchanged when
    /// nothing can be undone.
    pub fn undo(&mut self, terrain: &mut TerrainNode) -> bool {
        if !self.can_undo() {
            return false;
        }

        if self.cursor == self.snapshots.len() {
            self.snapshots.push(TerrainSnapshot::of(&terrain.heightmap));
            // The present-state entry counts against the depth bound too,
            // but never evict the snapshot this undo is about to restore
            if self.snapshots.len() > self.max_steps && self.cursor > 1 {
                self.snapshots.remove(0);
                self.cursor -= 1;
            }
        }

        self.cursor -= 1;
        Self::restore(&self.snapshots[self.cursor], terrain)
    }

    /// Step forward one snapshot. Returns false when nothing can be redone.
    pub fn redo(&mut self, terrain: &mut TerrainNode) -> bool {
        if !self.can_redo() {
            return false;
        }

        self.cursor += 1;
        Self::restore(&self.snapshots[self.cursor], terrain)
    }

    /// Drop all snapshots, e.g. when the bound terrain changes
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Write a snapshot's samples back into the terrain. The bulk write
    /// marks the heightmap dirty so the next tick refreshes the mesh.
    fn restore(snapshot: &TerrainSnapshot, terrain: &mut TerrainNode) -> bool {
        if snapshot.size != terrain.heightmap.size() {
            log::warn!(
                "snapshot size {} does not match terrain size {}, skipping restore",
                snapshot.size,
                terrain.heightmap.size()
            );
            return false;
        }

        terrain
            .heightmap
            .update_region(0, 0, snapshot.size, snapshot.size, &snapshot.heights)
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new()
    }
}
