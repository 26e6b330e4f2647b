//! Integer grid rectangle used for dirty-region tracking.

/// Inclusive axis-aligned rectangle over integer grid coordinates.
///
/// The empty rectangle is represented with `min > max`; expanding an empty
/// rectangle adopts the incoming bounds. Edits are coalesced into a single
/// enclosing rectangle, so two small edits far apart inflate the tracked
/// region to their bounding union.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRect {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl GridRect {
    /// The empty rectangle
    pub const EMPTY: GridRect = GridRect {
        min_x: 0,
        min_z: 0,
        max_x: -1,
        max_z: -1,
    };

    /// Rectangle covering a single cell
    pub fn from_point(x: i32, z: i32) -> Self {
        Self {
            min_x: x,
            min_z: z,
            max_x: x,
            max_z: z,
        }
    }

    /// Rectangle from an origin and extent (width/height in cells, inclusive bounds)
    pub fn from_extent(x: i32, z: i32, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::EMPTY;
        }
        Self {
            min_x: x,
            min_z: z,
            max_x: x + width as i32 - 1,
            max_z: z + height as i32 - 1,
        }
    }

    /// Check whether this rectangle covers no cells
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_z > self.max_z
    }

    /// Number of cells covered along X
    pub fn width(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.max_x - self.min_x + 1) as u32
        }
    }

    /// Number of cells covered along Z
    pub fn height(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.max_z - self.min_z + 1) as u32
        }
    }

    /// Check whether a cell lies inside the rectangle
    pub fn contains(&self, x: i32, z: i32) -> bool {
        !self.is_empty()
            && x >= self.min_x
            && x <= self.max_x
            && z >= self.min_z
            && z <= self.max_z
    }

    /// Grow to the union of this rectangle and another
    pub fn expand_to_include(&mut self, other: &GridRect) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_z = self.min_z.min(other.min_z);
        self.max_x = self.max_x.max(other.max_x);
        self.max_z = self.max_z.max(other.max_z);
    }

    /// Reset to the empty rectangle
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for GridRect {
    fn default() -> Self {
        Self::EMPTY
    }
}
