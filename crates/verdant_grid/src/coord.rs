//! # Voxel Coordinates
//!
//! Integer voxel coordinates and axis-aligned inclusive boxes. The
//! ordering is lexicographic `(x, y, z)` so ordered-map iteration over
//! coordinates is deterministic.

use verdant_core::Position;

/// One voxel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VoxelCoord {
    /// X axis.
    pub x: i32,
    /// Y axis.
    pub y: i32,
    /// Z axis, positive up.
    pub z: i32,
}

impl VoxelCoord {
    /// Coordinate from components.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Coordinate offset by a delta.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl From<Position> for VoxelCoord {
    fn from(pos: Position) -> Self {
        Self::new(pos.x, pos.y, pos.z)
    }
}

/// Axis-aligned inclusive box of voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    /// Smallest contained coordinate.
    pub min: VoxelCoord,
    /// Largest contained coordinate.
    pub max: VoxelCoord,
}

impl GridBounds {
    /// Box from two corners, normalized so `min <= max` per axis.
    #[must_use]
    pub fn new(a: VoxelCoord, b: VoxelCoord) -> Self {
        Self {
            min: VoxelCoord::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: VoxelCoord::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box spanning `[0, w) x [0, h) x [0, d)`.
    #[must_use]
    pub const fn with_dimensions(width: i32, height: i32, depth: i32) -> Self {
        Self {
            min: VoxelCoord::new(0, 0, 0),
            max: VoxelCoord::new(width - 1, height - 1, depth - 1),
        }
    }

    /// Window around a center: `radius_xy` along X and Y, `radius_z`
    /// along Z.
    #[must_use]
    pub const fn around(center: VoxelCoord, radius_xy: i32, radius_z: i32) -> Self {
        Self {
            min: VoxelCoord::new(center.x - radius_xy, center.y - radius_xy, center.z - radius_z),
            max: VoxelCoord::new(center.x + radius_xy, center.y + radius_xy, center.z + radius_z),
        }
    }

    /// True if the box contains the coordinate.
    #[inline]
    #[must_use]
    pub const fn contains(&self, c: VoxelCoord) -> bool {
        c.x >= self.min.x
            && c.x <= self.max.x
            && c.y >= self.min.y
            && c.y <= self.max.y
            && c.z >= self.min.z
            && c.z <= self.max.z
    }

    /// Intersection with another box. Empty intersections collapse onto
    /// the near corner, yielding a box that contains nothing useful but
    /// stays well formed.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(
            VoxelCoord::new(
                self.min.x.max(other.min.x),
                self.min.y.max(other.min.y),
                self.min.z.max(other.min.z),
            ),
            VoxelCoord::new(
                self.max.x.min(other.max.x),
                self.max.y.min(other.max.y),
                self.max.z.min(other.max.z),
            ),
        )
    }

    /// Extent along X.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    /// Extent along Y.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    /// Extent along Z.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> i32 {
        self.max.z - self.min.z + 1
    }
}
