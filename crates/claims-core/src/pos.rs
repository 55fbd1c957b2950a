//! World addressing: dimensions, chunk cells and block positions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Blocks per chunk edge.
pub const CHUNK_SIZE: i32 = 16;

/// Identifier of a distinct world instance (e.g. `minecraft:overworld`).
///
/// Cheap to clone; claims never cross a dimension boundary.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DimensionId(Arc<str>);

impl DimensionId {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn overworld() -> Self {
        Self::new("minecraft:overworld")
    }

    #[must_use]
    pub fn nether() -> Self {
        Self::new("minecraft:the_nether")
    }

    #[must_use]
    pub fn end() -> Self {
        Self::new("minecraft:the_end")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DimensionId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for DimensionId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<DimensionId> for String {
    fn from(value: DimensionId) -> Self {
        value.0.as_ref().to_owned()
    }
}

impl fmt::Debug for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DimensionId({})", self.0)
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chunk coordinates - the addressable unit of claiming.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Whether both coordinates lie within `[-border, border]`.
    #[must_use]
    pub const fn is_within(self, border: i32) -> bool {
        self.x >= -border && self.x <= border && self.z >= -border && self.z <= border
    }

    /// Iterate every chunk of the rectangle spanned by two corners (inclusive,
    /// corners in any order), row by row.
    pub fn rect(a: Self, b: Self) -> impl Iterator<Item = Self> {
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_z, max_z) = (a.z.min(b.z), a.z.max(b.z));
        (min_z..=max_z).flat_map(move |z| (min_x..=max_x).map(move |x| Self::new(x, z)))
    }

    /// Number of chunks in the rectangle spanned by two corners.
    #[must_use]
    pub fn rect_area(a: Self, b: Self) -> u64 {
        let w = u64::from(a.x.abs_diff(b.x)) + 1;
        let h = u64::from(a.z.abs_diff(b.z)) + 1;
        w * h
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Horizontal and vertical facing of a block face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    pub const HORIZONTAL: [Self; 4] = [Self::North, Self::South, Self::West, Self::East];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Unit step `(dx, dy, dz)` of this direction.
    #[must_use]
    pub const fn step(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }
}

/// Block position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing this block. Floors toward negative infinity.
    #[must_use]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x.div_euclid(CHUNK_SIZE), self.z.div_euclid(CHUNK_SIZE))
    }

    #[must_use]
    pub const fn offset(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.step();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
