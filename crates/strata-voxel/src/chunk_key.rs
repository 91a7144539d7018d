//! Chunk grid addressing for the 2D height-field rings.

/// Identifies a chunk's position in a ring's chunk grid.
///
/// The world origin of a chunk is `(x, z) * chunk_world_size`, where
/// `chunk_world_size = chunk_size * tile_size` of the owning ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkKey {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkKey {
    /// Creates a new chunk key.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the key offset by `(dx, dz)` chunks.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Returns the key of the chunk containing world position `(x, z)`.
    pub fn from_world(x: f32, z: f32, chunk_world_size: f32) -> Self {
        Self {
            x: (x / chunk_world_size).floor() as i32,
            z: (z / chunk_world_size).floor() as i32,
        }
    }

    /// World-space `(x, z)` of this chunk's `(0, 0)` grid vertex.
    pub fn origin(self, chunk_world_size: f32) -> (f32, f32) {
        (
            self.x as f32 * chunk_world_size,
            self.z as f32 * chunk_world_size,
        )
    }

    /// Chebyshev (square-ring) distance to another key, in chunks.
    pub fn ring_distance(self, other: ChunkKey) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_floors_negative_coordinates() {
        assert_eq!(ChunkKey::from_world(0.0, 0.0, 32.0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(31.9, 0.0, 32.0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_world(32.0, 0.0, 32.0), ChunkKey::new(1, 0));
        assert_eq!(ChunkKey::from_world(-0.1, -32.0, 32.0), ChunkKey::new(-1, -1));
        assert_eq!(ChunkKey::from_world(-32.1, 5.0, 32.0), ChunkKey::new(-2, 0));
    }

    #[test]
    fn test_origin_matches_key_times_size() {
        assert_eq!(ChunkKey::new(3, -2).origin(64.0), (192.0, -128.0));
    }

    #[test]
    fn test_ring_distance_is_chebyshev() {
        let a = ChunkKey::new(0, 0);
        assert_eq!(a.ring_distance(ChunkKey::new(3, -1)), 3);
        assert_eq!(a.ring_distance(ChunkKey::new(-2, 2)), 2);
        assert_eq!(a.ring_distance(a), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(ChunkKey::new(1, 1).offset(-2, 3), ChunkKey::new(-1, 4));
    }
}
