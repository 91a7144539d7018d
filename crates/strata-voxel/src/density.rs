//! Dense density volumes for volumetric edits.
//!
//! Density above zero is solid; the iso-surface sits at zero.

use glam::Vec3;

use crate::bounds::Aabb;
use crate::brush::BrushMode;
use crate::falloff::Falloff;

/// A cubic `size^3` density grid.
#[derive(Clone, Debug)]
pub struct DensityChunk {
    size: usize,
    density: Vec<f32>,
    voxel_size: f32,
    origin: Vec3,
    lod_level: u8,
    dirty: bool,
    dirty_bounds: Option<Aabb>,
}

impl DensityChunk {
    /// Chunk with every voxel set to `fill`.
    pub fn filled(size: usize, voxel_size: f32, origin: Vec3, fill: f32) -> Self {
        Self {
            size,
            density: vec![fill; size * size * size],
            voxel_size,
            origin,
            lod_level: 0,
            dirty: false,
            dirty_bounds: None,
        }
    }

    /// Chunk with density `f(x, y, z)` per voxel index.
    pub fn from_fn(
        size: usize,
        voxel_size: f32,
        origin: Vec3,
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Self {
        let mut chunk = Self::filled(size, voxel_size, origin, 0.0);
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    let idx = chunk.index(x, y, z);
                    chunk.density[idx] = f(x, y, z);
                }
            }
        }
        chunk
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Meshing stride selector: the mesher samples every `lod_level + 1` voxels.
    pub fn lod_level(&self) -> u8 {
        self.lod_level
    }

    pub fn set_lod_level(&mut self, lod_level: u8) {
        self.lod_level = lod_level;
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.size + z * self.size * self.size
    }

    /// Density at `(x, y, z)`. Each index must be below `size`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.density[self.index(x, y, z)]
    }

    /// Set the density at `(x, y, z)` and mark the voxel dirty.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        if x >= self.size || y >= self.size || z >= self.size {
            tracing::warn!(x, y, z, size = self.size, "Density write out of bounds");
            return;
        }
        let idx = self.index(x, y, z);
        self.density[idx] = value;
        let bounds = self.voxel_bounds(x, y, z);
        self.mark_dirty(bounds);
    }

    #[inline]
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.get(x, y, z) > 0.0
    }

    /// World position of a voxel's center.
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Vec3 {
        self.origin + (Vec3::new(x as f32, y as f32, z as f32) + 0.5) * self.voxel_size
    }

    /// World-space box covered by one voxel.
    pub fn voxel_bounds(&self, x: usize, y: usize, z: usize) -> Aabb {
        let min = self.origin + Vec3::new(x as f32, y as f32, z as f32) * self.voxel_size;
        Aabb::new(min, min + Vec3::splat(self.voxel_size))
    }

    /// World-space box covered by the whole chunk.
    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(
            self.origin,
            self.origin + Vec3::splat(self.size as f32 * self.voxel_size),
        )
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn dirty_bounds(&self) -> Option<Aabb> {
        self.dirty_bounds
    }

    /// Union `bounds` into the dirty region.
    pub fn mark_dirty(&mut self, bounds: Aabb) {
        self.dirty = true;
        self.dirty_bounds = Some(match self.dirty_bounds {
            Some(existing) => existing.union(&bounds),
            None => bounds,
        });
    }

    /// Clear the dirty flag, returning the accumulated region.
    pub fn take_dirty(&mut self) -> Option<Aabb> {
        self.dirty = false;
        self.dirty_bounds.take()
    }

    /// Voxel index range `[lo, hi]` on one axis whose centers may lie in
    /// `[min, max]`.
    fn axis_range(&self, min: f32, max: f32, origin: f32) -> Option<(usize, usize)> {
        let lo = ((min - origin) / self.voxel_size - 0.5).ceil().max(0.0);
        let hi = ((max - origin) / self.voxel_size - 0.5)
            .floor()
            .min(self.size as f32 - 1.0);
        if lo > hi {
            return None;
        }
        Some((lo as usize, hi as usize))
    }
}

/// Apply a spherical density brush.
///
/// Every voxel whose center lies within `radius` of `center` changes by
/// `strength * falloff(d / radius)`, added for [`BrushMode::Place`] and
/// subtracted for [`BrushMode::Dig`]. The touched voxels' world boxes are
/// reported to the chunk as its dirty region and returned.
pub fn apply_sphere(
    chunk: &mut DensityChunk,
    center: Vec3,
    radius: f32,
    strength: f32,
    falloff: Falloff,
    mode: BrushMode,
) -> Option<Aabb> {
    let reach = Aabb::around_sphere(center, radius);
    let origin = chunk.origin;
    let (x0, x1) = chunk.axis_range(reach.min.x, reach.max.x, origin.x)?;
    let (y0, y1) = chunk.axis_range(reach.min.y, reach.max.y, origin.y)?;
    let (z0, z1) = chunk.axis_range(reach.min.z, reach.max.z, origin.z)?;

    let sign = mode.sign();
    let mut touched: Option<Aabb> = None;
    for z in z0..=z1 {
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = chunk.voxel_center(x, y, z).distance(center);
                if d > radius {
                    continue;
                }
                let w = falloff.at_distance(d, radius);
                let idx = chunk.index(x, y, z);
                chunk.density[idx] += sign * w * strength;

                let vb = chunk.voxel_bounds(x, y, z);
                touched = Some(touched.map_or(vb, |t| t.union(&vb)));
            }
        }
    }

    let touched = touched?;
    chunk.mark_dirty(touched);
    Some(touched)
}
