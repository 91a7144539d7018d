//! Sphere brush applied to height chunks.
//!
//! The brush works in the XZ plane: a vertex at planar distance `d` from the
//! center moves by `strength * falloff(d / radius)`, down for
//! [`BrushMode::Dig`] and up for [`BrushMode::Place`].

use glam::Vec3;

use crate::bounds::{DirtyRect, WorldRect};
use crate::falloff::Falloff;
use crate::height::HeightChunk;

/// Direction of a brush stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BrushMode {
    /// Lower terrain (height brush) or remove density (volume brush).
    Dig,
    /// Raise terrain (height brush) or add density (volume brush).
    Place,
}

impl BrushMode {
    /// `-1.0` for dig, `1.0` for place.
    pub fn sign(self) -> f32 {
        match self {
            BrushMode::Dig => -1.0,
            BrushMode::Place => 1.0,
        }
    }
}

/// A single sphere brush stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereBrush {
    pub center: Vec3,
    pub radius: f32,
    pub strength: f32,
    pub falloff: Falloff,
    pub mode: BrushMode,
}

impl SphereBrush {
    pub fn dig(center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> Self {
        Self {
            center,
            radius,
            strength,
            falloff,
            mode: BrushMode::Dig,
        }
    }

    pub fn place(center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> Self {
        Self {
            center,
            radius,
            strength,
            falloff,
            mode: BrushMode::Place,
        }
    }

    /// World-space footprint of the brush's XZ projection.
    pub fn footprint(&self) -> WorldRect {
        WorldRect::around(self.center.x, self.center.z, self.radius)
    }

    /// Signed height change at world `(x, z)`, or `None` outside the radius.
    pub fn delta_at(&self, x: f32, z: f32) -> Option<f32> {
        let dx = x - self.center.x;
        let dz = z - self.center.z;
        let d = (dx * dx + dz * dz).sqrt();
        if d > self.radius {
            return None;
        }
        let w = self.falloff.at_distance(d, self.radius);
        Some(self.mode.sign() * self.strength * w)
    }
}

/// Stamp `brush` into `chunk` and record the edit at `version`.
///
/// `on_delta(i, j, delta)` is called for every vertex the brush reaches, so
/// callers can keep an edit log. Returns the recorded dirty rectangle (the
/// touched vertices padded by one cell), or `None` if no vertex lies within
/// the radius, in which case the chunk is left untouched.
pub fn stamp_sphere(
    chunk: &mut HeightChunk,
    brush: &SphereBrush,
    version: u64,
    mut on_delta: impl FnMut(usize, usize, f32),
) -> Option<DirtyRect> {
    let range = chunk.local_range(&brush.footprint())?;

    let mut touched: Option<DirtyRect> = None;
    for (i, j) in range.iter() {
        let (x, z) = chunk.vertex_world(i, j);
        let Some(delta) = brush.delta_at(x, z) else {
            continue;
        };
        chunk.grid_mut().add(i, j, delta);
        on_delta(i, j, delta);
        match touched.as_mut() {
            Some(rect) => rect.include(i, j),
            None => touched = Some(DirtyRect::point(i, j)),
        }
    }

    let touched = touched?;
    let padded = touched.expanded(1, chunk.chunk_size());
    chunk.record_edit(Some(padded), version);
    tracing::trace!(
        key = ?chunk.key(),
        version = chunk.version(),
        vertices = touched.vertex_count(),
        "Stamped sphere brush"
    );
    Some(padded)
}
