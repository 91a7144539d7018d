//! World-space rectangles and boxes, and local dirty rectangles.

use glam::Vec3;

/// Axis-aligned rectangle in world XZ space. Edges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRect {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

impl WorldRect {
    /// Create a rectangle from two corners, sorting components.
    pub fn new(x0: f32, z0: f32, x1: f32, z1: f32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_z: z0.min(z1),
            max_x: x0.max(x1),
            max_z: z0.max(z1),
        }
    }

    /// Square of half-width `radius` around `(x, z)`.
    pub fn around(x: f32, z: f32, radius: f32) -> Self {
        Self::new(x - radius, z - radius, x + radius, z + radius)
    }

    /// Returns true if the rectangles overlap or touch.
    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_z <= other.max_z
            && self.max_z >= other.min_z
    }

    /// Overlap of two rectangles, or `None` if they are disjoint.
    pub fn intersection(&self, other: &WorldRect) -> Option<WorldRect> {
        if !self.intersects(other) {
            return None;
        }
        Some(WorldRect {
            min_x: self.min_x.max(other.min_x),
            min_z: self.min_z.max(other.min_z),
            max_x: self.max_x.min(other.max_x),
            max_z: self.max_z.min(other.max_z),
        })
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Smallest rectangle enclosing both.
    pub fn union(&self, other: &WorldRect) -> WorldRect {
        WorldRect {
            min_x: self.min_x.min(other.min_x),
            min_z: self.min_z.min(other.min_z),
            max_x: self.max_x.max(other.max_x),
            max_z: self.max_z.max(other.max_z),
        }
    }
}

/// Inclusive rectangle of local grid-vertex indices `(x0, z0)..=(x1, z1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirtyRect {
    pub x0: usize,
    pub z0: usize,
    pub x1: usize,
    pub z1: usize,
}

impl DirtyRect {
    /// Rectangle covering a single vertex.
    pub fn point(x: usize, z: usize) -> Self {
        Self {
            x0: x,
            z0: z,
            x1: x,
            z1: z,
        }
    }

    /// Create a rectangle from inclusive bounds, sorting components.
    pub fn new(x0: usize, z0: usize, x1: usize, z1: usize) -> Self {
        Self {
            x0: x0.min(x1),
            z0: z0.min(z1),
            x1: x0.max(x1),
            z1: z0.max(z1),
        }
    }

    /// Grows the rectangle to include `(x, z)`.
    pub fn include(&mut self, x: usize, z: usize) {
        self.x0 = self.x0.min(x);
        self.z0 = self.z0.min(z);
        self.x1 = self.x1.max(x);
        self.z1 = self.z1.max(z);
    }

    /// Smallest rectangle enclosing both.
    pub fn union(&self, other: &DirtyRect) -> DirtyRect {
        DirtyRect {
            x0: self.x0.min(other.x0),
            z0: self.z0.min(other.z0),
            x1: self.x1.max(other.x1),
            z1: self.z1.max(other.z1),
        }
    }

    /// Expands by `pad` vertices on every side, clamped to `[0, max_index]`.
    pub fn expanded(&self, pad: usize, max_index: usize) -> DirtyRect {
        DirtyRect {
            x0: self.x0.saturating_sub(pad),
            z0: self.z0.saturating_sub(pad),
            x1: (self.x1 + pad).min(max_index),
            z1: (self.z1 + pad).min(max_index),
        }
    }

    /// Returns true if `(x, z)` lies inside the rectangle.
    pub fn contains(&self, x: usize, z: usize) -> bool {
        x >= self.x0 && x <= self.x1 && z >= self.z0 && z <= self.z1
    }

    /// Returns true if `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &DirtyRect) -> bool {
        self.contains(other.x0, other.z0) && self.contains(other.x1, other.z1)
    }

    /// Number of vertices covered.
    pub fn vertex_count(&self) -> usize {
        (self.x1 - self.x0 + 1) * (self.z1 - self.z0 + 1)
    }

    /// Iterates `(x, z)` over every covered vertex, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let DirtyRect { x0, z0, x1, z1 } = *self;
        (z0..=z1).flat_map(move |z| (x0..=x1).map(move |x| (x, z)))
    }
}

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from two corners, sorting components.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box enclosing a sphere.
    pub fn around_sphere(center: Vec3, radius: f32) -> Self {
        Self::new(center - Vec3::splat(radius), center + Vec3::splat(radius))
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if the boxes overlap or touch.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Projection onto the XZ plane.
    pub fn xz(&self) -> WorldRect {
        WorldRect::new(self.min.x, self.min.z, self.max.x, self.max.z)
    }
}
