//! Greedy meshing of density chunks: merges coplanar faces with the same
//! orientation into the largest possible rectangles.

use glam::Vec3;
use strata_voxel::DensityChunk;

/// Principal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// What lies outside the chunk when deciding boundary faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshBoundary {
    /// Treat outside as solid: only surfaces exposed inside the chunk emit
    /// faces, including cavities that touch the border.
    #[default]
    Solid,
    /// Treat outside as empty: a solid chunk is closed at its border.
    Empty,
}

/// One merged rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelQuad {
    pub axis: Axis,
    /// Face normal points along `+axis`.
    pub positive: bool,
    /// Plane index in coarse cells along `axis`.
    pub plane: usize,
    pub width: usize,
    pub height: usize,
}

/// Output of [`greedy_mesh`]. Positions are in world space.
#[derive(Clone, Debug, Default)]
pub struct VoxelMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub quads: Vec<VoxelQuad>,
}

impl VoxelMesh {
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Quads facing `+axis` (`positive`) or `-axis`.
    pub fn count_quads(&self, axis: Axis, positive: bool) -> usize {
        self.quads
            .iter()
            .filter(|q| q.axis == axis && q.positive == positive)
            .count()
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, positive: bool) {
        let base = self.positions.len() as u32;
        for corner in corners {
            self.positions.push(corner.to_array());
            self.normals.push(normal.to_array());
        }
        // Corners run +u then +v, so u x v is +axis.
        if positive {
            self.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            self.indices
                .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
    }
}

/// Coarsened solidity view of a chunk.
struct Coarse<'a> {
    chunk: &'a DensityChunk,
    stride: usize,
    cells: usize,
    boundary: MeshBoundary,
}

impl Coarse<'_> {
    /// Solidity of coarse cell `c`, which may lie one step outside the chunk.
    fn solid(&self, c: [isize; 3]) -> bool {
        if c.iter().any(|&v| v < 0 || v >= self.cells as isize) {
            return self.boundary == MeshBoundary::Solid;
        }
        let last = self.chunk.size() - 1;
        let at = |v: isize| (v as usize * self.stride).min(last);
        self.chunk.is_solid(at(c[0]), at(c[1]), at(c[2]))
    }

    /// World coordinate of coarse plane `p` along `axis`.
    fn world(&self, axis: usize, p: usize) -> f32 {
        let voxel = (p * self.stride).min(self.chunk.size()) as f32;
        self.chunk.origin()[axis] + voxel * self.chunk.voxel_size()
    }
}

/// Greedy-mesh `chunk` at its LOD level. The sampling stride is
/// `lod_level + 1`, capped at 3.
pub fn greedy_mesh(chunk: &DensityChunk, boundary: MeshBoundary) -> VoxelMesh {
    let mut mesh = VoxelMesh::default();
    if chunk.size() == 0 {
        return mesh;
    }
    let stride = (chunk.lod_level() as usize).min(2) + 1;
    let cells = chunk.size().div_ceil(stride);
    let coarse = Coarse {
        chunk,
        stride,
        cells,
        boundary,
    };

    // +1 where the face points along +axis, -1 for -axis, 0 for no face.
    let mut mask = vec![0i8; cells * cells];

    for axis in Axis::ALL {
        let a = axis.index();
        let u_axis = (a + 1) % 3;
        let v_axis = (a + 2) % 3;

        for plane in 0..=cells {
            for v in 0..cells {
                for u in 0..cells {
                    let mut behind = [0isize; 3];
                    behind[a] = plane as isize - 1;
                    behind[u_axis] = u as isize;
                    behind[v_axis] = v as isize;
                    let mut ahead = behind;
                    ahead[a] = plane as isize;

                    let (b, f) = (coarse.solid(behind), coarse.solid(ahead));
                    mask[v * cells + u] = match (b, f) {
                        (true, false) => 1,
                        (false, true) => -1,
                        _ => 0,
                    };
                }
            }

            for v in 0..cells {
                let mut u = 0;
                while u < cells {
                    let sign = mask[v * cells + u];
                    if sign == 0 {
                        u += 1;
                        continue;
                    }

                    let mut w = 1;
                    while u + w < cells && mask[v * cells + u + w] == sign {
                        w += 1;
                    }

                    let mut h = 1;
                    'grow: while v + h < cells {
                        for du in 0..w {
                            if mask[(v + h) * cells + u + du] != sign {
                                break 'grow;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        mask[(v + dv) * cells + u..(v + dv) * cells + u + w].fill(0);
                    }

                    let depth = coarse.world(a, plane);
                    let (u0, u1) = (coarse.world(u_axis, u), coarse.world(u_axis, u + w));
                    let (v0, v1) = (coarse.world(v_axis, v), coarse.world(v_axis, v + h));
                    let corner = |cu: f32, cv: f32| {
                        let mut p = Vec3::ZERO;
                        p[a] = depth;
                        p[u_axis] = cu;
                        p[v_axis] = cv;
                        p
                    };
                    let positive = sign > 0;
                    let normal = if positive { axis.unit() } else { -axis.unit() };
                    mesh.push_quad(
                        [corner(u0, v0), corner(u1, v0), corner(u1, v1), corner(u0, v1)],
                        normal,
                        positive,
                    );
                    mesh.quads.push(VoxelQuad {
                        axis,
                        positive,
                        plane,
                        width: w,
                        height: h,
                    });

                    u += w;
                }
            }
        }
    }

    tracing::trace!(
        quads = mesh.quads.len(),
        stride,
        "Greedy meshed density chunk"
    );
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_except(size: usize, empty: impl Fn(usize, usize, usize) -> bool) -> DensityChunk {
        DensityChunk::from_fn(size, 1.0, Vec3::ZERO, |x, y, z| {
            if empty(x, y, z) { -1.0 } else { 1.0 }
        })
    }

    #[test]
    fn test_cavity_touching_boundary_is_six_quads() {
        let chunk = solid_except(16, |x, y, z| x < 4 && (4..8).contains(&y) && (4..8).contains(&z));
        let mesh = greedy_mesh(&chunk, MeshBoundary::Solid);
        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(mesh.triangle_count(), 12);
        for axis in Axis::ALL {
            assert_eq!(mesh.count_quads(axis, true), 1);
            assert_eq!(mesh.count_quads(axis, false), 1);
        }
        // The face on the chunk border at x = 0 points into the cavity.
        let border = mesh
            .quads
            .iter()
            .find(|q| q.axis == Axis::X && q.plane == 0)
            .unwrap();
        assert!(border.positive);
        assert_eq!((border.width, border.height), (4, 4));
    }

    #[test]
    fn test_solid_chunk_closed_with_empty_boundary() {
        let chunk = DensityChunk::filled(8, 0.5, Vec3::new(4.0, 0.0, 0.0), 1.0);
        let mesh = greedy_mesh(&chunk, MeshBoundary::Empty);
        assert_eq!(mesh.quad_count(), 6);
        assert!(mesh.quads.iter().all(|q| q.width == 8 && q.height == 8));
        for p in &mesh.positions {
            assert!((4.0..=8.0).contains(&p[0]));
            assert!((0.0..=4.0).contains(&p[1]) && (0.0..=4.0).contains(&p[2]));
        }
    }

    #[test]
    fn test_empty_chunk_inside_solid_boundary() {
        let chunk = DensityChunk::filled(8, 1.0, Vec3::ZERO, -1.0);
        let mesh = greedy_mesh(&chunk, MeshBoundary::Solid);
        assert_eq!(mesh.quad_count(), 6);
        assert!(greedy_mesh(&chunk, MeshBoundary::Empty).quads.is_empty());
    }

    #[test]
    fn test_single_voxel() {
        let chunk = solid_except(8, |x, y, z| (x, y, z) != (3, 3, 3));
        let mesh = greedy_mesh(&chunk, MeshBoundary::Empty);
        assert_eq!(mesh.quad_count(), 6);
        let top = mesh
            .quads
            .iter()
            .find(|q| q.axis == Axis::Y && q.positive)
            .unwrap();
        assert_eq!(top.plane, 4);
    }

    #[test]
    fn test_winding_matches_normal() {
        let chunk = solid_except(4, |x, y, z| (x, y, z) != (1, 1, 1));
        let mesh = greedy_mesh(&chunk, MeshBoundary::Empty);
        for tri in mesh.indices.chunks(3) {
            let p = |k: usize| Vec3::from_array(mesh.positions[tri[k] as usize]);
            let face = (p(1) - p(0)).cross(p(2) - p(0)).normalize();
            let normal = Vec3::from_array(mesh.normals[tri[0] as usize]);
            assert!(face.dot(normal) > 0.99);
        }
    }

    #[test]
    fn test_lod_reduces_quads() {
        // Staircase surface: column height 4, 5 or 6 depending on x.
        let mut chunk = DensityChunk::from_fn(12, 1.0, Vec3::ZERO, |x, y, _z| {
            if y < 4 + x % 3 { 1.0 } else { -1.0 }
        });
        let fine = greedy_mesh(&chunk, MeshBoundary::Solid).quad_count();
        chunk.set_lod_level(1);
        let coarse = greedy_mesh(&chunk, MeshBoundary::Solid);
        assert!(coarse.quad_count() < fine, "{} vs {fine}", coarse.quad_count());
        // Coarse quads still span the full chunk extent.
        let max_x = coarse.positions.iter().map(|p| p[0]).fold(0.0, f32::max);
        assert_eq!(max_x, 12.0);
    }
}
