//! Procedural geometry: a unit cube for fallback models and line sets
//! for the debug pass.

use glam::Vec3;

use crate::render::vertex::MeshVertex;
use crate::scene::Aabb;

#[inline]
fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> MeshVertex {
    MeshVertex { pos, normal, uv }
}

/// Unit cube centered at the origin, expanded triangle list (36
/// vertices), one full UV tile per face.
pub fn cube_vertices() -> Vec<MeshVertex> {
    let mut out = Vec::with_capacity(36);
    // (normal, face corners counterclockwise from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [
                [-0.5, -0.5, 0.5],
                [0.5, -0.5, 0.5],
                [0.5, 0.5, 0.5],
                [-0.5, 0.5, 0.5],
            ],
        ),
        (
            [0.0, 0.0, -1.0],
            [
                [0.5, -0.5, -0.5],
                [-0.5, -0.5, -0.5],
                [-0.5, 0.5, -0.5],
                [0.5, 0.5, -0.5],
            ],
        ),
        (
            [1.0, 0.0, 0.0],
            [
                [0.5, -0.5, 0.5],
                [0.5, -0.5, -0.5],
                [0.5, 0.5, -0.5],
                [0.5, 0.5, 0.5],
            ],
        ),
        (
            [-1.0, 0.0, 0.0],
            [
                [-0.5, -0.5, -0.5],
                [-0.5, -0.5, 0.5],
                [-0.5, 0.5, 0.5],
                [-0.5, 0.5, -0.5],
            ],
        ),
        (
            [0.0, 1.0, 0.0],
            [
                [-0.5, 0.5, 0.5],
                [0.5, 0.5, 0.5],
                [0.5, 0.5, -0.5],
                [-0.5, 0.5, -0.5],
            ],
        ),
        (
            [0.0, -1.0, 0.0],
            [
                [-0.5, -0.5, -0.5],
                [0.5, -0.5, -0.5],
                [0.5, -0.5, 0.5],
                [-0.5, -0.5, 0.5],
            ],
        ),
    ];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    for (normal, corners) in faces {
        for i in [0usize, 1, 2, 0, 2, 3] {
            out.push(v(corners[i], normal, uvs[i]));
        }
    }
    out
}

/// Three great circles (XY, XZ, YZ planes) as a line list.
pub fn wire_sphere_lines(radius: f32, segments: u32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(segments as usize * 6);
    let step = std::f32::consts::TAU / segments as f32;
    for i in 0..segments {
        let (a, b) = (i as f32 * step, (i + 1) as f32 * step);
        let (sa, ca) = a.sin_cos();
        let (sb, cb) = b.sin_cos();
        out.push(Vec3::new(ca, sa, 0.0) * radius);
        out.push(Vec3::new(cb, sb, 0.0) * radius);
        out.push(Vec3::new(ca, 0.0, sa) * radius);
        out.push(Vec3::new(cb, 0.0, sb) * radius);
        out.push(Vec3::new(0.0, ca, sa) * radius);
        out.push(Vec3::new(0.0, cb, sb) * radius);
    }
    out
}

/// The 12 edges of a box as a 24-entry line list.
pub fn box_edge_lines(aabb: &Aabb) -> [Vec3; 24] {
    let c = aabb.corners();
    // Corner indexing from Aabb::corners: bit 0 = x, bit 1 = y, bit 2 = z.
    let edges: [(usize, usize); 12] = [
        (0, 1),
        (2, 3),
        (4, 5),
        (6, 7),
        (0, 2),
        (1, 3),
        (4, 6),
        (5, 7),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
    let mut out = [Vec3::ZERO; 24];
    for (i, (a, b)) in edges.into_iter().enumerate() {
        out[i * 2] = c[a];
        out[i * 2 + 1] = c[b];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_36_vertices_within_unit_extents() {
        let verts = cube_vertices();
        assert_eq!(verts.len(), 36);
        for vert in &verts {
            for c in vert.pos {
                assert!(c.abs() <= 0.5);
            }
        }
    }

    #[test]
    fn cube_normals_are_axis_aligned_unit_vectors() {
        for vert in cube_vertices() {
            let n = Vec3::from_array(vert.normal);
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert_eq!(n.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn wire_sphere_points_lie_on_the_sphere() {
        for p in wire_sphere_lines(2.5, 16) {
            assert!((p.length() - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn box_edges_have_unit_axis_spans() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let lines = box_edge_lines(&aabb);
        assert_eq!(lines.len(), 24);
        for pair in lines.chunks(2) {
            let d = pair[1] - pair[0];
            // Each edge runs along exactly one axis.
            let nonzero = [d.x, d.y, d.z].iter().filter(|c| c.abs() > 1e-6).count();
            assert_eq!(nonzero, 1);
        }
    }
}
