//! Base tube geometry and its cached per-vertex parametrization.
//!
//! The template is built once; every segment shares its `(alpha, v, r)`
//! parametrization read-only and owns only a positions/normals buffer.
//! Per-frame placement re-evaluates positions from the parametrization, so
//! topology and local coordinates are never re-derived.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::f32::consts::TAU;

use crate::params::LatticeParams;

/// Vertex data for segment meshes (position + normal + UV)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Shared base tube: an open thin-walled cylinder tessellated into
/// `radial_segs x height_segs` quads, stored as parametrization rather
/// than positions.
pub struct TubeTemplate {
    /// Angle around the cross-section per vertex (radians)
    pub alpha: Vec<f32>,

    /// Height fraction along the segment per vertex (0..1)
    pub v: Vec<f32>,

    /// Cross-section radius per vertex (meters); uniform for a cylinder but
    /// cached per vertex so tapered profiles stay a data change
    pub r: Vec<f32>,

    /// Texture coordinates per vertex
    pub uv: Vec<[f32; 2]>,

    /// Triangle indices (counter-clockwise winding), shared by all segments
    pub indices: Vec<u32>,
}

impl TubeTemplate {
    pub fn new(params: &LatticeParams) -> Self {
        let radial = params.radial_segs;
        let height = params.height_segs;
        let count = (radial + 1) * (height + 1);

        let mut alpha = Vec::with_capacity(count);
        let mut v = Vec::with_capacity(count);
        let mut r = Vec::with_capacity(count);
        let mut uv = Vec::with_capacity(count);

        // Rings bottom to top; the seam vertex is duplicated (i == radial)
        for ring in 0..=height {
            let vf = ring as f32 / height as f32;
            for i in 0..=radial {
                let a = (i % radial) as f32 / radial as f32 * TAU;
                alpha.push(a);
                v.push(vf);
                r.push(params.seg_radius_m);
                uv.push([i as f32 / radial as f32, vf]);
            }
        }

        let mut indices = Vec::with_capacity(radial * height * 6);
        let stride = (radial + 1) as u32;
        for ring in 0..height as u32 {
            for i in 0..radial as u32 {
                let bottom_left = ring * stride + i;
                let bottom_right = bottom_left + 1;
                let top_left = bottom_left + stride;
                let top_right = top_left + 1;

                indices.extend_from_slice(&[
                    bottom_left,
                    top_left,
                    bottom_right,
                    bottom_right,
                    top_left,
                    top_right,
                ]);
            }
        }

        Self {
            alpha,
            v,
            r,
            uv,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.alpha.len()
    }

    /// A fresh vertex buffer for one segment, positions zeroed (the first
    /// placement pass fills them).
    pub fn make_vertices(&self) -> Vec<Vertex> {
        self.uv
            .iter()
            .map(|&uv| Vertex {
                position: [0.0; 3],
                normal: [0.0, 1.0, 0.0],
                uv,
            })
            .collect()
    }
}

/// Recompute vertex normals by accumulating face normals (flat-shading
/// consistency after each placement pass).
pub fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    for vertex in vertices.iter_mut() {
        vertex.normal = [0.0; 3];
    }

    for tri in indices.chunks_exact(3) {
        let a = Vec3::from_array(vertices[tri[0] as usize].position);
        let b = Vec3::from_array(vertices[tri[1] as usize].position);
        let c = Vec3::from_array(vertices[tri[2] as usize].position);
        let face = (b - a).cross(c - a);

        for &i in tri {
            let n = Vec3::from_array(vertices[i as usize].normal) + face;
            vertices[i as usize].normal = n.to_array();
        }
    }

    for vertex in vertices.iter_mut() {
        let n = Vec3::from_array(vertex.normal);
        vertex.normal = n.normalize_or_zero().to_array();
    }
}
