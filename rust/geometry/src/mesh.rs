// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::bbox::Aabb3;
use nalgebra::{Point3, Vector3};

/// Triangle mesh, the payload of a tessellated (BRep fallback) representation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions
            .extend_from_slice(&[position.x, position.y, position.z]);
        self.normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Vertex position by index
    #[inline]
    pub fn vertex(&self, index: usize) -> Point3<f64> {
        Point3::new(
            self.positions[index * 3],
            self.positions[index * 3 + 1],
            self.positions[index * 3 + 2],
        )
    }

    /// Bounding box of all vertices
    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for chunk in self.positions.chunks_exact(3) {
            aabb.include_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
        }
        aabb
    }

    /// Total triangle area
    pub fn surface_area(&self) -> f64 {
        self.indices
            .chunks_exact(3)
            .map(|t| {
                let v0 = self.vertex(t[0] as usize);
                let v1 = self.vertex(t[1] as usize);
                let v2 = self.vertex(t[2] as usize);
                (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
            })
            .sum()
    }

    /// Enclosed volume by the divergence theorem; meaningful for closed, outward-facing meshes
    pub fn signed_volume(&self) -> f64 {
        self.indices
            .chunks_exact(3)
            .map(|t| {
                let v0 = self.vertex(t[0] as usize).coords;
                let v1 = self.vertex(t[1] as usize).coords;
                let v2 = self.vertex(t[2] as usize).coords;
                v0.dot(&v1.cross(&v2)) / 6.0
            })
            .sum()
    }
}
