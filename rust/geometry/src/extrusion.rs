// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation of prism solids into triangle meshes

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::profile::{Profile2D, Triangulation};
use crate::solid::{Solid, MIN_HEIGHT};
use nalgebra::{Point2, Point3, Vector3};

/// Tessellate every slab of a solid: bottom cap, top cap and side walls
///
/// Internal caps between stacked slabs are emitted as well; consumers that
/// need a watertight shell get one per slab.
pub fn tessellate_solid(solid: &Solid) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    for slab in solid.slabs() {
        if slab.height() <= MIN_HEIGHT {
            continue;
        }
        for profile in &slab.region.profiles {
            extrude_profile_into(profile, slab.z_min, slab.z_max, &mut mesh)?;
        }
    }
    if mesh.is_empty() {
        return Err(Error::EmptyMesh("solid has no tessellatable slabs".to_string()));
    }
    Ok(mesh)
}

/// Extrude one profile between two heights, appending to `mesh`
pub fn extrude_profile_into(
    profile: &Profile2D,
    z_start: f64,
    z_end: f64,
    mesh: &mut Mesh,
) -> Result<()> {
    if z_end - z_start <= MIN_HEIGHT {
        return Err(Error::InvalidExtrusion(
            "Depth must be positive".to_string(),
        ));
    }

    let triangulation = profile.triangulate()?;
    create_cap_mesh(&triangulation, z_start, -Vector3::z(), mesh);
    create_cap_mesh(&triangulation, z_end, Vector3::z(), mesh);

    create_side_walls(&profile.outer, z_start, z_end, mesh);
    for hole in &profile.holes {
        create_side_walls(hole, z_start, z_end, mesh);
    }
    Ok(())
}

/// Create a cap mesh (top or bottom) from triangulation
fn create_cap_mesh(triangulation: &Triangulation, z: f64, normal: Vector3<f64>, mesh: &mut Mesh) {
    let base_index = mesh.vertex_count() as u32;

    for point in &triangulation.points {
        mesh.add_vertex(Point3::new(point.x, point.y, z), normal);
    }

    for tri in triangulation.indices.chunks_exact(3) {
        let i0 = base_index + tri[0] as u32;
        let i1 = base_index + tri[1] as u32;
        let i2 = base_index + tri[2] as u32;

        // Bottom caps face down: flip winding
        if normal.z < 0.0 {
            mesh.add_triangle(i0, i2, i1);
        } else {
            mesh.add_triangle(i0, i1, i2);
        }
    }
}

/// Create side walls for a boundary between two heights
///
/// Outer boundaries are counter-clockwise and holes clockwise, so the
/// right-hand edge normal points out of the material in both cases.
fn create_side_walls(boundary: &[Point2<f64>], z_start: f64, z_end: f64, mesh: &mut Mesh) {
    for i in 0..boundary.len() {
        let j = (i + 1) % boundary.len();

        let p0 = &boundary[i];
        let p1 = &boundary[j];

        let edge = Vector3::new(p1.x - p0.x, p1.y - p0.y, 0.0);
        let normal = match Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-10) {
            Some(n) => n,
            None => continue, // duplicate consecutive points
        };

        let idx = mesh.vertex_count() as u32;
        mesh.add_vertex(Point3::new(p0.x, p0.y, z_start), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, z_start), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, z_end), normal);
        mesh.add_vertex(Point3::new(p0.x, p0.y, z_end), normal);

        mesh.add_triangle(idx, idx + 1, idx + 2);
        mesh.add_triangle(idx, idx + 2, idx + 3);
    }
}
