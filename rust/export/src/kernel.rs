// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry provider seam
//!
//! The export pipeline never touches a modelling kernel directly. Every
//! boolean goes through [`GeometryKernel`], so a failure surfaces as a
//! `Result` at the call site that can decide what to fall back to.

use ifc_export_geometry::{tessellate_solid, Mesh, Region2D, Result, Solid};

/// Solid construction and booleans used by the export pipeline
pub trait GeometryKernel {
    /// Sweep a footprint region vertically between two elevations
    fn extrude(&self, footprint: &Region2D, z_min: f64, z_max: f64) -> Result<Solid>;

    /// `a - b`
    fn subtract(&self, a: &Solid, b: &Solid) -> Result<Solid>;

    /// `a ∩ b`
    fn intersect(&self, a: &Solid, b: &Solid) -> Result<Solid>;

    /// Triangle mesh of a solid
    fn tessellate(&self, solid: &Solid) -> Result<Mesh>;
}

/// Exact kernel for vertical prisms
#[derive(Debug, Clone, Copy, Default)]
pub struct PrismKernel;

impl GeometryKernel for PrismKernel {
    fn extrude(&self, footprint: &Region2D, z_min: f64, z_max: f64) -> Result<Solid> {
        Solid::extrude(footprint.clone(), z_min, z_max)
    }

    fn subtract(&self, a: &Solid, b: &Solid) -> Result<Solid> {
        a.subtract(b)
    }

    fn intersect(&self, a: &Solid, b: &Solid) -> Result<Solid> {
        a.intersect(b)
    }

    fn tessellate(&self, solid: &Solid) -> Result<Mesh> {
        tessellate_solid(solid)
    }
}
