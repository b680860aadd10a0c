// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Export Geometry
//!
//! Planar curves, boundary loops, 2D region booleans (i_overlay) and prism
//! solids with exact booleans, plus earcutr-based tessellation for the
//! boundary-representation fallback.

pub mod bbox;
pub mod bool2d;
pub mod curve;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod solid;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use bbox::Aabb3;
pub use curve::{Curve2D, CurveKind};
pub use error::{Error, Result};
pub use extrusion::tessellate_solid;
pub use mesh::Mesh;
pub use profile::{BoundaryLoop, Profile2D, Region2D};
pub use solid::{Slab, Solid};
