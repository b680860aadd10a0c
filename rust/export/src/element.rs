// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host element model consumed by the export engine
//!
//! Elements are immutable for the duration of an export pass. Every stage
//! reads them and returns new values.

use crate::layers::{LayerDefinition, LayerFace};
use ifc_export_geometry::{Aabb3, BoundaryLoop, Curve2D, Mesh, Point2, Solid, Vector2};
use std::fmt;

/// Opaque host element id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Building level (story) id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(pub u64);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Material id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

/// Half-open elevation interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalRange {
    pub start: f64,
    pub end: f64,
}

impl VerticalRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn contains(&self, z: f64) -> bool {
        z >= self.start && z < self.end
    }

    /// Overlapping part, if it has positive length
    pub fn intersection(&self, other: &VerticalRange) -> Option<VerticalRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end > start).then_some(VerticalRange { start, end })
    }

    /// Smallest range covering both
    pub fn hull(&self, other: &VerticalRange) -> VerticalRange {
        VerticalRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Z extent of a bounding box, `None` when the box is empty
    pub fn of_bounds(bounds: &Aabb3) -> Option<VerticalRange> {
        (!bounds.is_empty()).then(|| VerticalRange::new(bounds.min.z, bounds.max.z))
    }
}

/// Shape of a wall's vertical cross-section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossSection {
    #[default]
    Vertical,
    Slanted,
    Tapered,
}

/// Wall-specific data: location line, thickness and join context
#[derive(Debug, Clone, PartialEq)]
pub struct WallGeometry {
    /// Location line at the wall centre
    pub axis: Curve2D,
    pub width: f64,
    pub cross_section: CrossSection,
    /// Joined end-to-end with other walls
    pub in_connected_chain: bool,
}

impl WallGeometry {
    pub fn new(axis: Curve2D, width: f64) -> Self {
        Self {
            axis,
            width,
            cross_section: CrossSection::Vertical,
            in_connected_chain: false,
        }
    }

    /// Un-notched footprint: the axis offset by half the width to each side
    ///
    /// Only lines and circular arcs have an exact offset.
    pub fn base_loop(&self) -> Option<BoundaryLoop> {
        band_loop(&self.axis, self.width * 0.5)
    }

    /// Base footprint with `allowance` trimmed off both ends of the axis
    pub fn trimmed_base_loop(&self, allowance: f64) -> Option<BoundaryLoop> {
        let trimmed = trim_curve(&self.axis, allowance)?;
        band_loop(&trimmed, self.width * 0.5)
    }
}

fn band_loop(axis: &Curve2D, half: f64) -> Option<BoundaryLoop> {
    if half <= 0.0 {
        return None;
    }
    match *axis {
        Curve2D::Line { start, end } => {
            let dir = (end - start).try_normalize(1e-12)?;
            let n = Vector2::new(-dir.y, dir.x) * half;
            Some(BoundaryLoop::from_points(&[
                start - n,
                end - n,
                end + n,
                start + n,
            ]))
        }
        Curve2D::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => {
            let inner = radius - half;
            let outer = radius + half;
            if inner <= 0.0 {
                return None;
            }
            let at = |r: f64, a: f64| Point2::new(center.x + r * a.cos(), center.y + r * a.sin());
            Some(BoundaryLoop::new(vec![
                Curve2D::line(at(inner, start_angle), at(outer, start_angle)),
                Curve2D::arc(center, outer, start_angle, end_angle),
                Curve2D::line(at(outer, end_angle), at(inner, end_angle)),
                Curve2D::arc(center, inner, end_angle, start_angle),
            ]))
        }
        _ => None,
    }
}

fn trim_curve(axis: &Curve2D, amount: f64) -> Option<Curve2D> {
    if axis.length() <= 2.0 * amount {
        return None;
    }
    match *axis {
        Curve2D::Line { start, end } => {
            let dir = (end - start).try_normalize(1e-12)?;
            Some(Curve2D::line(start + dir * amount, end - dir * amount))
        }
        Curve2D::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => {
            let delta = (amount / radius).copysign(end_angle - start_angle);
            Some(Curve2D::arc(
                center,
                radius,
                start_angle + delta,
                end_angle - delta,
            ))
        }
        _ => None,
    }
}

/// Floor and roof data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabGeometry {
    pub thickness: f64,
}

/// Closed set of host categories
#[derive(Debug, Clone, PartialEq)]
pub enum HostElementKind {
    Wall(WallGeometry),
    Floor(SlabGeometry),
    Roof(SlabGeometry),
    Stair,
    CurtainSystem,
    Part { host: ElementId },
}

impl HostElementKind {
    pub fn category(&self) -> &'static str {
        match self {
            HostElementKind::Wall(_) => "wall",
            HostElementKind::Floor(_) => "floor",
            HostElementKind::Roof(_) => "roof",
            HostElementKind::Stair => "stair",
            HostElementKind::CurtainSystem => "curtain system",
            HostElementKind::Part { .. } => "part",
        }
    }

    /// Thickness the material layers must add up to
    pub fn layered_thickness(&self) -> Option<f64> {
        match self {
            HostElementKind::Wall(wall) => Some(wall.width),
            HostElementKind::Floor(slab) | HostElementKind::Roof(slab) => Some(slab.thickness),
            _ => None,
        }
    }
}

/// A known opening (door, window, shaft) hosted by the element
#[derive(Debug, Clone, PartialEq)]
pub struct Opening {
    pub id: ElementId,
    pub footprint: BoundaryLoop,
    pub range: VerticalRange,
}

/// How a neighbor affects the host's extrusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborRelation {
    /// Wall-to-wall join; always subtracted
    Connected,
    /// Found by an intersection test; subtracted where it overlaps
    Overlapping,
    /// Joined floor clipping the host
    FloorClip,
}

/// Solid of a neighboring element, in the host's frame
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: ElementId,
    pub relation: NeighborRelation,
    pub solid: Solid,
}

impl Neighbor {
    pub fn new(id: ElementId, relation: NeighborRelation, solid: Solid) -> Self {
        Self { id, relation, solid }
    }
}

/// Host element: id, geometry and category
#[derive(Debug, Clone, PartialEq)]
pub struct HostElement {
    pub id: ElementId,
    /// Persistent id used to derive GUIDs
    pub unique_id: String,
    pub kind: HostElementKind,
    pub solids: Vec<Solid>,
    pub meshes: Vec<Mesh>,
    pub openings: Vec<Opening>,
    pub layers: Vec<LayerDefinition>,
    /// Geometric layer faces found on the element, if any
    pub layer_faces: Vec<LayerFace>,
    pub level: Option<LevelId>,
}

impl HostElement {
    pub fn new(id: ElementId, unique_id: impl Into<String>, kind: HostElementKind) -> Self {
        Self {
            id,
            unique_id: unique_id.into(),
            kind,
            solids: Vec::new(),
            meshes: Vec::new(),
            openings: Vec::new(),
            layers: Vec::new(),
            layer_faces: Vec::new(),
            level: None,
        }
    }

    pub fn with_solid(mut self, solid: Solid) -> Self {
        self.solids.push(solid);
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_opening(mut self, opening: Opening) -> Self {
        self.openings.push(opening);
        self
    }

    pub fn with_layers(mut self, layers: Vec<LayerDefinition>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_layer_faces(mut self, faces: Vec<LayerFace>) -> Self {
        self.layer_faces = faces;
        self
    }

    pub fn with_level(mut self, level: LevelId) -> Self {
        self.level = Some(level);
        self
    }

    pub fn has_geometry(&self) -> bool {
        self.solids.iter().any(|s| !s.is_empty()) || self.meshes.iter().any(|m| !m.is_empty())
    }

    /// Bounds of all solids and meshes
    pub fn bounds(&self) -> Aabb3 {
        let solids = self.solids.iter().map(Solid::bounds);
        let meshes = self.meshes.iter().map(Mesh::bounds);
        solids
            .chain(meshes)
            .fold(Aabb3::empty(), |acc, b| acc.merged(&b))
    }

    pub fn span(&self) -> Option<VerticalRange> {
        VerticalRange::of_bounds(&self.bounds())
    }

    pub fn wall(&self) -> Option<&WallGeometry> {
        match &self.kind {
            HostElementKind::Wall(wall) => Some(wall),
            _ => None,
        }
    }
}
