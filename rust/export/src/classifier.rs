// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion-vs-BRep classification
//!
//! Decides whether an element's geometry can be written as a vertical
//! extrusion of a footprint, and if so builds the [`ExtrusionCandidate`].
//! The result is all or nothing: either a complete candidate or a reason
//! to fall back to a boundary representation.

use crate::config::ExportConfig;
use crate::element::{CrossSection, ElementId, HostElement, HostElementKind, WallGeometry};
use ifc_export_geometry::bool2d::{convex_hull, difference, region_from_contours, union};
use ifc_export_geometry::{Aabb3, BoundaryLoop, CurveKind, Region2D, Solid, Vector3};

/// Sagitta used when comparing footprints against their reference shape
const COMPARISON_CHORD_FACTOR: f64 = 0.01;

/// Why an element cannot be extruded
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error("element has no geometry")]
    NoGeometry,
    #[error("element geometry includes non-solid meshes")]
    NonSolidGeometry,
    #[error("geometry splits into {0} disjoint fragments")]
    MultipleFragments(usize),
    #[error("{0} elements are not extruded")]
    UnsupportedCategory(&'static str),
    #[error("{} axis is not permitted for the target schema", .0.as_str())]
    UnsupportedAxisCurve(CurveKind),
    #[error("axis has zero length")]
    ZeroLengthAxis,
    #[error("wall width must be positive")]
    InvalidWidth,
    #[error("connected wall has a non-vertical cross-section")]
    NonVerticalChain,
    #[error("extrusion direction has zero length")]
    ZeroLengthDirection,
    #[error("extrusion direction is not vertical")]
    DirectionNotVertical,
    #[error("extrusion depth is zero")]
    ZeroDepth,
    #[error("invalid footprint: {0}")]
    InvalidFootprint(String),
    #[error("footprint has concavities not explained by openings")]
    FootprintNotConvex,
    #[error("geometry kernel failed: {0}")]
    Geometry(String),
    #[error("opening touches floor clip of {0}")]
    OpeningNearFloorClip(ElementId),
    #[error("entity writer rejected the representation")]
    WriterRejected,
}

/// Speculative extrusion of an element
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionCandidate {
    /// Counter-clockwise loops, outer boundary first
    pub footprint: Vec<BoundaryLoop>,
    /// Unit extrusion direction
    pub direction: Vector3<f64>,
    pub depth: f64,
    pub base_elevation: f64,
    /// Footprint before expansion to the un-notched base shape
    pub original_footprint: Option<Vec<BoundaryLoop>>,
}

impl ExtrusionCandidate {
    /// Footprint was replaced by the raw base shape
    pub fn is_expanded(&self) -> bool {
        self.original_footprint.is_some()
    }

    /// The candidate with its original footprint restored
    pub fn without_expansion(self) -> ExtrusionCandidate {
        match self.original_footprint {
            Some(original) => ExtrusionCandidate {
                footprint: original,
                original_footprint: None,
                ..self
            },
            None => self,
        }
    }

    pub fn footprint_region(&self, chord_tolerance: f64) -> Region2D {
        Region2D::from_loops(&self.footprint, chord_tolerance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Extrude(ExtrusionCandidate),
    Brep(FallbackReason),
}

impl Classification {
    pub fn can_extrude(&self) -> bool {
        matches!(self, Classification::Extrude(_))
    }
}

pub struct GeometryClassifier<'a> {
    config: &'a ExportConfig,
}

impl<'a> GeometryClassifier<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Classify one element for extrusion along `direction`
    pub fn classify(
        &self,
        element: &HostElement,
        footprint: &[BoundaryLoop],
        direction: Vector3<f64>,
    ) -> Classification {
        match self.try_classify(element, footprint, direction) {
            Ok(candidate) => {
                tracing::debug!(
                    element = %element.id,
                    expanded = candidate.is_expanded(),
                    "element can be extruded"
                );
                Classification::Extrude(candidate)
            }
            Err(reason) => {
                tracing::debug!(element = %element.id, reason = %reason, "element needs a BRep");
                Classification::Brep(reason)
            }
        }
    }

    fn try_classify(
        &self,
        element: &HostElement,
        footprint: &[BoundaryLoop],
        direction: Vector3<f64>,
    ) -> Result<ExtrusionCandidate, FallbackReason> {
        if !element.has_geometry() {
            return Err(FallbackReason::NoGeometry);
        }
        if element.meshes.iter().any(|m| !m.is_empty()) {
            return Err(FallbackReason::NonSolidGeometry);
        }
        let merged = element
            .solids
            .iter()
            .try_fold(Solid::empty(), |acc, solid| acc.union(solid))
            .map_err(|e| FallbackReason::Geometry(e.to_string()))?;
        let fragments = merged.component_count();
        if fragments > 1 {
            return Err(FallbackReason::MultipleFragments(fragments));
        }

        match &element.kind {
            HostElementKind::Wall(wall) => self.check_wall(wall)?,
            HostElementKind::Stair | HostElementKind::CurtainSystem => {
                return Err(FallbackReason::UnsupportedCategory(element.kind.category()))
            }
            HostElementKind::Floor(_) | HostElementKind::Roof(_) | HostElementKind::Part { .. } => {}
        }

        let direction = direction
            .try_normalize(1e-12)
            .ok_or(FallbackReason::ZeroLengthDirection)?;
        if (direction - Vector3::z()).norm() > self.config.tolerance {
            return Err(FallbackReason::DirectionNotVertical);
        }

        let bounds = element
            .solids
            .iter()
            .map(Solid::bounds)
            .fold(Aabb3::empty(), |acc, b| acc.merged(&b));
        let depth = bounds.height();
        if bounds.is_empty() || depth <= self.config.tolerance {
            return Err(FallbackReason::ZeroDepth);
        }

        let loops = self.normalize_loops(footprint)?;
        let region = Region2D::from_loops(&loops, self.comparison_tolerance());
        self.check_concavities(element, &loops, &region)?;

        let mut candidate = ExtrusionCandidate {
            footprint: loops,
            direction,
            depth,
            base_elevation: bounds.min.z,
            original_footprint: None,
        };

        if let Some(wall) = element.wall() {
            if let Some(base) = self.expansion_for(wall, region.area()) {
                tracing::debug!(
                    element = %element.id,
                    area = region.area(),
                    "footprint smaller than expected, expanding to base shape"
                );
                let original = std::mem::replace(&mut candidate.footprint, vec![base]);
                candidate.original_footprint = Some(original);
            }
        }

        Ok(candidate)
    }

    fn check_wall(&self, wall: &WallGeometry) -> Result<(), FallbackReason> {
        let kind = wall.axis.kind();
        if !self.config.schema.permits_axis_curve(kind) {
            return Err(FallbackReason::UnsupportedAxisCurve(kind));
        }
        if wall.axis.length() <= self.config.tolerance {
            return Err(FallbackReason::ZeroLengthAxis);
        }
        if wall.width <= self.config.tolerance {
            return Err(FallbackReason::InvalidWidth);
        }
        if wall.in_connected_chain && wall.cross_section != CrossSection::Vertical {
            return Err(FallbackReason::NonVerticalChain);
        }
        Ok(())
    }

    /// Validate every loop, make it counter-clockwise and put the largest first
    fn normalize_loops(&self, footprint: &[BoundaryLoop]) -> Result<Vec<BoundaryLoop>, FallbackReason> {
        if footprint.is_empty() {
            return Err(FallbackReason::InvalidFootprint("no boundary loops".to_string()));
        }
        let chord = self.config.arc_tolerance;
        let mut loops = footprint
            .iter()
            .map(|l| {
                l.validate(self.config.tolerance, chord)
                    .map(|_| l.clone().normalized(chord))
                    .map_err(|e| FallbackReason::InvalidFootprint(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        loops.sort_by(|a, b| {
            b.signed_area(chord)
                .partial_cmp(&a.signed_area(chord))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(loops)
    }

    /// Every concave part of the footprint must be covered by a known opening
    ///
    /// Walls are compared with their base band minus the join allowance at
    /// each end; everything else with its convex hull.
    fn check_concavities(
        &self,
        element: &HostElement,
        loops: &[BoundaryLoop],
        region: &Region2D,
    ) -> Result<(), FallbackReason> {
        let chord = self.comparison_tolerance();
        let reference = element
            .wall()
            .and_then(|wall| wall.trimmed_base_loop(self.config.side_allowance_widths * wall.width))
            .map(|band| Region2D::from_loops(&[band], chord))
            .unwrap_or_else(|| {
                let points: Vec<_> = loops.iter().flat_map(|l| l.to_polygon(chord)).collect();
                region_from_contours(&[convex_hull(&points)])
            });

        let openings = element
            .openings
            .iter()
            .map(|o| Region2D::from_loops(std::slice::from_ref(&o.footprint), chord))
            .fold(Region2D::empty(), |acc, r| union(&acc, &r));

        let unexplained = difference(&difference(&reference, region), &openings);
        if unexplained.area() > self.config.concavity_ratio * reference.area() {
            return Err(FallbackReason::FootprintNotConvex);
        }
        Ok(())
    }

    /// Base shape to use instead of a footprint that is too small
    fn expansion_for(&self, wall: &WallGeometry, area: f64) -> Option<BoundaryLoop> {
        let allowance = 2.0 * self.config.side_allowance_widths * wall.width;
        let estimate = wall.width * (wall.axis.length() - allowance);
        if estimate <= 0.0 || area >= self.config.area_ratio_threshold * estimate {
            return None;
        }
        wall.base_loop()
            .map(|base| base.normalized(self.config.arc_tolerance))
    }

    fn comparison_tolerance(&self) -> f64 {
        self.config.arc_tolerance * COMPARISON_CHORD_FACTOR
    }
}
