// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clipping and opening resolution for extrusion candidates
//!
//! The candidate footprint is extruded, neighbors are subtracted, and
//! whatever the extrusion still covers that the real host geometry does
//! not becomes the element's openings.

use crate::classifier::{ExtrusionCandidate, FallbackReason};
use crate::config::ExportConfig;
use crate::element::{ElementId, HostElement, Neighbor, NeighborRelation, VerticalRange};
use crate::kernel::GeometryKernel;
use ifc_export_geometry::bool2d::dilate;
use ifc_export_geometry::Solid;

/// Clipped extrusion ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingResult {
    /// Extrusion of the candidate footprint, sliced to the requested range
    pub base_solid: Solid,
    /// Base solid after neighbor subtraction
    pub clipped_solid: Solid,
    /// Openings to void from the clipped solid
    pub subtracted_openings: Vec<Solid>,
    pub is_completely_clipped: bool,
    /// Neighbors whose boolean failed and were left out
    pub skipped_neighbors: Vec<ElementId>,
}

impl ClippingResult {
    fn completely_clipped(base_solid: Solid) -> Self {
        Self {
            base_solid,
            clipped_solid: Solid::empty(),
            subtracted_openings: Vec::new(),
            is_completely_clipped: true,
            skipped_neighbors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(ClippingResult),
    /// The expanded footprint found no openings; retry with the original
    RollBack,
    AbandonToBrep(FallbackReason),
}

pub struct ClippingResolver<'a, K: GeometryKernel + ?Sized> {
    kernel: &'a K,
    config: &'a ExportConfig,
}

impl<'a, K: GeometryKernel + ?Sized> ClippingResolver<'a, K> {
    pub fn new(kernel: &'a K, config: &'a ExportConfig) -> Self {
        Self { kernel, config }
    }

    /// Clip `candidate` against `neighbors`, optionally limited to `range`
    ///
    /// Returns an error only when the base extrusion itself cannot be built.
    pub fn resolve(
        &self,
        element: &HostElement,
        candidate: &ExtrusionCandidate,
        neighbors: &[Neighbor],
        range: Option<VerticalRange>,
    ) -> ifc_export_geometry::Result<ResolveOutcome> {
        let region = candidate.footprint_region(self.config.arc_tolerance);
        let top = candidate.base_elevation + candidate.depth;
        let mut base = self.kernel.extrude(&region, candidate.base_elevation, top)?;
        if let Some(range) = range {
            base = base.slice(range.start, range.end);
        }
        if base.is_empty() {
            tracing::debug!(element = %element.id, "range misses the element geometry");
            return Ok(ResolveOutcome::Resolved(ClippingResult::completely_clipped(base)));
        }

        let mut clipped = base.clone();
        let mut skipped = Vec::new();
        for neighbor in neighbors {
            match self.clip_neighbor(&clipped, neighbor) {
                Ok(Some(next)) => clipped = next,
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        element = %element.id,
                        neighbor = %neighbor.id,
                        error = %error,
                        "boolean with neighbor failed, leaving it out"
                    );
                    skipped.push(neighbor.id);
                }
            }
        }

        if clipped.is_empty() || clipped.face_count() == 0 {
            tracing::debug!(element = %element.id, "neighbors clip the whole element");
            return Ok(ResolveOutcome::Resolved(ClippingResult::completely_clipped(base)));
        }

        let openings = match self.detect_openings(element, &clipped, range) {
            Ok(openings) => openings,
            Err(error) => {
                return Ok(ResolveOutcome::AbandonToBrep(FallbackReason::Geometry(
                    error.to_string(),
                )))
            }
        };

        if candidate.is_expanded() && openings.is_empty() {
            tracing::debug!(element = %element.id, "expanded footprint found no openings");
            return Ok(ResolveOutcome::RollBack);
        }

        if let Some(floor) = self.opening_near_floor_clip(&openings, neighbors) {
            tracing::debug!(
                element = %element.id,
                floor = %floor,
                "opening touches a floor clip, abandoning extrusion"
            );
            return Ok(ResolveOutcome::AbandonToBrep(FallbackReason::OpeningNearFloorClip(floor)));
        }

        Ok(ResolveOutcome::Resolved(ClippingResult {
            base_solid: base,
            clipped_solid: clipped,
            subtracted_openings: openings,
            is_completely_clipped: false,
            skipped_neighbors: skipped,
        }))
    }

    /// New solid after removing one neighbor, `None` when it does not touch
    fn clip_neighbor(
        &self,
        solid: &Solid,
        neighbor: &Neighbor,
    ) -> ifc_export_geometry::Result<Option<Solid>> {
        match neighbor.relation {
            NeighborRelation::Connected => self.kernel.subtract(solid, &neighbor.solid).map(Some),
            NeighborRelation::Overlapping | NeighborRelation::FloorClip => {
                if !solid.bounds().overlaps(&neighbor.solid.bounds()) {
                    return Ok(None);
                }
                let overlap = self.kernel.intersect(solid, &neighbor.solid)?;
                if overlap.is_empty() {
                    return Ok(None);
                }
                self.kernel.subtract(solid, &overlap).map(Some)
            }
        }
    }

    /// Connected pieces of the clipped extrusion that the host does not fill
    fn detect_openings(
        &self,
        element: &HostElement,
        clipped: &Solid,
        range: Option<VerticalRange>,
    ) -> ifc_export_geometry::Result<Vec<Solid>> {
        let mut remainder = clipped.clone();
        for solid in &element.solids {
            let host = match range {
                Some(range) => solid.slice(range.start, range.end),
                None => solid.clone(),
            };
            if host.is_empty() {
                continue;
            }
            remainder = self.kernel.subtract(&remainder, &host)?;
        }
        let min_volume = self.config.tolerance.powi(2);
        Ok(remainder
            .components()
            .into_iter()
            .filter(|c| c.volume() > min_volume)
            .collect())
    }

    /// First floor whose clip solid touches one of the openings
    fn opening_near_floor_clip(&self, openings: &[Solid], neighbors: &[Neighbor]) -> Option<ElementId> {
        let proximity = self.config.floor_clip_proximity;
        let floors: Vec<&Neighbor> = neighbors
            .iter()
            .filter(|n| n.relation == NeighborRelation::FloorClip)
            .collect();
        for opening in openings {
            let grown = opening.bounds().expanded(proximity);
            for floor in &floors {
                if !grown.overlaps(&floor.solid.bounds()) {
                    continue;
                }
                match self.touches(opening, &floor.solid, proximity) {
                    Ok(true) => return Some(floor.id),
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(floor = %floor.id, error = %error, "floor clip test failed");
                    }
                }
            }
        }
        None
    }

    /// `solid` comes within `proximity` of `other`, testing each slab grown by that distance
    fn touches(
        &self,
        solid: &Solid,
        other: &Solid,
        proximity: f64,
    ) -> ifc_export_geometry::Result<bool> {
        if proximity <= 0.0 {
            return Ok(!self.kernel.intersect(solid, other)?.is_empty());
        }
        for slab in solid.slabs() {
            let grown = self.kernel.extrude(
                &dilate(&slab.region, proximity),
                slab.z_min - proximity,
                slab.z_max + proximity,
            )?;
            if !grown.bounds().overlaps(&other.bounds()) {
                continue;
            }
            if !self.kernel.intersect(&grown, other)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{HostElementKind, WallGeometry};
    use crate::kernel::PrismKernel;
    use approx::assert_relative_eq;
    use ifc_export_geometry::{BoundaryLoop, Curve2D, Point2, Region2D, Slab, Vector3};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    fn candidate(x1: f64, expanded: bool) -> ExtrusionCandidate {
        ExtrusionCandidate {
            footprint: vec![BoundaryLoop::from_points(&rect(0.0, -0.1, x1, 0.1))],
            direction: Vector3::z(),
            depth: 3.0,
            base_elevation: 0.0,
            original_footprint: expanded
                .then(|| vec![BoundaryLoop::from_points(&rect(0.0, -0.1, x1, 0.1))]),
        }
    }

    fn wall_with(solids: Vec<Solid>) -> HostElement {
        let mut element = HostElement::new(
            ElementId(1),
            "wall-1",
            HostElementKind::Wall(WallGeometry::new(
                Curve2D::line(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0)),
                0.2,
            )),
        );
        element.solids = solids;
        element
    }

    fn resolve(
        element: &HostElement,
        candidate: &ExtrusionCandidate,
        neighbors: &[Neighbor],
        range: Option<VerticalRange>,
    ) -> ResolveOutcome {
        let config = ExportConfig::default();
        ClippingResolver::new(&PrismKernel, &config)
            .resolve(element, candidate, neighbors, range)
            .unwrap()
    }

    #[test]
    fn test_connected_neighbor_is_subtracted() {
        let element = wall_with(vec![Solid::prism(&rect(0.0, -0.1, 3.9, 0.1), 0.0, 3.0).unwrap()]);
        let neighbor = Neighbor::new(
            ElementId(2),
            NeighborRelation::Connected,
            Solid::prism(&rect(3.9, -1.0, 4.1, 1.0), 0.0, 3.0).unwrap(),
        );
        match resolve(&element, &candidate(4.0, false), &[neighbor], None) {
            ResolveOutcome::Resolved(result) => {
                assert!(!result.is_completely_clipped);
                assert!(result.subtracted_openings.is_empty());
                assert_relative_eq!(result.clipped_solid.volume(), 3.9 * 0.2 * 3.0, epsilon = 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_opening_is_detected() {
        // Host geometry with a 1 m wide door void from 0 to 2.1
        let host = Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, 3.0)
            .unwrap()
            .subtract(&Solid::prism(&rect(1.0, -0.2, 2.0, 0.2), 0.0, 2.1).unwrap())
            .unwrap();
        let element = wall_with(vec![host]);
        match resolve(&element, &candidate(4.0, true), &[], None) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.subtracted_openings.len(), 1);
                assert_relative_eq!(
                    result.subtracted_openings[0].volume(),
                    1.0 * 0.2 * 2.1,
                    epsilon = 1e-9
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_expanded_without_openings_rolls_back() {
        let element = wall_with(vec![Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, 3.0).unwrap()]);
        assert_eq!(
            resolve(&element, &candidate(4.0, true), &[], None),
            ResolveOutcome::RollBack
        );
    }

    #[test]
    fn test_range_above_geometry_is_completely_clipped() {
        let element = wall_with(vec![Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, 3.0).unwrap()]);
        match resolve(
            &element,
            &candidate(4.0, false),
            &[],
            Some(VerticalRange::new(6.0, 9.0)),
        ) {
            ResolveOutcome::Resolved(result) => assert!(result.is_completely_clipped),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_failed_neighbor_boolean_is_skipped() {
        let element = wall_with(vec![Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, 3.0).unwrap()]);
        let degenerate = Solid::from_slabs(vec![Slab {
            region: Region2D::from_loops(
                &[BoundaryLoop::from_points(&rect(1.0, -1.0, 2.0, 1.0))],
                1e-3,
            ),
            z_min: 1.0,
            z_max: 1.0,
        }])
        .unwrap();
        // Zero-height slab: the kernel refuses it
        let neighbors = [Neighbor::new(ElementId(4), NeighborRelation::Connected, degenerate)];
        match resolve(&element, &candidate(4.0, false), &neighbors, None) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.skipped_neighbors, vec![ElementId(4)]);
                assert_relative_eq!(result.clipped_solid.volume(), 4.0 * 0.2 * 3.0, epsilon = 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_opening_on_floor_clip_abandons() {
        let host = Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, 3.0)
            .unwrap()
            .subtract(&Solid::prism(&rect(1.0, -0.2, 2.0, 0.2), 0.0, 2.1).unwrap())
            .unwrap();
        let element = wall_with(vec![host]);
        let floor = Neighbor::new(
            ElementId(9),
            NeighborRelation::FloorClip,
            Solid::prism(&rect(-1.0, -1.0, 5.0, 1.0), -0.3, 0.0).unwrap(),
        );
        assert_eq!(
            resolve(&element, &candidate(4.0, false), &[floor], None),
            ResolveOutcome::AbandonToBrep(FallbackReason::OpeningNearFloorClip(ElementId(9)))
        );
    }

    #[test]
    fn test_stepped_opening_clear_of_floor_clip_is_kept() {
        // Void 1 m wide up to 1.0, widening to 2 m up to 2.0
        let step = |x1: f64| Region2D::from_loops(&[BoundaryLoop::from_points(&rect(1.0, -0.2, x1, 0.2))], 1e-3);
        let void = Solid::from_slabs(vec![
            Slab { region: step(2.0), z_min: 0.0, z_max: 1.0 },
            Slab { region: step(3.0), z_min: 1.0, z_max: 2.0 },
        ])
        .unwrap();
        let host = Solid::prism(&rect(0.0, -0.1, 5.0, 0.1), 0.0, 3.0)
            .unwrap()
            .subtract(&void)
            .unwrap();
        let element = wall_with(vec![host]);
        // Inside the void's bounding box but 0.5 m from the narrow lower step
        let floor = Neighbor::new(
            ElementId(9),
            NeighborRelation::FloorClip,
            Solid::prism(&rect(2.5, -1.0, 5.0, 1.0), -0.3, 0.0).unwrap(),
        );
        match resolve(&element, &candidate(5.0, false), &[floor], None) {
            ResolveOutcome::Resolved(result) => {
                assert_eq!(result.subtracted_openings.len(), 1);
                assert_relative_eq!(
                    result.subtracted_openings[0].volume(),
                    (1.0 + 2.0) * 0.2,
                    epsilon = 1e-9
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
