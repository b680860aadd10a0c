// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary loops, polygon profiles and multi-polygon regions

use crate::bool2d::{compute_signed_area, contour_bounds, segments_intersect};
use crate::curve::Curve2D;
use crate::error::{Error, Result};
use nalgebra::{Point2, Vector2};

/// Minimum area for a loop or profile to count as non-degenerate
pub const MIN_AREA: f64 = 1e-10;

/// Closed, ordered sequence of planar curve segments
///
/// Loops handed to the extrusion path are counter-clockwise when viewed
/// along the extrusion normal; use [`BoundaryLoop::normalized`] to enforce it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLoop {
    segments: Vec<Curve2D>,
}

impl BoundaryLoop {
    pub fn new(segments: Vec<Curve2D>) -> Self {
        Self { segments }
    }

    /// Closed polygon of line segments through `points`
    pub fn from_points(points: &[Point2<f64>]) -> Self {
        let n = points.len();
        let segments = (0..n)
            .map(|i| Curve2D::line(points[i], points[(i + 1) % n]))
            .collect();
        Self { segments }
    }

    /// Axis-aligned rectangle, counter-clockwise
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self::from_points(&[
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    #[inline]
    pub fn segments(&self) -> &[Curve2D] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check that consecutive segments connect end-to-start, including the wrap-around
    pub fn is_closed(&self, tolerance: f64) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let n = self.segments.len();
        (0..n).all(|i| {
            let end = self.segments[i].end_point();
            let next_start = self.segments[(i + 1) % n].start_point();
            (end - next_start).norm() <= tolerance
        })
    }

    /// Polygon approximation; each vertex appears once (no closing duplicate)
    pub fn to_polygon(&self, chord_tolerance: f64) -> Vec<Point2<f64>> {
        let mut points = Vec::new();
        for segment in &self.segments {
            let pts = segment.tessellate(chord_tolerance);
            let take = pts.len().saturating_sub(1);
            points.extend_from_slice(&pts[..take]);
        }
        points
    }

    /// Signed area of the polygon approximation; positive means counter-clockwise
    pub fn signed_area(&self, chord_tolerance: f64) -> f64 {
        compute_signed_area(&self.to_polygon(chord_tolerance))
    }

    #[inline]
    pub fn is_ccw(&self, chord_tolerance: f64) -> bool {
        self.signed_area(chord_tolerance) > 0.0
    }

    /// The same loop traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            segments: self.segments.iter().rev().map(Curve2D::reversed).collect(),
        }
    }

    /// Return the loop with counter-clockwise winding
    pub fn normalized(self, chord_tolerance: f64) -> Self {
        if self.signed_area(chord_tolerance) < 0.0 {
            self.reversed()
        } else {
            self
        }
    }

    /// True when no two non-adjacent edges of the polygon approximation cross
    pub fn is_simple(&self, chord_tolerance: f64) -> bool {
        let poly = self.to_polygon(chord_tolerance);
        let n = poly.len();
        if n < 3 {
            return false;
        }
        for i in 0..n {
            let a0 = poly[i];
            let a1 = poly[(i + 1) % n];
            for j in (i + 1)..n {
                // adjacent edges share a vertex
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                let b0 = poly[j];
                let b1 = poly[(j + 1) % n];
                if segments_intersect(&a0, &a1, &b0, &b1) {
                    return false;
                }
            }
        }
        true
    }

    /// Reject open, degenerate or self-intersecting loops
    pub fn validate(&self, tolerance: f64, chord_tolerance: f64) -> Result<()> {
        if !self.is_closed(tolerance) {
            return Err(Error::InvalidProfile("Boundary loop is not closed".to_string()));
        }
        if self.signed_area(chord_tolerance).abs() <= MIN_AREA {
            return Err(Error::InvalidProfile("Boundary loop has no area".to_string()));
        }
        if !self.is_simple(chord_tolerance) {
            return Err(Error::InvalidProfile(
                "Boundary loop self-intersects".to_string(),
            ));
        }
        Ok(())
    }

    /// Total length of all segments
    pub fn perimeter(&self) -> f64 {
        self.segments.iter().map(Curve2D::length).sum()
    }
}

/// 2D Profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Enclosed area (outer minus holes)
    pub fn area(&self) -> f64 {
        let holes: f64 = self
            .holes
            .iter()
            .map(|h| compute_signed_area(h).abs())
            .sum();
        compute_signed_area(&self.outer).abs() - holes
    }

    /// Number of boundary edges, outer and holes together
    pub fn edge_count(&self) -> usize {
        self.outer.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    /// Triangulate the profile using earcutr
    /// Returns triangle indices into the flattened vertex array
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(
                "Profile must have at least 3 vertices".to_string(),
            ));
        }

        let mut vertices = Vec::with_capacity(self.edge_count() * 2);
        for p in &self.outer {
            vertices.push(p.x);
            vertices.push(p.y);
        }

        let mut hole_indices = Vec::with_capacity(self.holes.len());
        for hole in &self.holes {
            hole_indices.push(vertices.len() / 2);
            for p in hole {
                vertices.push(p.x);
                vertices.push(p.y);
            }
        }

        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

        let points = vertices
            .chunks_exact(2)
            .map(|c| Point2::new(c[0], c[1]))
            .collect();

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated profile result
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices
    pub indices: Vec<usize>,
}

/// Set of disjoint profiles lying in one plane
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region2D {
    pub profiles: Vec<Profile2D>,
}

impl Region2D {
    pub fn new(profiles: Vec<Profile2D>) -> Self {
        Self { profiles }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_profile(profile: Profile2D) -> Self {
        Self {
            profiles: vec![profile],
        }
    }

    /// Build a region from closed loops using even-odd nesting
    pub fn from_loops(loops: &[BoundaryLoop], chord_tolerance: f64) -> Self {
        let contours: Vec<Vec<Point2<f64>>> = loops
            .iter()
            .map(|l| l.to_polygon(chord_tolerance))
            .collect();
        crate::bool2d::region_from_contours(&contours)
    }

    /// Total enclosed area
    pub fn area(&self) -> f64 {
        self.profiles.iter().map(Profile2D::area).sum()
    }

    /// True when the region encloses no measurable area
    pub fn is_empty(&self) -> bool {
        self.area() <= MIN_AREA
    }

    /// Number of disjoint profiles
    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Bounding rectangle of all outer boundaries
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        self.profiles
            .iter()
            .filter_map(|p| contour_bounds(&p.outer))
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    Point2::new(amin.x.min(bmin.x), amin.y.min(bmin.y)),
                    Point2::new(amax.x.max(bmax.x), amax.y.max(bmax.y)),
                )
            })
    }

    /// Copy shifted by `offset`
    pub fn translated(&self, offset: Vector2<f64>) -> Region2D {
        let shift = |c: &Vec<Point2<f64>>| c.iter().map(|p| p + offset).collect::<Vec<_>>();
        Region2D {
            profiles: self
                .profiles
                .iter()
                .map(|p| Profile2D {
                    outer: shift(&p.outer),
                    holes: p.holes.iter().map(shift).collect(),
                })
                .collect(),
        }
    }

    /// All coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.profiles.iter().all(|p| {
            p.outer
                .iter()
                .chain(p.holes.iter().flatten())
                .all(|pt| pt.x.is_finite() && pt.y.is_finite())
        })
    }

    /// Vertex-by-vertex comparison within `tolerance`
    pub fn approx_eq(&self, other: &Region2D, tolerance: f64) -> bool {
        fn same(a: &[Point2<f64>], b: &[Point2<f64>], tol: f64) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| (p - q).norm() <= tol)
        }
        self.profiles.len() == other.profiles.len()
            && self.profiles.iter().zip(&other.profiles).all(|(p, q)| {
                same(&p.outer, &q.outer, tolerance)
                    && p.holes.len() == q.holes.len()
                    && p.holes.iter().zip(&q.holes).all(|(h, g)| same(h, g, tolerance))
            })
    }
}
