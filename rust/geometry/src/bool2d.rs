// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations on Footprint Regions
//!
//! Polygon boolean operations backed by the i_overlay crate. Prism solids
//! reduce their 3D booleans to these operations slab by slab, so every
//! shape the overlay returns is kept (unlike profile-level void subtraction,
//! disjoint pieces are meaningful here).

use crate::profile::{Profile2D, Region2D, MIN_AREA};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point2, Vector2};

/// Epsilon for floating point comparisons in 2D operations
const EPSILON_2D: f64 = 1e-12;

/// Region difference `a - b`
pub fn difference(a: &Region2D, b: &Region2D) -> Region2D {
    if a.profiles.is_empty() {
        return Region2D::empty();
    }
    if b.profiles.is_empty() {
        return a.clone();
    }
    overlay(a, b, OverlayRule::Difference)
}

/// Region intersection `a ∩ b`
pub fn intersection(a: &Region2D, b: &Region2D) -> Region2D {
    if a.profiles.is_empty() || b.profiles.is_empty() {
        return Region2D::empty();
    }
    overlay(a, b, OverlayRule::Intersect)
}

/// Region union `a ∪ b`
pub fn union(a: &Region2D, b: &Region2D) -> Region2D {
    if a.profiles.is_empty() {
        return b.clone();
    }
    if b.profiles.is_empty() {
        return a.clone();
    }
    overlay(a, b, OverlayRule::Union)
}

/// Grow `a` by `distance` along both axes
///
/// Union of the region shifted to the eight compass offsets. Matches the
/// Minkowski sum with a square of half-width `distance` for rectangles.
pub fn dilate(a: &Region2D, distance: f64) -> Region2D {
    if a.profiles.is_empty() || distance <= 0.0 {
        return a.clone();
    }
    let mut grown = a.clone();
    for dx in [-distance, 0.0, distance] {
        for dy in [-distance, 0.0, distance] {
            if dx == 0.0 && dy == 0.0 {
                continue;
            }
            grown = union(&grown, &a.translated(Vector2::new(dx, dy)));
        }
    }
    grown
}

/// Normalize loose contours into a region, nesting them by even-odd parity
pub fn region_from_contours(contours: &[Vec<Point2<f64>>]) -> Region2D {
    let subject: Vec<Vec<[f64; 2]>> = contours
        .iter()
        .filter(|c| c.len() >= 3)
        .map(|c| contour_to_path(c))
        .collect();
    if subject.is_empty() {
        return Region2D::empty();
    }
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();
    let result = subject.overlay(&clip, OverlayRule::Subject, FillRule::EvenOdd);
    shapes_to_region(&result)
}

fn overlay(a: &Region2D, b: &Region2D, rule: OverlayRule) -> Region2D {
    let subject = region_to_paths(a);
    let clip = region_to_paths(b);
    let result = subject.overlay(&clip, rule, FillRule::EvenOdd);
    shapes_to_region(&result)
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    contour.len() >= 3 && compute_signed_area(contour).abs() > MIN_AREA
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let n = contour.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            contour[i].x * contour[j].y - contour[j].x * contour[i].y
        })
        .sum();

    twice * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = *contour.first()?;
    Some(contour.iter().skip(1).fold((first, first), |(min, max), p| {
        (
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

/// Proper or touching intersection test between segments `a0a1` and `b0b1`
pub fn segments_intersect(
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
) -> bool {
    fn orient(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> f64 {
        (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
    }
    fn on_segment(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> bool {
        r.x >= p.x.min(q.x) - EPSILON_2D
            && r.x <= p.x.max(q.x) + EPSILON_2D
            && r.y >= p.y.min(q.y) - EPSILON_2D
            && r.y <= p.y.max(q.y) + EPSILON_2D
    }

    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);

    if ((d1 > EPSILON_2D && d2 < -EPSILON_2D) || (d1 < -EPSILON_2D && d2 > EPSILON_2D))
        && ((d3 > EPSILON_2D && d4 < -EPSILON_2D) || (d3 < -EPSILON_2D && d4 > EPSILON_2D))
    {
        return true;
    }

    (d1.abs() <= EPSILON_2D && on_segment(b0, b1, a0))
        || (d2.abs() <= EPSILON_2D && on_segment(b0, b1, a1))
        || (d3.abs() <= EPSILON_2D && on_segment(a0, a1, b0))
        || (d4.abs() <= EPSILON_2D && on_segment(a0, a1, b1))
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, collinear points dropped
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| (*a - *b).norm() <= EPSILON_2D);
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Check if two bounding boxes overlap
pub fn bounds_overlap(
    a_min: &Point2<f64>,
    a_max: &Point2<f64>,
    b_min: &Point2<f64>,
    b_max: &Point2<f64>,
) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Convert a region to i_overlay path format (outer CCW, holes CW)
fn region_to_paths(region: &Region2D) -> Vec<Vec<[f64; 2]>> {
    let mut paths = Vec::new();
    for profile in &region.profiles {
        paths.push(contour_to_path(&ensure_ccw(&profile.outer)));
        for hole in &profile.holes {
            paths.push(contour_to_path(&ensure_cw(hole)));
        }
    }
    paths
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Convert i_overlay result shapes to a region
///
/// Each shape is a list of contours: first the outer boundary, then holes.
/// Slivers below the minimum area are discarded.
fn shapes_to_region(shapes: &[Vec<Vec<[f64; 2]>>]) -> Region2D {
    let mut profiles = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some(outer_path) = shape.first() else {
            continue;
        };
        let outer = path_to_contour(outer_path);
        if !is_valid_contour(&outer) {
            continue;
        }
        let mut profile = Profile2D::new(ensure_ccw(&outer));
        for hole_path in shape.iter().skip(1) {
            let hole = path_to_contour(hole_path);
            if is_valid_contour(&hole) {
                profile.add_hole(ensure_cw(&hole));
            }
        }
        profiles.push(profile);
    }
    Region2D::new(profiles)
}
