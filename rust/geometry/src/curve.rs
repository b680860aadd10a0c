// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar curve segments used for element axes and boundary loops

use nalgebra::{Point2, Vector2};

/// Discriminant for curve segment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    Line,
    Arc,
    Ellipse,
    Spline,
}

impl CurveKind {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveKind::Line => "Line",
            CurveKind::Arc => "Arc",
            CurveKind::Ellipse => "Ellipse",
            CurveKind::Spline => "Spline",
        }
    }
}

/// A bounded planar curve segment
///
/// Angular curves run counter-clockwise when `end_angle > start_angle` and
/// clockwise otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve2D {
    Line {
        start: Point2<f64>,
        end: Point2<f64>,
    },
    Arc {
        center: Point2<f64>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Ellipse {
        center: Point2<f64>,
        semi_major: f64,
        semi_minor: f64,
        rotation: f64,
        start_angle: f64,
        end_angle: f64,
    },
    /// Piecewise-linear interpolation through the given points
    Spline { points: Vec<Point2<f64>> },
}

impl Curve2D {
    /// Create a line segment
    #[inline]
    pub fn line(start: Point2<f64>, end: Point2<f64>) -> Self {
        Curve2D::Line { start, end }
    }

    /// Create a circular arc
    #[inline]
    pub fn arc(center: Point2<f64>, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Curve2D::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    /// Segment type
    pub fn kind(&self) -> CurveKind {
        match self {
            Curve2D::Line { .. } => CurveKind::Line,
            Curve2D::Arc { .. } => CurveKind::Arc,
            Curve2D::Ellipse { .. } => CurveKind::Ellipse,
            Curve2D::Spline { .. } => CurveKind::Spline,
        }
    }

    /// Evaluate the curve at normalized parameter `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        match self {
            Curve2D::Line { start, end } => start + (end - start) * t,
            Curve2D::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let angle = start_angle + (end_angle - start_angle) * t;
                Point2::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            }
            Curve2D::Ellipse {
                center,
                semi_major,
                semi_minor,
                rotation,
                start_angle,
                end_angle,
            } => {
                let angle = start_angle + (end_angle - start_angle) * t;
                let local = Vector2::new(semi_major * angle.cos(), semi_minor * angle.sin());
                let (s, c) = rotation.sin_cos();
                Point2::new(
                    center.x + local.x * c - local.y * s,
                    center.y + local.x * s + local.y * c,
                )
            }
            Curve2D::Spline { points } => polyline_point_at(points, t),
        }
    }

    #[inline]
    pub fn start_point(&self) -> Point2<f64> {
        self.point_at(0.0)
    }

    #[inline]
    pub fn end_point(&self) -> Point2<f64> {
        self.point_at(1.0)
    }

    #[inline]
    pub fn midpoint(&self) -> Point2<f64> {
        self.point_at(0.5)
    }

    /// Arc length of the segment
    pub fn length(&self) -> f64 {
        match self {
            Curve2D::Line { start, end } => (end - start).norm(),
            Curve2D::Arc {
                radius,
                start_angle,
                end_angle,
                ..
            } => radius.abs() * (end_angle - start_angle).abs(),
            Curve2D::Ellipse { .. } => polyline_length(&self.tessellate(1e-4)),
            Curve2D::Spline { points } => polyline_length(points),
        }
    }

    /// Center and radius if this is a circular arc
    pub fn as_arc(&self) -> Option<(Point2<f64>, f64)> {
        match self {
            Curve2D::Arc { center, radius, .. } => Some((*center, *radius)),
            _ => None,
        }
    }

    /// Unit direction from start to end point, `None` for closed or zero-length segments
    pub fn chord_direction(&self) -> Option<Vector2<f64>> {
        (self.end_point() - self.start_point()).try_normalize(1e-12)
    }

    /// The same geometry traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        match self {
            Curve2D::Line { start, end } => Curve2D::Line {
                start: *end,
                end: *start,
            },
            Curve2D::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => Curve2D::Arc {
                center: *center,
                radius: *radius,
                start_angle: *end_angle,
                end_angle: *start_angle,
            },
            Curve2D::Ellipse {
                center,
                semi_major,
                semi_minor,
                rotation,
                start_angle,
                end_angle,
            } => Curve2D::Ellipse {
                center: *center,
                semi_major: *semi_major,
                semi_minor: *semi_minor,
                rotation: *rotation,
                start_angle: *end_angle,
                end_angle: *start_angle,
            },
            Curve2D::Spline { points } => Curve2D::Spline {
                points: points.iter().rev().cloned().collect(),
            },
        }
    }

    /// Approximate the segment by a polyline whose chords deviate from the
    /// curve by at most `chord_tolerance`. Both endpoints are included.
    pub fn tessellate(&self, chord_tolerance: f64) -> Vec<Point2<f64>> {
        match self {
            Curve2D::Line { start, end } => vec![*start, *end],
            Curve2D::Spline { points } => points.clone(),
            Curve2D::Arc {
                radius,
                start_angle,
                end_angle,
                ..
            } => {
                let segments = angular_segments(*radius, end_angle - start_angle, chord_tolerance);
                self.sample(segments)
            }
            Curve2D::Ellipse {
                semi_major,
                semi_minor,
                start_angle,
                end_angle,
                ..
            } => {
                let r = semi_major.abs().max(semi_minor.abs());
                let segments = angular_segments(r, end_angle - start_angle, chord_tolerance);
                self.sample(segments)
            }
        }
    }

    fn sample(&self, segments: usize) -> Vec<Point2<f64>> {
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }
}

/// Number of chords needed so the sagitta stays below `tolerance`
fn angular_segments(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let radius = radius.abs();
    let sweep = sweep.abs();
    if radius <= tolerance || sweep <= 0.0 {
        return 1;
    }
    let max_step = 2.0 * (1.0 - tolerance / radius).clamp(-1.0, 1.0).acos();
    if max_step <= 0.0 {
        return 256;
    }
    ((sweep / max_step).ceil() as usize).clamp(2, 256)
}

fn polyline_length(points: &[Point2<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

fn polyline_point_at(points: &[Point2<f64>], t: f64) -> Point2<f64> {
    match points.len() {
        0 => Point2::origin(),
        1 => points[0],
        _ => {
            let total = polyline_length(points);
            if total <= 0.0 {
                return points[0];
            }
            let mut remaining = t.clamp(0.0, 1.0) * total;
            for w in points.windows(2) {
                let seg = (w[1] - w[0]).norm();
                if remaining <= seg && seg > 0.0 {
                    return w[0] + (w[1] - w[0]) * (remaining / seg);
                }
                remaining -= seg;
            }
            points[points.len() - 1]
        }
    }
}
