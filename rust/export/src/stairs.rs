// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stair shape classification from flight paths

use crate::config::ExportConfig;
use ifc_export_geometry::{Curve2D, CurveKind, Vector2};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStyle {
    Straight,
    Curved,
    Winder,
    Spiral,
    /// Drawn by hand; shape is inferred from the path
    Sketched,
}

/// One flight of a stair, in plan
#[derive(Debug, Clone, PartialEq)]
pub struct StairFlightDescriptor {
    pub style: FlightStyle,
    /// Walking path: one or more lines, or an arc
    pub path: Vec<Curve2D>,
    pub start_elevation: f64,
}

impl StairFlightDescriptor {
    pub fn new(style: FlightStyle, path: Vec<Curve2D>, start_elevation: f64) -> Self {
        Self {
            style,
            path,
            start_elevation,
        }
    }

    pub fn path_length(&self) -> f64 {
        self.path.iter().map(Curve2D::length).sum()
    }

    /// Unit vector from the start of the path to its end
    pub fn direction(&self) -> Option<Vector2<f64>> {
        let first = self.path.first()?;
        let last = self.path.last()?;
        (last.end_point() - first.start_point()).try_normalize(1e-9)
    }

    fn shape(&self, tolerance: f64) -> FlightShape {
        match self.style {
            FlightStyle::Spiral => FlightShape::Spiral,
            FlightStyle::Winder => FlightShape::Winder,
            FlightStyle::Curved => FlightShape::Curved,
            FlightStyle::Straight | FlightStyle::Sketched => self.infer_shape(tolerance),
        }
    }

    /// Straight when every segment is a line along the same direction
    fn infer_shape(&self, tolerance: f64) -> FlightShape {
        if self.path.iter().any(|c| c.kind() != CurveKind::Line) {
            return FlightShape::Curved;
        }
        let directions: SmallVec<[Vector2<f64>; 4]> =
            self.path.iter().filter_map(Curve2D::chord_direction).collect();
        let collinear = directions
            .windows(2)
            .all(|w| (w[0].perp(&w[1])).abs() <= tolerance && w[0].dot(&w[1]) > 0.0);
        if collinear {
            FlightShape::Straight(self.direction())
        } else {
            FlightShape::Winder
        }
    }
}

enum FlightShape {
    Straight(Option<Vector2<f64>>),
    Curved,
    Winder,
    Spiral,
}

/// IFC stair shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StairShape {
    StraightRun,
    TwoStraightRun,
    QuarterWinding,
    QuarterTurn,
    HalfWinding,
    HalfTurn,
    TwoQuarterWinding,
    TwoQuarterTurn,
    ThreeQuarterWinding,
    ThreeQuarterTurn,
    Spiral,
    DoubleReturn,
    CurvedRun,
    TwoCurvedRun,
    UserDefined,
    NotDefined,
}

impl StairShape {
    /// IfcStairTypeEnum literal
    pub fn as_ifc_str(&self) -> &'static str {
        match self {
            StairShape::StraightRun => "STRAIGHT_RUN_STAIR",
            StairShape::TwoStraightRun => "TWO_STRAIGHT_RUN_STAIR",
            StairShape::QuarterWinding => "QUARTER_WINDING_STAIR",
            StairShape::QuarterTurn => "QUARTER_TURN_STAIR",
            StairShape::HalfWinding => "HALF_WINDING_STAIR",
            StairShape::HalfTurn => "HALF_TURN_STAIR",
            StairShape::TwoQuarterWinding => "TWO_QUARTER_WINDING_STAIR",
            StairShape::TwoQuarterTurn => "TWO_QUARTER_TURN_STAIR",
            StairShape::ThreeQuarterWinding => "THREE_QUARTER_WINDING_STAIR",
            StairShape::ThreeQuarterTurn => "THREE_QUARTER_TURN_STAIR",
            StairShape::Spiral => "SPIRAL_STAIR",
            StairShape::DoubleReturn => "DOUBLE_RETURN_STAIR",
            StairShape::CurvedRun => "CURVED_RUN_STAIR",
            StairShape::TwoCurvedRun => "TWO_CURVED_RUN_STAIR",
            StairShape::UserDefined => "USERDEFINED",
            StairShape::NotDefined => "NOTDEFINED",
        }
    }
}

impl fmt::Display for StairShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StairShape::StraightRun => "straight run stair",
            StairShape::TwoStraightRun => "two straight run stair",
            StairShape::QuarterWinding => "quarter winding stair",
            StairShape::QuarterTurn => "quarter turn stair",
            StairShape::HalfWinding => "half winding stair",
            StairShape::HalfTurn => "half turn stair",
            StairShape::TwoQuarterWinding => "two quarter winding stair",
            StairShape::TwoQuarterTurn => "two quarter turn stair",
            StairShape::ThreeQuarterWinding => "three-quarter winding stair",
            StairShape::ThreeQuarterTurn => "three-quarter turn stair",
            StairShape::Spiral => "spiral stair",
            StairShape::DoubleReturn => "double return stair",
            StairShape::CurvedRun => "curved run stair",
            StairShape::TwoCurvedRun => "two curved run stair",
            StairShape::UserDefined => "user defined stair",
            StairShape::NotDefined => "not defined",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StairClassification {
    pub shape: StairShape,
    /// Sum of all flight path lengths
    pub total_path_length: f64,
}

/// Classify a stair from its flights, landing count and winder count
///
/// `fallback` replaces the result only when nothing in the table matches.
pub fn classify_stair(
    flights: &[StairFlightDescriptor],
    landings: usize,
    winders: usize,
    fallback: Option<StairShape>,
    config: &ExportConfig,
) -> StairClassification {
    let tol = config.direction_tolerance;

    let mut total_path_length = 0.0;
    let mut spiral = false;
    let mut curved = 0usize;
    let mut winders = winders;
    let mut straight: SmallVec<[(Option<Vector2<f64>>, f64); 4]> = SmallVec::new();

    for flight in flights {
        total_path_length += flight.path_length();
        if spiral {
            continue;
        }
        match flight.shape(tol) {
            FlightShape::Spiral => spiral = true,
            FlightShape::Curved => curved += 1,
            FlightShape::Winder => winders += 1,
            FlightShape::Straight(direction) => straight.push((direction, flight.start_elevation)),
        }
    }

    let shape = if spiral {
        StairShape::Spiral
    } else {
        let directions: Option<SmallVec<[Vector2<f64>; 4]>> =
            straight.iter().map(|(d, _)| *d).collect();
        let single = flights.len() == 1;
        match (straight.len(), curved, directions) {
            (1, 0, _) if single => StairShape::StraightRun,
            (0, 1, _) if single => StairShape::CurvedRun,
            (0, 2, _) if flights.len() == 2 && landings == 1 => StairShape::TwoCurvedRun,
            (2, 0, Some(d)) => two_flights(d[0].dot(&d[1]), landings, winders, tol),
            (3, 0, Some(d)) if successive_right_angles(&d, tol) => {
                if winders == 2 {
                    StairShape::TwoQuarterWinding
                } else if landings == 2 {
                    let elevations: SmallVec<[f64; 4]> = straight.iter().map(|(_, e)| *e).collect();
                    if shares_start_elevation(&elevations, config.level_extension_tolerance) {
                        StairShape::DoubleReturn
                    } else {
                        StairShape::TwoQuarterTurn
                    }
                } else {
                    StairShape::NotDefined
                }
            }
            (4, 0, Some(d)) if successive_right_angles(&d, tol) => {
                if winders == 3 {
                    StairShape::ThreeQuarterWinding
                } else if landings == 3 {
                    StairShape::ThreeQuarterTurn
                } else {
                    StairShape::NotDefined
                }
            }
            _ => StairShape::NotDefined,
        }
    };

    let shape = match (shape, fallback) {
        (StairShape::NotDefined, Some(fallback)) => fallback,
        (shape, _) => shape,
    };

    tracing::debug!(
        flights = flights.len(),
        landings,
        winders,
        shape = shape.as_ifc_str(),
        "classified stair"
    );

    StairClassification {
        shape,
        total_path_length,
    }
}

fn two_flights(dot: f64, landings: usize, winders: usize, tol: f64) -> StairShape {
    if (dot - 1.0).abs() <= tol {
        if landings == 1 {
            return StairShape::TwoStraightRun;
        }
    } else if dot.abs() <= tol {
        if landings == 1 {
            return StairShape::QuarterTurn;
        }
        if winders == 1 {
            return StairShape::HalfWinding;
        }
    } else if (dot + 1.0).abs() <= tol {
        if winders == 1 {
            return StairShape::HalfWinding;
        }
        if landings == 1 {
            return StairShape::HalfTurn;
        }
    }
    StairShape::NotDefined
}

fn successive_right_angles(directions: &[Vector2<f64>], tol: f64) -> bool {
    directions.windows(2).all(|w| w[0].dot(&w[1]).abs() <= tol)
}

fn shares_start_elevation(elevations: &[f64], tol: f64) -> bool {
    elevations.iter().enumerate().any(|(i, a)| {
        elevations[i + 1..].iter().any(|b| (a - b).abs() <= tol)
    })
}
