// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export configuration loaded from environment variables or JSON.

use crate::error::Result;
use ifc_export_geometry::CurveKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target IFC schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IfcSchemaVersion {
    #[default]
    #[serde(rename = "IFC2X3")]
    Ifc2x3,
    #[serde(rename = "IFC4")]
    Ifc4,
    #[serde(rename = "IFC4X3")]
    Ifc4x3,
}

impl IfcSchemaVersion {
    /// Whether a wall axis made of `kind` may be written as a swept solid.
    ///
    /// Coordination views before IFC4 only allow lines and circular arcs.
    pub fn permits_axis_curve(&self, kind: CurveKind) -> bool {
        match kind {
            CurveKind::Line | CurveKind::Arc => true,
            CurveKind::Ellipse | CurveKind::Spline => *self != IfcSchemaVersion::Ifc2x3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IfcSchemaVersion::Ifc2x3 => "IFC2X3",
            IfcSchemaVersion::Ifc4 => "IFC4",
            IfcSchemaVersion::Ifc4x3 => "IFC4X3",
        }
    }
}

impl FromStr for IfcSchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IFC2X3" => Ok(IfcSchemaVersion::Ifc2x3),
            "IFC4" => Ok(IfcSchemaVersion::Ifc4),
            "IFC4X3" => Ok(IfcSchemaVersion::Ifc4x3),
            other => Err(format!("unknown IFC schema '{}'", other)),
        }
    }
}

/// Export engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Target schema; controls which axis curves may be extruded.
    pub schema: IfcSchemaVersion,
    /// Geometric comparison tolerance in metres.
    pub tolerance: f64,
    /// Footprints smaller than this fraction of the estimated area are expanded.
    pub area_ratio_threshold: f64,
    /// Wall widths discounted at each end of the axis to account for joins.
    pub side_allowance_widths: f64,
    /// Slack when matching elevations against levels, in metres.
    pub level_extension_tolerance: f64,
    /// Tolerance on dot products between stair flight directions.
    pub direction_tolerance: f64,
    /// Width matching tolerance for material layers, in metres.
    pub layer_width_tolerance: f64,
    /// Maximum chord deviation when tessellating arcs, in metres.
    pub arc_tolerance: f64,
    /// Concave area not explained by openings, as a fraction of the reference footprint.
    pub concavity_ratio: f64,
    /// Openings closer than this to a floor clip abandon the extrusion, in metres.
    pub floor_clip_proximity: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            schema: IfcSchemaVersion::Ifc2x3,
            tolerance: 1e-6,
            area_ratio_threshold: 0.95,
            side_allowance_widths: 1.0,
            level_extension_tolerance: 0.01,
            direction_tolerance: 0.05,
            layer_width_tolerance: 0.001,
            arc_tolerance: 0.005,
            concavity_ratio: 0.001,
            floor_clip_proximity: 0.001,
        }
    }
}

impl ExportConfig {
    /// Load configuration from `IFC_EXPORT_*` environment variables.
    ///
    /// Missing or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            schema: env_or("IFC_EXPORT_SCHEMA", defaults.schema),
            tolerance: env_or("IFC_EXPORT_TOLERANCE", defaults.tolerance),
            area_ratio_threshold: env_or(
                "IFC_EXPORT_AREA_RATIO_THRESHOLD",
                defaults.area_ratio_threshold,
            ),
            side_allowance_widths: env_or(
                "IFC_EXPORT_SIDE_ALLOWANCE_WIDTHS",
                defaults.side_allowance_widths,
            ),
            level_extension_tolerance: env_or(
                "IFC_EXPORT_LEVEL_EXTENSION_TOLERANCE",
                defaults.level_extension_tolerance,
            ),
            direction_tolerance: env_or(
                "IFC_EXPORT_DIRECTION_TOLERANCE",
                defaults.direction_tolerance,
            ),
            layer_width_tolerance: env_or(
                "IFC_EXPORT_LAYER_WIDTH_TOLERANCE",
                defaults.layer_width_tolerance,
            ),
            arc_tolerance: env_or("IFC_EXPORT_ARC_TOLERANCE", defaults.arc_tolerance),
            concavity_ratio: env_or("IFC_EXPORT_CONCAVITY_RATIO", defaults.concavity_ratio),
            floor_clip_proximity: env_or(
                "IFC_EXPORT_FLOOR_CLIP_PROXIMITY",
                defaults.floor_clip_proximity,
            ),
        }
    }

    /// Parse configuration from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
