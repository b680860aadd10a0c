// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material-layer sequencing
//!
//! Orders the material layers found on a host's geometry and reconciles
//! them with the declared layer list. The sequencer never fails: when the
//! geometry cannot be matched to the declaration it degrades to a single
//! material layer.

use crate::config::ExportConfig;
use crate::element::MaterialId;
use ifc_export_geometry::{Curve2D, Point2, Point3, Vector2};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Declared layer of a host type
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub material: MaterialId,
    pub width: f64,
    pub name: String,
}

impl LayerDefinition {
    pub fn new(material: MaterialId, width: f64, name: impl Into<String>) -> Self {
        Self {
            material,
            width,
            name: name.into(),
        }
    }
}

/// Top face of one geometric layer fragment
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFace {
    pub material: MaterialId,
    pub width: f64,
    pub midpoint: Point3<f64>,
    /// Explicit index into the declared layers, when the fragment carries one
    pub layer_index: Option<usize>,
}

/// Layer as written to the material layer set
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialLayer {
    pub base_material: MaterialId,
    pub width: f64,
    pub ordinal: usize,
    pub shape_aspect_name: String,
}

/// How faces are ordered across the host's thickness
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerPath {
    /// Perpendicular offset from a straight location line
    Straight {
        origin: Point2<f64>,
        direction: Vector2<f64>,
    },
    /// Radius about the centre of a curved location line
    Curved { center: Point2<f64> },
    /// Elevation, for floors and roofs
    Vertical,
}

impl LayerPath {
    /// Ordering path for a wall axis
    pub fn from_axis(axis: &Curve2D) -> Option<LayerPath> {
        if let Some((center, _)) = axis.as_arc() {
            return Some(LayerPath::Curved { center });
        }
        let direction = axis.chord_direction()?;
        Some(LayerPath::Straight {
            origin: axis.start_point(),
            direction,
        })
    }

    fn key(&self, p: &Point3<f64>) -> f64 {
        match *self {
            LayerPath::Straight { origin, direction } => {
                let normal = Vector2::new(-direction.y, direction.x);
                (Point2::new(p.x, p.y) - origin).dot(&normal)
            }
            LayerPath::Curved { center } => (Point2::new(p.x, p.y) - center).norm(),
            LayerPath::Vertical => p.z,
        }
    }
}

/// Where the final ordering came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOrder {
    /// Fragments carried explicit layer indices
    Annotated,
    /// Geometry matched the declaration, or there was no geometry to contradict it
    Declared,
    /// Geometry matched the declaration back to front
    Reversed,
    /// No match; collapsed to the first non-zero-width layer
    SingleMaterial,
    /// Nothing with a width was declared
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSequence {
    pub layers: Vec<MaterialLayer>,
    pub order: LayerOrder,
}

impl LayerSequence {
    pub fn total_width(&self) -> f64 {
        self.layers.iter().map(|l| l.width).sum()
    }
}

pub struct LayerSequencer {
    tolerance: f64,
}

impl LayerSequencer {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            tolerance: config.layer_width_tolerance,
        }
    }

    pub fn sequence(
        &self,
        faces: &[LayerFace],
        declared: &[LayerDefinition],
        path: &LayerPath,
    ) -> LayerSequence {
        let widths: Vec<&LayerDefinition> = declared
            .iter()
            .filter(|l| l.width > self.tolerance)
            .collect();
        if widths.is_empty() {
            return LayerSequence {
                layers: Vec::new(),
                order: LayerOrder::Empty,
            };
        }

        if let Some(layers) = self.annotated(faces, declared) {
            return LayerSequence {
                layers,
                order: LayerOrder::Annotated,
            };
        }

        if faces.is_empty() {
            return LayerSequence {
                layers: build_layers(widths.iter().copied()),
                order: LayerOrder::Declared,
            };
        }

        let observed = self.ordered_faces(faces, path);
        if self.matches(observed.iter().copied(), &widths) {
            LayerSequence {
                layers: build_layers(widths.iter().copied()),
                order: LayerOrder::Declared,
            }
        } else if self.matches(observed.iter().rev().copied(), &widths) {
            LayerSequence {
                layers: build_layers(widths.iter().rev().copied()),
                order: LayerOrder::Reversed,
            }
        } else {
            tracing::warn!(
                faces = observed.len(),
                declared = widths.len(),
                "layer geometry does not match declaration, using a single material"
            );
            LayerSequence {
                layers: build_layers(widths.iter().copied().take(1)),
                order: LayerOrder::SingleMaterial,
            }
        }
    }

    fn annotated(&self, faces: &[LayerFace], declared: &[LayerDefinition]) -> Option<Vec<MaterialLayer>> {
        if faces.is_empty() {
            return None;
        }
        let indices = faces
            .iter()
            .map(|f| f.layer_index)
            .collect::<Option<BTreeSet<usize>>>()?;
        let layers = indices
            .into_iter()
            .map(|i| declared.get(i))
            .collect::<Option<SmallVec<[&LayerDefinition; 8]>>>()?;
        Some(build_layers(layers.into_iter()))
    }

    /// Faces sorted along the path, with fragments of the same layer merged
    fn ordered_faces<'f>(&self, faces: &'f [LayerFace], path: &LayerPath) -> Vec<&'f LayerFace> {
        let mut keyed: Vec<(f64, &LayerFace)> = faces.iter().map(|f| (path.key(&f.midpoint), f)).collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut ordered: Vec<(f64, &LayerFace)> = Vec::with_capacity(keyed.len());
        for (key, face) in keyed {
            let same_layer = ordered.last().is_some_and(|(k, f)| {
                (key - k).abs() <= self.tolerance && f.material == face.material
            });
            if !same_layer {
                ordered.push((key, face));
            }
        }
        ordered.into_iter().map(|(_, f)| f).collect()
    }

    fn matches<'f>(
        &self,
        observed: impl Iterator<Item = &'f LayerFace>,
        declared: &[&LayerDefinition],
    ) -> bool {
        let observed: Vec<&LayerFace> = observed.collect();
        observed.len() == declared.len()
            && observed.iter().zip(declared).all(|(face, layer)| {
                face.material == layer.material && (face.width - layer.width).abs() <= self.tolerance
            })
    }
}

fn build_layers<'a>(definitions: impl Iterator<Item = &'a LayerDefinition>) -> Vec<MaterialLayer> {
    let definitions: Vec<&LayerDefinition> = definitions.collect();
    let names = dedup_names(definitions.iter().map(|d| {
        if d.name.trim().is_empty() {
            "Layer".to_string()
        } else {
            d.name.clone()
        }
    }));
    definitions
        .into_iter()
        .zip(names)
        .enumerate()
        .map(|(ordinal, (definition, name))| MaterialLayer {
            base_material: definition.material,
            width: definition.width,
            ordinal,
            shape_aspect_name: name,
        })
        .collect()
}

/// Make names unique: "Name", "Name 2", "Name 3", ...
pub fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut taken: FxHashSet<String> = FxHashSet::default();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut suffix = 2;
            while taken.contains(&candidate) {
                candidate = format!("{} {}", name, suffix);
                suffix += 1;
            }
            taken.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Layer widths add up to the host thickness
pub fn layers_match_depth(layers: &[MaterialLayer], depth: f64, tolerance: f64) -> bool {
    let total: f64 = layers.iter().map(|l| l.width).sum();
    (total - depth).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn declared() -> Vec<LayerDefinition> {
        vec![
            LayerDefinition::new(MaterialId(1), 0.02, "Plaster"),
            LayerDefinition::new(MaterialId(2), 0.2, "Concrete"),
            LayerDefinition::new(MaterialId(3), 0.05, "Insulation"),
        ]
    }

    fn face(material: u64, width: f64, offset: f64) -> LayerFace {
        LayerFace {
            material: MaterialId(material),
            width,
            midpoint: Point3::new(2.0, offset, 3.0),
            layer_index: None,
        }
    }

    fn x_axis() -> LayerPath {
        LayerPath::Straight {
            origin: Point2::origin(),
            direction: Vector2::x(),
        }
    }

    fn materials_and_ordinals(layers: &[MaterialLayer]) -> Vec<(u64, usize)> {
        layers.iter().map(|l| (l.base_material.0, l.ordinal)).collect()
    }

    fn sequencer() -> LayerSequencer {
        LayerSequencer::new(&ExportConfig::default())
    }

    #[test]
    fn test_matching_geometry_keeps_declaration() {
        let faces = vec![face(3, 0.05, 0.1), face(1, 0.02, -0.12), face(2, 0.2, 0.0)];
        let result = sequencer().sequence(&faces, &declared(), &x_axis());
        assert_eq!(result.order, LayerOrder::Declared);
        assert_eq!(materials_and_ordinals(&result.layers), vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[test]
    fn test_reverse_geometry_is_flipped() {
        let faces = vec![face(1, 0.02, 0.12), face(2, 0.2, 0.0), face(3, 0.05, -0.1)];
        let result = sequencer().sequence(&faces, &declared(), &x_axis());
        assert_eq!(result.order, LayerOrder::Reversed);
        assert_eq!(materials_and_ordinals(&result.layers), vec![(3, 0), (2, 1), (1, 2)]);
        assert_eq!(result.layers[0].shape_aspect_name, "Insulation");
        assert_relative_eq!(result.layers[0].width, 0.05);
    }

    #[test]
    fn test_single_face_collapses_to_one_layer() {
        let faces = vec![face(2, 0.27, 0.0)];
        let result = sequencer().sequence(&faces, &declared(), &x_axis());
        assert_eq!(result.order, LayerOrder::SingleMaterial);
        assert_eq!(result.layers.len(), 1);
        assert_eq!(result.layers[0].base_material, MaterialId(1));
    }

    #[test]
    fn test_annotation_wins() {
        let mut faces = vec![face(9, 1.0, 5.0), face(9, 1.0, -5.0)];
        faces[0].layer_index = Some(2);
        faces[1].layer_index = Some(0);
        let result = sequencer().sequence(&faces, &declared(), &x_axis());
        assert_eq!(result.order, LayerOrder::Annotated);
        assert_eq!(result.layers.len(), 2);
        assert_eq!(result.layers[0].base_material, MaterialId(1));
        assert_eq!(result.layers[1].base_material, MaterialId(3));
    }

    #[test]
    fn test_curved_path_orders_by_radius() {
        let faces = vec![
            face(3, 0.05, 5.1),
            face(1, 0.02, 4.9),
            face(2, 0.2, 5.0),
        ];
        let path = LayerPath::Curved {
            center: Point2::origin(),
        };
        let faces: Vec<LayerFace> = faces
            .into_iter()
            .map(|mut f| {
                f.midpoint = Point3::new(0.0, f.midpoint.y, 0.0);
                f
            })
            .collect();
        let result = sequencer().sequence(&faces, &declared(), &path);
        assert_eq!(result.order, LayerOrder::Declared);
    }

    #[test]
    fn test_zero_width_layers_are_skipped() {
        let mut layers = declared();
        layers.insert(1, LayerDefinition::new(MaterialId(8), 0.0, "Membrane"));
        let result = sequencer().sequence(&[], &layers, &x_axis());
        assert_eq!(result.order, LayerOrder::Declared);
        assert_eq!(result.layers.len(), 3);
        assert!(layers_match_depth(&result.layers, 0.27, 1e-9));
    }

    #[test]
    fn test_dedup_names() {
        let names = dedup_names(
            ["Brick", "Brick", "Air", "Brick"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(names, vec!["Brick", "Brick 2", "Air", "Brick 3"]);
    }
}
