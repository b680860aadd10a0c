// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use ifc_export_core::{
    Classification, ElementExporter, ElementId, ExportCaches, ExportConfig, ExportOutcome,
    ExportRequest, FallbackReason, GeometryClassifier, HostElement, HostElementKind, LayerDefinition,
    LayerFace, LayerOrder, LevelId, MaterialId, MemoryWriter, Neighbor, NeighborRelation, Opening,
    PrismKernel, Registry, RepresentationKind, SkipReason, VerticalRange, WallGeometry,
};
use ifc_export_geometry::{BoundaryLoop, Curve2D, Point2, Point3, Solid, Vector3};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// Straight wall along +X, centred on the axis, 3 m tall
fn straight_wall(id: u64, length: f64, width: f64) -> HostElement {
    let h = width / 2.0;
    HostElement::new(
        ElementId(id),
        format!("wall-{}", id),
        HostElementKind::Wall(WallGeometry::new(
            Curve2D::line(Point2::new(0.0, 0.0), Point2::new(length, 0.0)),
            width,
        )),
    )
    .with_solid(Solid::prism(&rect(0.0, -h, length, h), 0.0, 3.0).unwrap())
}

/// 2.5 m wall with a 1.2 m door from 0 to 2.1 m
fn wall_with_door() -> (HostElement, Vec<BoundaryLoop>) {
    let host = Solid::prism(&rect(0.0, -0.1, 2.5, 0.1), 0.0, 3.0)
        .unwrap()
        .subtract(&Solid::prism(&rect(0.5, -0.2, 1.7, 0.2), 0.0, 2.1).unwrap())
        .unwrap();
    let element = HostElement::new(
        ElementId(20),
        "wall-20",
        HostElementKind::Wall(WallGeometry::new(
            Curve2D::line(Point2::new(0.0, 0.0), Point2::new(2.5, 0.0)),
            0.2,
        )),
    )
    .with_solid(host)
    .with_opening(Opening {
        id: ElementId(21),
        footprint: BoundaryLoop::from_points(&rect(0.5, -0.1, 1.7, 0.1)),
        range: VerticalRange::new(0.0, 2.1),
    });
    let footprint = vec![
        BoundaryLoop::from_points(&rect(0.0, -0.1, 0.5, 0.1)),
        BoundaryLoop::from_points(&rect(1.7, -0.1, 2.5, 0.1)),
    ];
    (element, footprint)
}

#[test]
fn test_clockwise_footprint_is_normalized() {
    let config = ExportConfig::default();
    let element = straight_wall(1, 5.0, 0.2);
    let mut clockwise = rect(0.0, -0.1, 5.0, 0.1);
    clockwise.reverse();
    let input = BoundaryLoop::from_points(&clockwise);
    assert!(!input.is_ccw(config.arc_tolerance));

    match GeometryClassifier::new(&config).classify(&element, &[input], Vector3::z()) {
        Classification::Extrude(candidate) => {
            assert!(candidate.footprint[0].is_ccw(config.arc_tolerance));
            assert_relative_eq!(
                candidate.footprint[0].signed_area(config.arc_tolerance),
                1.0,
                epsilon = 1e-9
            );
        }
        other => panic!("expected extrusion, got {:?}", other),
    }
}

#[test]
fn test_rectangular_wall_area_is_width_times_length() {
    let config = ExportConfig::default();
    for (length, width) in [(5.0, 0.2), (12.0, 0.3), (3.0, 0.1)] {
        let element = straight_wall(1, length, width);
        let h = width / 2.0;
        let footprint = [BoundaryLoop::from_points(&rect(0.0, -h, length, h))];
        match GeometryClassifier::new(&config).classify(&element, &footprint, Vector3::z()) {
            Classification::Extrude(candidate) => {
                assert!(!candidate.is_expanded());
                assert_relative_eq!(
                    candidate.footprint_region(config.arc_tolerance).area(),
                    width * length,
                    epsilon = 1e-9
                );
            }
            other => panic!("expected extrusion, got {:?}", other),
        }
    }
}

#[test]
fn test_slice_above_geometry_writes_nothing() {
    let config = ExportConfig::default();
    let element = straight_wall(1, 5.0, 0.2);
    let footprint = [BoundaryLoop::from_points(&rect(0.0, -0.1, 5.0, 0.1))];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint).with_range(VerticalRange::new(6.0, 9.0), LevelId(3));
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::CompletelyClipped));
    assert!(writer.is_empty());
    assert!(caches.handles.is_empty());
}

#[test]
fn test_plain_wall_exports_swept_solid() {
    let config = ExportConfig::default();
    let element = straight_wall(1, 5.0, 0.2);
    let footprint = [BoundaryLoop::from_points(&rect(0.0, -0.1, 5.0, 0.1))];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    match outcome {
        ExportOutcome::SweptSolid {
            handle,
            openings,
            expanded,
            ..
        } => {
            assert!(openings.is_empty());
            assert!(!expanded);
            assert_eq!(caches.handles.find(&ElementId(1)), Some(&handle));
        }
        other => panic!("expected swept solid, got {:?}", other),
    }
    assert_eq!(writer.count(RepresentationKind::SweptSolid), 1);
}

#[test]
fn test_door_opening_survives_expansion() {
    let config = ExportConfig::default();
    let (element, footprint) = wall_with_door();
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    match outcome {
        ExportOutcome::SweptSolid {
            openings, expanded, ..
        } => {
            assert!(expanded);
            assert_eq!(openings.len(), 1);
        }
        other => panic!("expected swept solid, got {:?}", other),
    }
    assert_eq!(writer.count(RepresentationKind::Opening), 1);
    assert_eq!(writer.count(RepresentationKind::SweptSolid), 1);
}

#[test]
fn test_expansion_without_openings_rolls_back() {
    let config = ExportConfig::default();
    // Same notched footprint, but the host geometry itself is solid
    let (mut element, footprint) = wall_with_door();
    element.solids = vec![Solid::prism(&rect(0.0, -0.1, 2.5, 0.1), 0.0, 3.0).unwrap()];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    match outcome {
        ExportOutcome::SweptSolid {
            openings, expanded, ..
        } => {
            assert!(!expanded);
            assert!(openings.is_empty());
        }
        other => panic!("expected swept solid, got {:?}", other),
    }
    match &writer.entities().next().unwrap().1.representation {
        ifc_export_core::Representation::SweptSolid(swept) => assert_eq!(swept.footprint.len(), 2),
        other => panic!("unexpected representation {:?}", other),
    };
}

#[test]
fn test_rejected_swept_solid_rolls_back_openings() {
    let config = ExportConfig::default();
    let (element, footprint) = wall_with_door();
    let mut writer = MemoryWriter::new().rejecting(RepresentationKind::SweptSolid);
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    assert!(matches!(
        outcome,
        ExportOutcome::Tessellated {
            reason: FallbackReason::WriterRejected,
            ..
        }
    ));
    assert_eq!(writer.discarded(), 1);
    assert_eq!(writer.count(RepresentationKind::Opening), 0);
    assert_eq!(writer.count(RepresentationKind::Tessellated), 1);
}

#[test]
fn test_opening_on_floor_clip_falls_back_to_brep() {
    let config = ExportConfig::default();
    let (element, footprint) = wall_with_door();
    let floor = [Neighbor::new(
        ElementId(30),
        NeighborRelation::FloorClip,
        Solid::prism(&rect(-1.0, -2.0, 4.0, 2.0), -0.3, 0.0).unwrap(),
    )];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint).with_neighbors(&floor);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    match outcome {
        ExportOutcome::Tessellated { reason, .. } => {
            assert_eq!(reason, FallbackReason::OpeningNearFloorClip(ElementId(30)));
        }
        other => panic!("expected BRep, got {:?}", other),
    }
    assert_eq!(writer.count(RepresentationKind::Opening), 0);
}

#[test]
fn test_joined_wall_is_clipped() {
    let config = ExportConfig::default();
    let element = straight_wall(1, 5.0, 0.2);
    let footprint = [BoundaryLoop::from_points(&rect(0.0, -0.1, 5.0, 0.1))];
    let joined = [Neighbor::new(
        ElementId(2),
        NeighborRelation::Connected,
        Solid::prism(&rect(4.8, -3.0, 5.2, 3.0), 0.0, 3.0).unwrap(),
    )];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint).with_neighbors(&joined);
    let handle = ElementExporter::new(&config, &PrismKernel, &mut writer)
        .export_element(&request, &mut caches)
        .handle()
        .unwrap();

    match &writer.get(handle).unwrap().representation {
        ifc_export_core::Representation::SweptSolid(swept) => {
            assert_relative_eq!(swept.clipped.volume(), 4.8 * 0.2 * 3.0, epsilon = 1e-9);
        }
        other => panic!("unexpected representation {:?}", other),
    }
}

#[test]
fn test_single_face_collapses_layers() {
    let config = ExportConfig::default();
    let element = straight_wall(1, 5.0, 0.27)
        .with_layers(vec![
            LayerDefinition::new(MaterialId(1), 0.02, "Plaster"),
            LayerDefinition::new(MaterialId(2), 0.2, "Concrete"),
            LayerDefinition::new(MaterialId(3), 0.05, "Insulation"),
        ])
        .with_layer_faces(vec![LayerFace {
            material: MaterialId(2),
            width: 0.27,
            midpoint: Point3::new(2.5, 0.0, 3.0),
            layer_index: None,
        }]);
    let footprint = [BoundaryLoop::from_points(&rect(0.0, -0.135, 5.0, 0.135))];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let request = ExportRequest::new(&element, &footprint);
    let outcome = ElementExporter::new(&config, &PrismKernel, &mut writer).export_element(&request, &mut caches);

    match outcome {
        ExportOutcome::SweptSolid { layers, .. } => {
            assert_eq!(layers.order, LayerOrder::SingleMaterial);
            assert_eq!(layers.layers.len(), 1);
            assert_eq!(layers.layers[0].base_material, MaterialId(1));
            assert_eq!(layers.layers[0].shape_aspect_name, "Plaster");
        }
        other => panic!("expected swept solid, got {:?}", other),
    }
}

#[test]
fn test_stairs_and_empty_elements() {
    let config = ExportConfig::default();
    let stair = HostElement::new(ElementId(40), "stair-40", HostElementKind::Stair)
        .with_solid(Solid::prism(&rect(0.0, 0.0, 1.0, 3.0), 0.0, 3.0).unwrap());
    let empty = HostElement::new(ElementId(41), "stair-41", HostElementKind::Stair);
    let footprint = [BoundaryLoop::from_points(&rect(0.0, 0.0, 1.0, 3.0))];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();
    let mut exporter = ElementExporter::new(&config, &PrismKernel, &mut writer);

    let outcome = exporter.export_element(&ExportRequest::new(&stair, &footprint), &mut caches);
    assert!(matches!(
        outcome,
        ExportOutcome::Tessellated {
            reason: FallbackReason::UnsupportedCategory("stair"),
            ..
        }
    ));

    let outcome = exporter.export_element(&ExportRequest::new(&empty, &footprint), &mut caches);
    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::NothingToExport));
    assert_eq!(caches.handles.len(), 1);
}
