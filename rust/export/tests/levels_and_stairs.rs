// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ifc_export_core::{
    classify_stair, ElementExporter, ElementId, ExportCaches, ExportConfig, FlightStyle, Fragment,
    HostElement, HostElementKind, Level, LevelId, LevelSplitter, MemoryRegistry, MemoryWriter,
    PartInput, PartOrGeometry, PrismKernel, Registry, RepresentationKind, SplitResult, StairFlightDescriptor,
    StairShape, VerticalRange, WallGeometry,
};
use ifc_export_geometry::{Curve2D, Point2, Solid};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

fn three_levels() -> LevelSplitter {
    LevelSplitter::new(
        vec![
            Level::new(LevelId(1), 0.0),
            Level::new(LevelId(2), 3.0),
            Level::new(LevelId(3), 6.0),
        ],
        &ExportConfig::default(),
    )
    .unwrap()
}

fn tall_wall(height: f64) -> HostElement {
    HostElement::new(
        ElementId(1),
        "wall-1",
        HostElementKind::Wall(WallGeometry::new(
            Curve2D::line(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0)),
            0.2,
        )),
    )
    .with_solid(Solid::prism(&rect(0.0, -0.1, 4.0, 0.1), 0.0, height).unwrap())
}

fn part(id: u64, y0: f64, y1: f64, z0: f64, z1: f64) -> PartInput {
    PartInput {
        source: PartOrGeometry::Part(ElementId(id)),
        solid: Solid::prism(&rect(0.0, y0, 4.0, y1), z0, z1).unwrap(),
    }
}

#[test]
fn test_split_twice_is_identical() {
    let splitter = three_levels();
    let fragments = [
        Fragment {
            source: PartOrGeometry::Part(ElementId(101)),
            span: VerticalRange::new(0.0, 9.0),
        },
        Fragment {
            source: PartOrGeometry::Part(ElementId(102)),
            span: VerticalRange::new(2.0, 7.0),
        },
    ];
    let host_span = VerticalRange::new(0.0, 9.0);
    let mut registry: MemoryRegistry<ElementId, SplitResult> = MemoryRegistry::new();

    let first = splitter.split(ElementId(1), &host_span, &fragments, &mut registry);
    let second = splitter.split(ElementId(1), &host_span, &fragments, &mut registry);

    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
    assert_eq!(first.by_level.len(), 3);
    for entries in first.by_level.values() {
        assert_eq!(entries.len(), 2);
    }
    assert!(first.orphan_levels.is_empty());
}

#[test]
fn test_parts_export_once_per_level() {
    let config = ExportConfig::default();
    let splitter = three_levels();
    let host = tall_wall(9.0);
    let parts = [part(101, -0.1, 0.0, 0.0, 9.0), part(102, 0.0, 0.1, 2.0, 7.0)];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let first = ElementExporter::new(&config, &PrismKernel, &mut writer)
        .export_parts(&host, &parts, &splitter, &mut caches);
    assert_eq!(first.len(), 6);
    assert_eq!(writer.len(), 6);

    let mut guids: Vec<_> = first.iter().map(|p| p.guid).collect();
    guids.sort();
    guids.dedup();
    assert_eq!(guids.len(), 6);

    let second = ElementExporter::new(&config, &PrismKernel, &mut writer)
        .export_parts(&host, &parts, &splitter, &mut caches);
    assert!(second.is_empty());
    assert_eq!(writer.len(), 6);
    assert_eq!(caches.exported_parts.len(), 6);
}

#[test]
fn test_orphan_part_gets_a_container() {
    let config = ExportConfig::default();
    let splitter = three_levels();
    let host = tall_wall(3.0);
    let parts = [part(101, -0.1, 0.1, 0.0, 3.0), part(102, -0.1, 0.1, 6.5, 8.0)];
    let mut writer = MemoryWriter::new();
    let mut caches = ExportCaches::new();

    let exported = ElementExporter::new(&config, &PrismKernel, &mut writer)
        .export_parts(&host, &parts, &splitter, &mut caches);

    let orphan = exported
        .iter()
        .find(|p| p.source == PartOrGeometry::Part(ElementId(102)))
        .unwrap();
    assert_eq!(orphan.level, LevelId(3));
    assert_eq!(writer.count(RepresentationKind::Placeholder), 1);
    assert!(caches.dummy_hosts.contains(&(ElementId(1), LevelId(3))));

    ElementExporter::new(&config, &PrismKernel, &mut writer).export_parts(&host, &parts, &splitter, &mut caches);
    assert_eq!(writer.count(RepresentationKind::Placeholder), 1);
}

#[test]
fn test_orphan_level_is_highest_at_or_below_minimum() {
    let splitter = three_levels();
    let host_span = VerticalRange::new(0.0, 3.0);
    let cases = [
        (3.5, 5.0, LevelId(2)),
        (2.995, 4.0, LevelId(2)),
        (6.0, 7.0, LevelId(3)),
        (12.0, 13.0, LevelId(3)),
    ];
    for (index, (start, end, expected)) in cases.into_iter().enumerate() {
        let fragment = Fragment {
            source: PartOrGeometry::Geometry {
                host: ElementId(1),
                index,
            },
            span: VerticalRange::new(start, end),
        };
        let mut registry: MemoryRegistry<ElementId, SplitResult> = MemoryRegistry::new();
        let result = splitter.split(ElementId(1), &host_span, &[fragment], &mut registry);
        assert_eq!(result.levels_of(&fragment.source), vec![expected], "fragment {}..{}", start, end);
        assert_eq!(splitter.level_at_or_below(start), expected);
        assert!(result.orphan_levels.contains(&expected));
    }
}

#[test]
fn test_fragment_below_every_level_uses_lowest() {
    let splitter = three_levels();
    assert_eq!(splitter.level_at_or_below(-4.0), LevelId(1));
}

fn flight(from: (f64, f64), to: (f64, f64), elevation: f64) -> StairFlightDescriptor {
    StairFlightDescriptor::new(
        FlightStyle::Straight,
        vec![Curve2D::line(Point2::new(from.0, from.1), Point2::new(to.0, to.1))],
        elevation,
    )
}

fn shape(flights: &[StairFlightDescriptor], landings: usize, winders: usize) -> String {
    classify_stair(flights, landings, winders, None, &ExportConfig::default())
        .shape
        .to_string()
}

#[test]
fn test_straight_run_stair() {
    let flights = [flight((0.0, 0.0), (4.0, 0.0), 0.0)];
    assert_eq!(shape(&flights, 0, 0), "straight run stair");
}

#[test]
fn test_quarter_turn_stair() {
    let flights = [flight((0.0, 0.0), (3.0, 0.0), 0.0), flight((4.0, 1.0), (4.0, 4.0), 1.5)];
    assert_eq!(shape(&flights, 1, 0), "quarter turn stair");
}

#[test]
fn test_half_turn_stair() {
    let flights = [flight((0.0, 0.0), (3.0, 0.0), 0.0), flight((3.0, 1.2), (0.0, 1.2), 1.5)];
    assert_eq!(shape(&flights, 1, 0), "half turn stair");
}

#[test]
fn test_three_quarter_turn_stair() {
    let flights = [
        flight((0.0, 0.0), (3.0, 0.0), 0.0),
        flight((4.0, 1.0), (4.0, 3.0), 1.0),
        flight((3.0, 4.0), (1.0, 4.0), 2.0),
        flight((0.0, 3.0), (0.0, 1.5), 3.0),
    ];
    assert_eq!(shape(&flights, 3, 0), "three-quarter turn stair");
}

#[test]
fn test_spiral_wins_over_everything() {
    let spiral = StairFlightDescriptor::new(
        FlightStyle::Spiral,
        vec![Curve2D::arc(Point2::origin(), 1.5, 0.0, 3.0)],
        0.0,
    );
    let flights = [
        flight((0.0, 0.0), (3.0, 0.0), 0.0),
        spiral,
        flight((4.0, 1.0), (4.0, 4.0), 1.5),
    ];
    let result = classify_stair(&flights, 1, 0, None, &ExportConfig::default());
    assert_eq!(result.shape, StairShape::Spiral);
    assert_eq!(result.shape.to_string(), "spiral stair");
}
