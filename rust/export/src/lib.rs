// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Export Core
//!
//! Decides, element by element, whether host geometry is written as a
//! clipped swept solid or falls back to a tessellated boundary
//! representation, and builds everything the writer needs for either:
//! footprint loops, clipping, openings, material layers and level splits.
//!
//! ```text
//! classifier ──▶ clipping ──▶ layers ──▶ EntityWriter
//!      │ (BRep)                              ▲
//!      └────────────────▶ tessellation ──────┘
//! splitter ──▶ parts by level
//! stairs   ──▶ stair shape
//! ```
//!
//! Registries, the geometry kernel and the entity writer are injected, so
//! every stage can run without a live document.

pub mod classifier;
pub mod clipping;
pub mod config;
pub mod element;
pub mod error;
pub mod exporter;
pub mod guid;
pub mod kernel;
pub mod layers;
pub mod registry;
pub mod representation;
pub mod splitter;
pub mod stairs;

pub use classifier::{Classification, ExtrusionCandidate, FallbackReason, GeometryClassifier};
pub use clipping::{ClippingResolver, ClippingResult, ResolveOutcome};
pub use config::{ExportConfig, IfcSchemaVersion};
pub use element::{
    CrossSection, ElementId, HostElement, HostElementKind, LevelId, MaterialId, Neighbor,
    NeighborRelation, Opening, SlabGeometry, VerticalRange, WallGeometry,
};
pub use error::{ExportError, Result};
pub use exporter::{ElementExporter, ExportOutcome, ExportRequest, PartExport, PartInput, SkipReason};
pub use guid::IfcGuid;
pub use kernel::{GeometryKernel, PrismKernel};
pub use layers::{
    LayerDefinition, LayerFace, LayerOrder, LayerPath, LayerSequence, LayerSequencer, MaterialLayer,
};
pub use registry::{ExportCaches, MemoryRegistry, Registry};
pub use representation::{
    EntityContext, EntityHandle, EntityWriter, MemoryWriter, Representation, RepresentationKind,
    SweptSolid, TrialScope,
};
pub use splitter::{Fragment, Level, LevelRange, LevelSplitter, PartOrGeometry, SplitResult};
pub use stairs::{
    classify_stair, FlightStyle, StairClassification, StairFlightDescriptor, StairShape,
};
