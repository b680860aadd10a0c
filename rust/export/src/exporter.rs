// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-element export pipeline
//!
//! Each element goes down a fallback chain: a clipped swept solid if the
//! classifier and resolver allow it, a tessellated BRep otherwise, and no
//! representation at all when neither works. One element's failure never
//! stops the batch.

use crate::classifier::{Classification, ExtrusionCandidate, FallbackReason, GeometryClassifier};
use crate::clipping::{ClippingResolver, ResolveOutcome};
use crate::config::ExportConfig;
use crate::element::{ElementId, HostElement, HostElementKind, LevelId, Neighbor, VerticalRange};
use crate::guid::{fragment_guid, IfcGuid};
use crate::kernel::GeometryKernel;
use crate::layers::{layers_match_depth, LayerOrder, LayerPath, LayerSequence, LayerSequencer};
use crate::registry::{ExportCaches, Registry};
use crate::representation::{
    EntityContext, EntityHandle, EntityWriter, Representation, SweptSolid, TrialScope,
};
use crate::splitter::{Fragment, LevelSplitter, PartOrGeometry};
use ifc_export_geometry::{BoundaryLoop, Mesh, Solid, Vector3};

/// One element to export
#[derive(Debug, Clone)]
pub struct ExportRequest<'r> {
    pub element: &'r HostElement,
    /// Candidate footprint in the element's frame
    pub footprint: &'r [BoundaryLoop],
    pub direction: Vector3<f64>,
    pub neighbors: &'r [Neighbor],
    /// Slice of the element to export, for split-by-level
    pub range: Option<VerticalRange>,
    pub level: Option<LevelId>,
}

impl<'r> ExportRequest<'r> {
    pub fn new(element: &'r HostElement, footprint: &'r [BoundaryLoop]) -> Self {
        Self {
            element,
            footprint,
            direction: Vector3::z(),
            neighbors: &[],
            range: None,
            level: element.level,
        }
    }

    pub fn with_neighbors(mut self, neighbors: &'r [Neighbor]) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn with_direction(mut self, direction: Vector3<f64>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_range(mut self, range: VerticalRange, level: LevelId) -> Self {
        self.range = Some(range);
        self.level = Some(level);
        self
    }

    fn context(&self) -> EntityContext {
        let uid = &self.element.unique_id;
        let guid = match (self.range, self.level) {
            (Some(_), Some(level)) => IfcGuid::derive(&format!("{}/level/{}", uid, level.0)),
            _ => IfcGuid::derive(uid),
        };
        EntityContext {
            element: self.element.id,
            guid,
            level: self.level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Element carries no geometry
    NothingToExport,
    /// The requested range or the neighbors remove everything
    CompletelyClipped,
    /// Every fallback failed
    NoUsableGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    SweptSolid {
        handle: EntityHandle,
        openings: Vec<EntityHandle>,
        layers: LayerSequence,
        expanded: bool,
    },
    Tessellated {
        handle: EntityHandle,
        reason: FallbackReason,
    },
    Skipped(SkipReason),
}

impl ExportOutcome {
    pub fn handle(&self) -> Option<EntityHandle> {
        match self {
            ExportOutcome::SweptSolid { handle, .. } | ExportOutcome::Tessellated { handle, .. } => {
                Some(*handle)
            }
            ExportOutcome::Skipped(_) => None,
        }
    }
}

/// Part or geometry fragment of a host, with its solid
#[derive(Debug, Clone, PartialEq)]
pub struct PartInput {
    pub source: PartOrGeometry,
    pub solid: Solid,
}

/// Fragment written on one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartExport {
    pub source: PartOrGeometry,
    pub level: LevelId,
    pub handle: EntityHandle,
    pub guid: IfcGuid,
}

pub struct ElementExporter<'a, K: GeometryKernel + ?Sized, W: EntityWriter + ?Sized> {
    config: &'a ExportConfig,
    kernel: &'a K,
    writer: &'a mut W,
}

impl<'a, K: GeometryKernel + ?Sized, W: EntityWriter + ?Sized> ElementExporter<'a, K, W> {
    pub fn new(config: &'a ExportConfig, kernel: &'a K, writer: &'a mut W) -> Self {
        Self {
            config,
            kernel,
            writer,
        }
    }

    /// Export one element, falling back from swept solid to BRep to nothing
    pub fn export_element(&mut self, request: &ExportRequest<'_>, caches: &mut ExportCaches) -> ExportOutcome {
        let element = request.element;
        let classifier = GeometryClassifier::new(self.config);

        let outcome = match classifier.classify(element, request.footprint, request.direction) {
            Classification::Brep(FallbackReason::NoGeometry) => {
                tracing::debug!(element = %element.id, "nothing to export");
                ExportOutcome::Skipped(SkipReason::NothingToExport)
            }
            Classification::Brep(reason) => self.export_brep(request, reason),
            Classification::Extrude(candidate) => match self.export_swept_solid(request, candidate) {
                Ok(outcome) => outcome,
                Err(reason) => {
                    tracing::debug!(element = %element.id, reason = %reason, "extrusion failed");
                    self.export_brep(request, reason)
                }
            },
        };

        if let Some(handle) = outcome.handle() {
            caches.handles.add(element.id, handle);
        }
        outcome
    }

    fn export_swept_solid(
        &mut self,
        request: &ExportRequest<'_>,
        mut candidate: ExtrusionCandidate,
    ) -> Result<ExportOutcome, FallbackReason> {
        let element = request.element;
        let resolver = ClippingResolver::new(self.kernel, self.config);
        let context = request.context();
        let layers = self.sequence_layers(element);

        loop {
            let mut scope = TrialScope::new(&mut *self.writer);
            let outcome = resolver
                .resolve(element, &candidate, request.neighbors, request.range)
                .map_err(|e| FallbackReason::Geometry(e.to_string()))?;

            let result = match outcome {
                ResolveOutcome::RollBack if candidate.is_expanded() => {
                    scope.rollback();
                    candidate = candidate.without_expansion();
                    continue;
                }
                ResolveOutcome::RollBack => {
                    return Err(FallbackReason::Geometry(
                        "rollback requested without expansion".to_string(),
                    ))
                }
                ResolveOutcome::AbandonToBrep(reason) => return Err(reason),
                ResolveOutcome::Resolved(result) if result.is_completely_clipped => {
                    return Ok(ExportOutcome::Skipped(SkipReason::CompletelyClipped))
                }
                ResolveOutcome::Resolved(result) => result,
            };

            let mut openings = Vec::with_capacity(result.subtracted_openings.len());
            for solid in &result.subtracted_openings {
                let handle = scope.write(&context, &Representation::Opening { solid: solid.clone() });
                if handle.is_null() {
                    return Err(FallbackReason::WriterRejected);
                }
                openings.push(handle);
            }

            let bounds = result.base_solid.bounds();
            let swept = SweptSolid {
                footprint: candidate.footprint.clone(),
                direction: candidate.direction,
                depth: bounds.height(),
                base_elevation: bounds.min.z,
                clipped: result.clipped_solid,
                openings: openings.clone(),
                layers: layers.layers.clone(),
            };
            let handle = scope.write(&context, &Representation::SweptSolid(swept));
            if handle.is_null() {
                return Err(FallbackReason::WriterRejected);
            }
            scope.commit();

            return Ok(ExportOutcome::SweptSolid {
                handle,
                openings,
                layers,
                expanded: candidate.is_expanded(),
            });
        }
    }

    fn export_brep(&mut self, request: &ExportRequest<'_>, reason: FallbackReason) -> ExportOutcome {
        let element = request.element;
        let range = request.range;
        let mut mesh = Mesh::new();
        let mut in_range = false;

        for solid in &element.solids {
            let solid = match range {
                Some(r) => solid.slice(r.start, r.end),
                None => solid.clone(),
            };
            if solid.is_empty() {
                continue;
            }
            in_range = true;
            match self.kernel.tessellate(&solid) {
                Ok(part) => mesh.merge(&part),
                Err(error) => {
                    tracing::warn!(element = %element.id, error = %error, "tessellation failed");
                }
            }
        }
        for part in &element.meshes {
            let reaches = match range {
                Some(r) => VerticalRange::of_bounds(&part.bounds())
                    .is_some_and(|span| span.intersection(&r).is_some()),
                None => !part.is_empty(),
            };
            if reaches {
                in_range = true;
                mesh.merge(part);
            }
        }

        if mesh.is_empty() {
            return if range.is_some() && !in_range {
                ExportOutcome::Skipped(SkipReason::CompletelyClipped)
            } else {
                tracing::warn!(element = %element.id, "no usable geometry for any representation");
                ExportOutcome::Skipped(SkipReason::NoUsableGeometry)
            };
        }

        let handle = self
            .writer
            .write(&request.context(), &Representation::Tessellated { mesh });
        if handle.is_null() {
            tracing::warn!(element = %element.id, "entity writer rejected BRep");
            return ExportOutcome::Skipped(SkipReason::NoUsableGeometry);
        }
        ExportOutcome::Tessellated { handle, reason }
    }

    fn sequence_layers(&self, element: &HostElement) -> LayerSequence {
        let path = match &element.kind {
            HostElementKind::Wall(wall) => LayerPath::from_axis(&wall.axis),
            HostElementKind::Floor(_) | HostElementKind::Roof(_) => Some(LayerPath::Vertical),
            _ => None,
        };
        let Some(path) = path else {
            return LayerSequence {
                layers: Vec::new(),
                order: LayerOrder::Empty,
            };
        };

        let sequence = LayerSequencer::new(self.config).sequence(&element.layer_faces, &element.layers, &path);
        if let Some(thickness) = element.kind.layered_thickness() {
            let checked = !matches!(sequence.order, LayerOrder::Empty | LayerOrder::SingleMaterial);
            if checked && !layers_match_depth(&sequence.layers, thickness, self.config.layer_width_tolerance) {
                tracing::warn!(
                    element = %element.id,
                    layers = sequence.total_width(),
                    thickness,
                    "material layers do not add up to the element thickness"
                );
            }
        }
        sequence
    }

    /// Export the parts of `host` level by level, each at most once per level
    pub fn export_parts(
        &mut self,
        host: &HostElement,
        parts: &[PartInput],
        splitter: &LevelSplitter,
        caches: &mut ExportCaches,
    ) -> Vec<PartExport> {
        let Some(host_span) = host.span() else {
            tracing::debug!(host = %host.id, "host has no geometry to split");
            return Vec::new();
        };

        let fragments: Vec<Fragment> = parts
            .iter()
            .filter_map(|p| {
                VerticalRange::of_bounds(&p.solid.bounds()).map(|span| Fragment {
                    source: p.source,
                    span,
                })
            })
            .collect();
        let split = splitter.split(host.id, &host_span, &fragments, &mut caches.splits);

        for dummy in &split.dummy_hosts {
            let key = (host.id, dummy.level);
            if caches.dummy_hosts.contains(&key) {
                continue;
            }
            let context = EntityContext {
                element: host.id,
                guid: IfcGuid::derive(&format!("{}/container/{}", host.unique_id, dummy.level.0)),
                level: Some(dummy.level),
            };
            let handle = self
                .writer
                .write(&context, &Representation::Placeholder { range: dummy.range });
            if !handle.is_null() {
                caches.dummy_hosts.register(key, handle);
            }
        }

        let mut exported = Vec::new();
        for (level, entries) in &split.by_level {
            for (fragment, range) in entries {
                let key = (fragment.source, *level);
                if caches.exported_parts.contains(&key) {
                    continue;
                }
                let Some(part) = parts.iter().find(|p| p.source == fragment.source) else {
                    continue;
                };
                let slice = part.solid.slice(range.start, range.end);
                if slice.is_empty() {
                    continue;
                }
                let mesh = match self.kernel.tessellate(&slice) {
                    Ok(mesh) => mesh,
                    Err(error) => {
                        tracing::warn!(host = %host.id, level = %level, error = %error, "skipping part fragment");
                        continue;
                    }
                };

                let spans_levels = split.levels_of(&fragment.source).len() > 1;
                let guid = fragment_guid(&host.unique_id, &fragment.source, spans_levels.then_some(*level));
                let context = EntityContext {
                    element: fragment_element(&fragment.source),
                    guid,
                    level: Some(*level),
                };
                let handle = self.writer.write(&context, &Representation::Tessellated { mesh });
                if handle.is_null() {
                    tracing::warn!(host = %host.id, level = %level, "entity writer rejected part");
                    continue;
                }
                caches.exported_parts.register(key, handle);
                exported.push(PartExport {
                    source: fragment.source,
                    level: *level,
                    handle,
                    guid,
                });
            }
        }
        exported
    }
}

fn fragment_element(source: &PartOrGeometry) -> ElementId {
    match source {
        PartOrGeometry::Part(id) => *id,
        PartOrGeometry::Geometry { host, .. } => *host,
    }
}
