// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity writer seam and the rollback scope for trial extrusions

use crate::element::{ElementId, LevelId, VerticalRange};
use crate::guid::IfcGuid;
use crate::layers::MaterialLayer;
use ifc_export_geometry::{BoundaryLoop, Mesh, Solid, Vector3};
use std::collections::BTreeMap;

/// Opaque handle into the entity graph; the null handle signals failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub const NULL: EntityHandle = EntityHandle(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Extruded area solid with its clipping and layer data
#[derive(Debug, Clone, PartialEq)]
pub struct SweptSolid {
    /// Counter-clockwise loops, outer boundary first
    pub footprint: Vec<BoundaryLoop>,
    pub direction: Vector3<f64>,
    pub depth: f64,
    pub base_elevation: f64,
    /// Extrusion after neighbor clipping
    pub clipped: Solid,
    /// Opening entities voiding this solid
    pub openings: Vec<EntityHandle>,
    pub layers: Vec<MaterialLayer>,
}

/// Finalized representation handed to the writer
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    SweptSolid(SweptSolid),
    Tessellated { mesh: Mesh },
    Opening { solid: Solid },
    /// Container for fragments on levels the host never reaches
    Placeholder { range: VerticalRange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    SweptSolid,
    Tessellated,
    Opening,
    Placeholder,
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Representation::SweptSolid(_) => RepresentationKind::SweptSolid,
            Representation::Tessellated { .. } => RepresentationKind::Tessellated,
            Representation::Opening { .. } => RepresentationKind::Opening,
            Representation::Placeholder { .. } => RepresentationKind::Placeholder,
        }
    }
}

/// Identity attached to a written entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityContext {
    pub element: ElementId,
    pub guid: IfcGuid,
    pub level: Option<LevelId>,
}

/// Entity graph writer
pub trait EntityWriter {
    /// Write a finalized representation; returns [`EntityHandle::NULL`] on failure
    fn write(&mut self, context: &EntityContext, representation: &Representation) -> EntityHandle;

    /// Remove an entity written earlier
    fn discard(&mut self, handle: EntityHandle);
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenEntity {
    pub context: EntityContext,
    pub representation: Representation,
}

/// Writer that keeps entities in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    next: u64,
    entities: BTreeMap<EntityHandle, WrittenEntity>,
    rejected: Vec<RepresentationKind>,
    discarded: usize,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return null handles for every representation of `kind`
    pub fn rejecting(mut self, kind: RepresentationKind) -> Self {
        self.rejected.push(kind);
        self
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&WrittenEntity> {
        self.entities.get(&handle)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&EntityHandle, &WrittenEntity)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn count(&self, kind: RepresentationKind) -> usize {
        self.entities
            .values()
            .filter(|e| e.representation.kind() == kind)
            .count()
    }

    /// Number of entities removed through [`EntityWriter::discard`]
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl EntityWriter for MemoryWriter {
    fn write(&mut self, context: &EntityContext, representation: &Representation) -> EntityHandle {
        if self.rejected.contains(&representation.kind()) {
            return EntityHandle::NULL;
        }
        self.next += 1;
        let handle = EntityHandle(self.next);
        self.entities.insert(
            handle,
            WrittenEntity {
                context: *context,
                representation: representation.clone(),
            },
        );
        handle
    }

    fn discard(&mut self, handle: EntityHandle) {
        if self.entities.remove(&handle).is_some() {
            self.discarded += 1;
        }
    }
}

/// Rollback scope around a speculative export attempt
///
/// Every handle written through the scope is discarded again unless the
/// scope is committed. Dropping the scope rolls back.
pub struct TrialScope<'w, W: EntityWriter + ?Sized> {
    writer: &'w mut W,
    created: Vec<EntityHandle>,
    open: bool,
}

impl<'w, W: EntityWriter + ?Sized> TrialScope<'w, W> {
    pub fn new(writer: &'w mut W) -> Self {
        Self {
            writer,
            created: Vec::new(),
            open: true,
        }
    }

    pub fn write(&mut self, context: &EntityContext, representation: &Representation) -> EntityHandle {
        let handle = self.writer.write(context, representation);
        if !handle.is_null() {
            self.created.push(handle);
        }
        handle
    }

    pub fn created(&self) -> &[EntityHandle] {
        &self.created
    }

    /// Keep everything written so far
    pub fn commit(mut self) -> Vec<EntityHandle> {
        self.open = false;
        std::mem::take(&mut self.created)
    }

    pub fn rollback(self) {}
}

impl<W: EntityWriter + ?Sized> Drop for TrialScope<'_, W> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if !self.created.is_empty() {
            tracing::debug!(count = self.created.len(), "rolling back trial entities");
        }
        for handle in self.created.drain(..).rev() {
            self.writer.discard(handle);
        }
    }
}
