// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Injected key-value registries for process-wide export state

use crate::element::{ElementId, LevelId};
use crate::representation::EntityHandle;
use crate::splitter::{PartOrGeometry, SplitResult};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Key-value store shared across one export pass
pub trait Registry<K, V> {
    fn find(&self, key: &K) -> Option<&V>;

    /// Insert only if absent; returns `false` when the key already existed
    fn register(&mut self, key: K, value: V) -> bool;

    /// Insert or replace, returning the previous value
    fn add(&mut self, key: K, value: V) -> Option<V>;

    fn len(&self) -> usize;

    fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory registry backed by `FxHashMap`
#[derive(Debug, Clone)]
pub struct MemoryRegistry<K, V> {
    entries: FxHashMap<K, V>,
}

impl<K, V> Default for MemoryRegistry<K, V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> MemoryRegistry<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K: Eq + Hash, V> Registry<K, V> for MemoryRegistry<K, V> {
    fn find(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn register(&mut self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    fn add(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Registries used by [`crate::exporter::ElementExporter`]
#[derive(Debug, Default)]
pub struct ExportCaches {
    /// Latest representation handle written per element
    pub handles: MemoryRegistry<ElementId, EntityHandle>,
    /// Level split per host
    pub splits: MemoryRegistry<ElementId, SplitResult>,
    /// Exported fragments, at most one per (fragment, level)
    pub exported_parts: MemoryRegistry<(PartOrGeometry, LevelId), EntityHandle>,
    /// Placeholder hosts for orphan levels
    pub dummy_hosts: MemoryRegistry<(ElementId, LevelId), EntityHandle>,
}

impl ExportCaches {
    pub fn new() -> Self {
        Self::default()
    }
}
