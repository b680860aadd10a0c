// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Split hosts and their fragments by building level

use crate::config::ExportConfig;
use crate::element::{ElementId, LevelId, VerticalRange};
use crate::error::{ExportError, Result};
use crate::registry::Registry;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// A persistent part, or a transient geometry fragment of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartOrGeometry {
    Part(ElementId),
    Geometry { host: ElementId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub id: LevelId,
    pub elevation: f64,
}

impl Level {
    pub fn new(id: LevelId, elevation: f64) -> Self {
        Self { id, elevation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelRange {
    pub level: LevelId,
    pub range: VerticalRange,
}

/// Fragment to place, with its vertical extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub source: PartOrGeometry,
    pub span: VerticalRange,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitResult {
    /// Host ranges, bottom to top
    pub host_ranges: Vec<LevelRange>,
    /// Fragments and the slice of each that belongs to a level
    pub by_level: BTreeMap<LevelId, Vec<(Fragment, VerticalRange)>>,
    /// Levels reached by fragments but not by the host
    pub orphan_levels: BTreeSet<LevelId>,
    /// Placeholder hosts, one per orphan level
    pub dummy_hosts: Vec<LevelRange>,
}

impl SplitResult {
    /// Levels a fragment was assigned to
    pub fn levels_of(&self, source: &PartOrGeometry) -> Vec<LevelId> {
        self.by_level
            .iter()
            .filter(|(_, entries)| entries.iter().any(|(f, _)| f.source == *source))
            .map(|(level, _)| *level)
            .collect()
    }
}

pub struct LevelSplitter {
    /// Sorted by elevation
    levels: Vec<Level>,
    tolerance: f64,
}

impl LevelSplitter {
    pub fn new(mut levels: Vec<Level>, config: &ExportConfig) -> Result<Self> {
        if levels.is_empty() {
            return Err(ExportError::NoLevels);
        }
        if let Some(level) = levels.iter().find(|l| !l.elevation.is_finite()) {
            return Err(ExportError::InvalidInput(format!(
                "level {} has a non-finite elevation",
                level.id
            )));
        }
        levels.sort_by(|a, b| a.elevation.partial_cmp(&b.elevation).unwrap_or(Ordering::Equal));
        Ok(Self {
            levels,
            tolerance: config.level_extension_tolerance,
        })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Elevation band owned by each level
    ///
    /// The lowest level also owns everything below it and the highest
    /// everything above.
    fn bands(&self) -> impl Iterator<Item = LevelRange> + '_ {
        let last = self.levels.len() - 1;
        self.levels.iter().enumerate().map(move |(i, level)| LevelRange {
            level: level.id,
            range: VerticalRange::new(
                if i == 0 { f64::NEG_INFINITY } else { level.elevation },
                if i == last {
                    f64::INFINITY
                } else {
                    self.levels[i + 1].elevation
                },
            ),
        })
    }

    /// Per-level pieces of `span`; pieces within the tolerance merge into a neighbor
    fn pieces(&self, span: &VerticalRange) -> Vec<LevelRange> {
        let mut kept: Vec<LevelRange> = Vec::new();
        let mut pending_start: Option<f64> = None;
        for band in self.bands() {
            let Some(range) = band.range.intersection(span) else {
                continue;
            };
            if range.length() > self.tolerance {
                let start = pending_start.take().unwrap_or(range.start);
                kept.push(LevelRange {
                    level: band.level,
                    range: VerticalRange::new(start, range.end),
                });
            } else if let Some(last) = kept.last_mut() {
                last.range.end = range.end;
            } else {
                pending_start.get_or_insert(range.start);
            }
        }
        kept
    }

    /// Ranges of a host, bottom to top
    pub fn host_ranges(&self, span: &VerticalRange) -> Vec<LevelRange> {
        let ranges = self.pieces(span);
        if ranges.is_empty() && !span.is_empty() {
            // Shorter than the tolerance: keep it whole on its own level
            return vec![LevelRange {
                level: self.level_at_or_below(span.start),
                range: *span,
            }];
        }
        ranges
    }

    /// Highest level at or below `z`, or the lowest level when none is
    pub fn level_at_or_below(&self, z: f64) -> LevelId {
        self.levels
            .iter()
            .rev()
            .find(|l| l.elevation <= z + self.tolerance)
            .unwrap_or(&self.levels[0])
            .id
    }

    /// Split a host and its fragments by level
    ///
    /// A host that is already registered is returned unchanged.
    pub fn split<R: Registry<ElementId, SplitResult> + ?Sized>(
        &self,
        host: ElementId,
        host_span: &VerticalRange,
        fragments: &[Fragment],
        registry: &mut R,
    ) -> SplitResult {
        if let Some(done) = registry.find(&host) {
            tracing::debug!(host = %host, "host already split by level");
            return done.clone();
        }

        let host_ranges = self.host_ranges(host_span);
        let host_levels: BTreeSet<LevelId> = host_ranges.iter().map(|r| r.level).collect();

        let mut result = SplitResult {
            host_ranges,
            ..SplitResult::default()
        };

        for fragment in fragments {
            let mut pieces = self.pieces(&fragment.span);
            if pieces.is_empty() {
                pieces.push(LevelRange {
                    level: self.level_at_or_below(fragment.span.start),
                    range: fragment.span,
                });
            }
            for piece in pieces {
                if !host_levels.contains(&piece.level) {
                    result.orphan_levels.insert(piece.level);
                }
                result
                    .by_level
                    .entry(piece.level)
                    .or_default()
                    .push((*fragment, piece.range));
            }
        }

        for level in &result.orphan_levels {
            let tallest = result.by_level[level]
                .iter()
                .map(|(_, range)| *range)
                .reduce(|a, b| a.hull(&b));
            if let Some(range) = tallest {
                result.dummy_hosts.push(LevelRange {
                    level: *level,
                    range,
                });
            }
        }

        if !result.orphan_levels.is_empty() {
            tracing::debug!(
                host = %host,
                orphans = result.orphan_levels.len(),
                "fragments reach levels the host does not"
            );
        }

        registry.register(host, result.clone());
        result
    }
}
