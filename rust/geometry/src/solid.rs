// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prism solids
//!
//! A [`Solid`] is a stack of slabs, each a planar region swept between two
//! heights along the local Z axis. Every solid the export engine builds is an
//! extrusion in its host's frame, so booleans between solids reduce exactly
//! to 2D region booleans over the z-intervals where both operands exist.

use crate::bbox::Aabb3;
use crate::bool2d;
use crate::error::{Error, Result};
use crate::profile::{Profile2D, Region2D};
use nalgebra::{Point2, Point3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Slabs thinner than this are dropped
pub const MIN_HEIGHT: f64 = 1e-9;

/// Region swept between `z_min` and `z_max`
#[derive(Debug, Clone, PartialEq)]
pub struct Slab {
    pub region: Region2D,
    pub z_min: f64,
    pub z_max: f64,
}

impl Slab {
    #[inline]
    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    #[inline]
    fn contains_z(&self, z: f64) -> bool {
        z >= self.z_min && z < self.z_max
    }
}

/// Solid made of z-ordered, non-overlapping slabs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    slabs: Vec<Slab>,
}

impl Solid {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sweep `region` from `z_min` to `z_max`
    pub fn extrude(region: Region2D, z_min: f64, z_max: f64) -> Result<Solid> {
        if !z_min.is_finite() || !z_max.is_finite() {
            return Err(Error::InvalidExtrusion(
                "Extrusion bounds must be finite".to_string(),
            ));
        }
        if z_max - z_min <= MIN_HEIGHT {
            return Err(Error::InvalidExtrusion(
                "Depth must be positive".to_string(),
            ));
        }
        if !region.is_finite() {
            return Err(Error::degenerate("footprint has non-finite coordinates"));
        }
        if region.is_empty() {
            return Err(Error::degenerate("footprint encloses no area"));
        }
        Ok(Solid {
            slabs: vec![Slab {
                region,
                z_min,
                z_max,
            }],
        })
    }

    /// Convenience: single polygon prism
    pub fn prism(outer: &[Point2<f64>], z_min: f64, z_max: f64) -> Result<Solid> {
        let region = bool2d::region_from_contours(&[outer.to_vec()]);
        Self::extrude(region, z_min, z_max)
    }

    /// Assemble a solid from slabs; they are sorted and must not overlap
    pub fn from_slabs(mut slabs: Vec<Slab>) -> Result<Solid> {
        slabs.retain(|s| !s.region.profiles.is_empty());
        slabs.sort_by(|a, b| {
            a.z_min
                .partial_cmp(&b.z_min)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for pair in slabs.windows(2) {
            if pair[0].z_max > pair[1].z_min + MIN_HEIGHT {
                return Err(Error::degenerate("slabs overlap along the extrusion axis"));
            }
        }
        Ok(Solid { slabs })
    }

    #[inline]
    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    /// No slab with measurable area
    pub fn is_empty(&self) -> bool {
        self.slabs
            .iter()
            .all(|s| s.region.is_empty() || s.height() <= MIN_HEIGHT)
    }

    pub fn volume(&self) -> f64 {
        self.slabs.iter().map(|s| s.region.area() * s.height()).sum()
    }

    pub fn bounds(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for slab in &self.slabs {
            if let Some((min, max)) = slab.region.bounds() {
                aabb.include_point(&Point3::new(min.x, min.y, slab.z_min));
                aabb.include_point(&Point3::new(max.x, max.y, slab.z_max));
            }
        }
        aabb
    }

    /// Faces of the boundary representation: two caps and one side face per edge, per profile
    pub fn face_count(&self) -> usize {
        self.slabs
            .iter()
            .filter(|s| s.height() > MIN_HEIGHT)
            .flat_map(|s| s.region.profiles.iter())
            .map(|p| 2 + p.edge_count())
            .sum()
    }

    /// Region occupying height `z`, if any
    pub fn region_at(&self, z: f64) -> Option<&Region2D> {
        self.slabs
            .iter()
            .find(|s| s.contains_z(z))
            .map(|s| &s.region)
    }

    /// Reject solids a boolean cannot work with
    pub fn validate(&self) -> Result<()> {
        for slab in &self.slabs {
            if !slab.z_min.is_finite() || !slab.z_max.is_finite() {
                return Err(Error::degenerate("slab bounds are not finite"));
            }
            if slab.height() <= MIN_HEIGHT {
                return Err(Error::degenerate(format!(
                    "slab [{}, {}] has no height",
                    slab.z_min, slab.z_max
                )));
            }
            if !slab.region.is_finite() {
                return Err(Error::degenerate("slab region has non-finite coordinates"));
            }
        }
        Ok(())
    }

    /// Portion of the solid between `z_min` and `z_max`
    pub fn slice(&self, z_min: f64, z_max: f64) -> Solid {
        let slabs = self
            .slabs
            .iter()
            .filter_map(|s| {
                let lo = s.z_min.max(z_min);
                let hi = s.z_max.min(z_max);
                (hi - lo > MIN_HEIGHT).then(|| Slab {
                    region: s.region.clone(),
                    z_min: lo,
                    z_max: hi,
                })
            })
            .collect();
        Solid { slabs }
    }

    /// Boolean difference `self - other`
    pub fn subtract(&self, other: &Solid) -> Result<Solid> {
        self.validate()?;
        other.validate()?;
        if other.is_empty() || !self.bounds().overlaps(&other.bounds()) {
            return Ok(self.clone());
        }
        self.combine(other, |a, b| match (a, b) {
            (Some(a), Some(b)) => bool2d::difference(a, b),
            (Some(a), None) => a.clone(),
            (None, _) => Region2D::empty(),
        })
    }

    /// Boolean intersection `self ∩ other`
    pub fn intersect(&self, other: &Solid) -> Result<Solid> {
        self.validate()?;
        other.validate()?;
        if !self.bounds().overlaps(&other.bounds()) {
            return Ok(Solid::empty());
        }
        self.combine(other, |a, b| match (a, b) {
            (Some(a), Some(b)) => bool2d::intersection(a, b),
            _ => Region2D::empty(),
        })
    }

    /// Boolean union `self ∪ other`
    pub fn union(&self, other: &Solid) -> Result<Solid> {
        self.validate()?;
        other.validate()?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        self.combine(other, |a, b| match (a, b) {
            (Some(a), Some(b)) => bool2d::union(a, b),
            (Some(r), None) | (None, Some(r)) => r.clone(),
            (None, None) => Region2D::empty(),
        })
    }

    /// Evaluate `op` on every z-interval of either solid, split at the breakpoints of both
    fn combine<F>(&self, other: &Solid, op: F) -> Result<Solid>
    where
        F: Fn(Option<&Region2D>, Option<&Region2D>) -> Region2D,
    {
        let mut breaks: Vec<f64> = self
            .slabs
            .iter()
            .chain(other.slabs.iter())
            .flat_map(|s| [s.z_min, s.z_max])
            .collect();
        breaks.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        breaks.dedup_by(|a, b| (*a - *b).abs() <= MIN_HEIGHT);

        let mut slabs: Vec<Slab> = Vec::new();
        for w in breaks.windows(2) {
            let (lo, hi) = (w[0], w[1]);
            if hi - lo <= MIN_HEIGHT {
                continue;
            }
            let mid = 0.5 * (lo + hi);
            let (a, b) = (self.region_at(mid), other.region_at(mid));
            if a.is_none() && b.is_none() {
                continue;
            }
            let piece = op(a, b);
            if piece.is_empty() {
                continue;
            }
            match slabs.last_mut() {
                Some(prev)
                    if (prev.z_max - lo).abs() <= MIN_HEIGHT
                        && prev.region.approx_eq(&piece, 1e-9) =>
                {
                    prev.z_max = hi;
                }
                _ => slabs.push(Slab {
                    region: piece,
                    z_min: lo,
                    z_max: hi,
                }),
            }
        }

        if !slabs.iter().all(|s| s.region.is_finite()) {
            return Err(Error::degenerate("boolean produced non-finite coordinates"));
        }
        Ok(Solid { slabs })
    }

    /// Split into connected pieces
    ///
    /// Profiles of one slab are disjoint; profiles of stacked slabs connect
    /// when their footprints overlap with positive area across the shared height.
    pub fn components(&self) -> Vec<Solid> {
        let nodes: Vec<(usize, usize)> = self
            .slabs
            .iter()
            .enumerate()
            .flat_map(|(si, s)| (0..s.region.profiles.len()).map(move |pi| (si, pi)))
            .collect();
        if nodes.is_empty() {
            return Vec::new();
        }
        let index: FxHashMap<(usize, usize), usize> =
            nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut parent: Vec<usize> = (0..nodes.len()).collect();
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for si in 1..self.slabs.len() {
            let below = &self.slabs[si - 1];
            let above = &self.slabs[si];
            if (above.z_min - below.z_max).abs() > MIN_HEIGHT {
                continue;
            }
            for (pa, a) in below.region.profiles.iter().enumerate() {
                for (pb, b) in above.region.profiles.iter().enumerate() {
                    if profiles_overlap(a, b) {
                        let ra = find(&mut parent, index[&(si - 1, pa)]);
                        let rb = find(&mut parent, index[&(si, pb)]);
                        if ra != rb {
                            parent[rb] = ra;
                        }
                    }
                }
            }
        }

        let mut groups: Vec<(usize, SmallVec<[(usize, usize); 4]>)> = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let root = find(&mut parent, i);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(*node),
                None => {
                    let mut members = SmallVec::new();
                    members.push(*node);
                    groups.push((root, members));
                }
            }
        }

        groups
            .into_iter()
            .map(|(_, members)| {
                let mut slabs: Vec<Slab> = Vec::new();
                for (si, pi) in members {
                    let src = &self.slabs[si];
                    let profile = src.region.profiles[pi].clone();
                    match slabs.last_mut() {
                        Some(last) if last.z_min == src.z_min => last.region.profiles.push(profile),
                        _ => slabs.push(Slab {
                            region: Region2D::from_profile(profile),
                            z_min: src.z_min,
                            z_max: src.z_max,
                        }),
                    }
                }
                Solid { slabs }
            })
            .collect()
    }

    /// Number of disjoint pieces
    pub fn component_count(&self) -> usize {
        self.components().len()
    }
}

fn profiles_overlap(a: &Profile2D, b: &Profile2D) -> bool {
    let (Some((amin, amax)), Some((bmin, bmax))) = (
        bool2d::contour_bounds(&a.outer),
        bool2d::contour_bounds(&b.outer),
    ) else {
        return false;
    };
    if !bool2d::bounds_overlap(&amin, &amax, &bmin, &bmax) {
        return false;
    }
    let ra = Region2D::from_profile(a.clone());
    let rb = Region2D::from_profile(b.clone());
    !bool2d::intersection(&ra, &rb).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    #[test]
    fn test_extrude_rejects_bad_depth() {
        let region = bool2d::region_from_contours(&[rect(0.0, 0.0, 1.0, 1.0)]);
        assert!(matches!(
            Solid::extrude(region, 1.0, 1.0),
            Err(Error::InvalidExtrusion(_))
        ));
    }

    #[test]
    fn test_prism_volume_and_bounds() {
        let s = Solid::prism(&rect(0.0, 0.0, 5.0, 0.2), 0.0, 3.0).unwrap();
        assert_relative_eq!(s.volume(), 3.0, epsilon = 1e-9);
        let b = s.bounds();
        assert_relative_eq!(b.max.x, 5.0);
        assert_relative_eq!(b.height(), 3.0);
        assert_eq!(s.face_count(), 6);
        assert_eq!(s.component_count(), 1);
    }

    #[test]
    fn test_subtract_through_opening_creates_hole() {
        let wall = Solid::prism(&rect(0.0, 0.0, 5.0, 0.2), 0.0, 3.0).unwrap();
        let door = Solid::prism(&rect(2.0, -0.1, 3.0, 0.3), 0.0, 2.0).unwrap();
        let cut = wall.subtract(&door).unwrap();
        assert_relative_eq!(cut.volume(), 3.0 - 0.2 * 2.0, epsilon = 1e-9);
        assert_eq!(cut.slabs().len(), 2);
        assert_eq!(cut.component_count(), 1);
    }

    #[test]
    fn test_subtract_full_height_cut_splits_solid() {
        let wall = Solid::prism(&rect(0.0, 0.0, 5.0, 0.2), 0.0, 3.0).unwrap();
        let cutter = Solid::prism(&rect(2.0, -1.0, 3.0, 1.0), -1.0, 4.0).unwrap();
        let cut = wall.subtract(&cutter).unwrap();
        assert_eq!(cut.component_count(), 2);
    }

    #[test]
    fn test_subtract_disjoint_is_identity() {
        let a = Solid::prism(&rect(0.0, 0.0, 1.0, 1.0), 0.0, 1.0).unwrap();
        let b = Solid::prism(&rect(5.0, 5.0, 6.0, 6.0), 0.0, 1.0).unwrap();
        assert_eq!(a.subtract(&b).unwrap(), a);
    }

    #[test]
    fn test_intersect_partial_height() {
        let a = Solid::prism(&rect(0.0, 0.0, 2.0, 2.0), 0.0, 3.0).unwrap();
        let b = Solid::prism(&rect(1.0, 1.0, 3.0, 3.0), 2.0, 5.0).unwrap();
        let i = a.intersect(&b).unwrap();
        assert_relative_eq!(i.volume(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(i.bounds().min.z, 2.0);
    }

    #[test]
    fn test_union_of_stacked_prisms_is_one_piece() {
        let lower = Solid::prism(&rect(0.0, 0.0, 4.0, 0.2), 0.0, 2.0).unwrap();
        let upper = Solid::prism(&rect(0.0, 0.0, 4.0, 0.2), 2.0, 3.0).unwrap();
        let merged = lower.union(&upper).unwrap();
        assert_eq!(merged.slabs().len(), 1);
        assert_eq!(merged.component_count(), 1);
        assert_relative_eq!(merged.volume(), 4.0 * 0.2 * 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_keeps_separate_pieces_apart() {
        let a = Solid::prism(&rect(0.0, 0.0, 1.0, 1.0), 0.0, 1.0).unwrap();
        let b = Solid::prism(&rect(3.0, 0.0, 4.0, 1.0), 0.5, 2.0).unwrap();
        let merged = a.union(&b).unwrap();
        assert_eq!(merged.component_count(), 2);
        assert_relative_eq!(merged.volume(), 1.0 + 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_boolean_with_degenerate_operand_fails() {
        let a = Solid::prism(&rect(0.0, 0.0, 2.0, 2.0), 0.0, 3.0).unwrap();
        let flat = Solid::from_slabs(vec![Slab {
            region: bool2d::region_from_contours(&[rect(0.0, 0.0, 1.0, 1.0)]),
            z_min: 1.0,
            z_max: 1.0,
        }])
        .unwrap();
        assert!(matches!(a.subtract(&flat), Err(Error::DegenerateSolid(_))));
    }

    #[test]
    fn test_slice_outside_span_is_empty() {
        let a = Solid::prism(&rect(0.0, 0.0, 2.0, 2.0), 0.0, 3.0).unwrap();
        assert!(a.slice(4.0, 6.0).is_empty());
        assert_relative_eq!(a.slice(1.0, 6.0).volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_from_slabs_rejects_overlap() {
        let region = bool2d::region_from_contours(&[rect(0.0, 0.0, 1.0, 1.0)]);
        let result = Solid::from_slabs(vec![
            Slab { region: region.clone(), z_min: 0.0, z_max: 2.0 },
            Slab { region, z_min: 1.0, z_max: 3.0 },
        ]);
        assert!(result.is_err());
    }
}
