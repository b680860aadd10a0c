// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes, used as the broadphase before solid booleans

use nalgebra::Point3;

/// Axis-aligned bounding box in 3D
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb3 {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Inverted box that any included point replaces
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True until at least one point has been included
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Smallest box containing both
    pub fn merged(&self, other: &Aabb3) -> Aabb3 {
        let mut out = *self;
        if !other.is_empty() {
            out.include_point(&other.min);
            out.include_point(&other.max);
        }
        out
    }

    /// Touching counts as overlap
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow by `tol` in every direction
    pub fn expanded(&self, tol: f64) -> Aabb3 {
        if self.is_empty() {
            return *self;
        }
        Aabb3 {
            min: Point3::new(self.min.x - tol, self.min.y - tol, self.min.z - tol),
            max: Point3::new(self.max.x + tol, self.max.y + tol, self.max.z + tol),
        }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}
