//! Axis-aligned boxes for bodies and block cells

use glam::{IVec3, Vec3};

/// Box spanning `min..=max`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Unit cube occupied by block `(x, y, z)`
    pub fn block(pos: IVec3) -> Self {
        let min = pos.as_vec3();
        Self { min, max: min + Vec3::ONE }
    }

    /// Bounds of an upright cylinder whose top center is `top`
    pub fn cylinder(top: Vec3, radius: f32, height: f32) -> Self {
        Self {
            min: Vec3::new(top.x - radius, top.y - height, top.z - radius),
            max: Vec3::new(top.x + radius, top.y, top.z + radius),
        }
    }

    /// Overlap test, inclusive of touching faces
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Point of the box closest to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Inclusive integer cell range covering the box, rounded outward.
    ///
    /// Bounds landing exactly on an integer include the neighboring cell too.
    pub fn cell_range(&self) -> (IVec3, IVec3) {
        (self.min.floor().as_ivec3(), self.max.ceil().as_ivec3())
    }

    /// Iterate every cell of [`Self::cell_range`]
    pub fn cells(&self) -> impl Iterator<Item = IVec3> {
        let (lo, hi) = self.cell_range();
        (lo.x..=hi.x).flat_map(move |x| {
            (lo.y..=hi.y).flat_map(move |y| (lo.z..=hi.z).map(move |z| IVec3::new(x, y, z)))
        })
    }
}
