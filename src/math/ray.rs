//! Ray type and voxel traversal

use glam::{IVec3, Vec3};

/// Upper bound on cells visited by one traversal
const MAX_TRAVERSAL_STEPS: usize = 512;

/// Half-line from `origin` along the unit vector `direction`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// First solid cell hit by a voxel traversal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
    /// Block that was hit
    pub block: IVec3,
    /// Outward normal of the entered face; zero when the ray starts inside the block
    pub normal: IVec3,
}

impl RayHit {
    /// Cell on the entered face side, where a new block would be placed
    pub fn place_position(&self) -> IVec3 {
        self.block + self.normal
    }
}

impl Ray {
    /// Create a new ray. The direction is normalized; a zero direction stays zero.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point `t` blocks along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Walk the unit grid cells pierced by the ray (Amanatides-Woo DDA) and
    /// return the first one `is_solid` accepts within `max_distance`.
    pub fn cast_voxels<F>(&self, max_distance: f32, mut is_solid: F) -> Option<RayHit>
    where
        F: FnMut(IVec3) -> bool,
    {
        if self.direction == Vec3::ZERO {
            return None;
        }

        let mut cell = self.origin.floor().as_ivec3();
        let step = IVec3::new(
            axis_step(self.direction.x),
            axis_step(self.direction.y),
            axis_step(self.direction.z),
        );
        // Distance along the ray between successive boundaries per axis
        let delta = self.direction.abs().recip();
        let frac = self.origin - self.origin.floor();
        let mut t_max = Vec3::new(
            first_boundary(step.x, frac.x, delta.x),
            first_boundary(step.y, frac.y, delta.y),
            first_boundary(step.z, frac.z, delta.z),
        );

        let mut normal = IVec3::ZERO;
        let mut t = 0.0;
        for _ in 0..MAX_TRAVERSAL_STEPS {
            if t > max_distance {
                break;
            }
            if is_solid(cell) {
                return Some(RayHit { block: cell, normal });
            }
            if t_max.x < t_max.y && t_max.x < t_max.z {
                cell.x += step.x;
                t = t_max.x;
                t_max.x += delta.x;
                normal = IVec3::new(-step.x, 0, 0);
            } else if t_max.y < t_max.z {
                cell.y += step.y;
                t = t_max.y;
                t_max.y += delta.y;
                normal = IVec3::new(0, -step.y, 0);
            } else {
                cell.z += step.z;
                t = t_max.z;
                t_max.z += delta.z;
                normal = IVec3::new(0, 0, -step.z);
            }
        }
        None
    }
}

fn axis_step(d: f32) -> i32 {
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

fn first_boundary(step: i32, frac: f32, delta: f32) -> f32 {
    match step {
        1 => (1.0 - frac) * delta,
        -1 => frac * delta,
        _ => f32::INFINITY,
    }
}
