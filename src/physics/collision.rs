//! Fixed-step collision between the agent cylinder and the block grid.
//!
//! Each step integrates gravity and input, gathers candidate blocks from the
//! agent's bounds (broad phase), turns overlapping blocks into contacts
//! (narrow phase) and pushes the agent out along each contact normal,
//! smallest overlap first.

use glam::{IVec3, Vec3};

use super::agent::Agent;
use crate::core::config::PhysicsConfig;
use crate::core::time::FixedTimestep;
use crate::math::aabb::Aabb;
use crate::voxel::chunk::BlockSource;

/// Horizontal distances below this are treated as zero when choosing a normal
const RADIAL_EPSILON: f32 = 1e-6;

/// One block pushing against the agent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub block: IVec3,
    /// Point of the block closest to the agent center
    pub point: Vec3,
    /// Unit push direction for the agent
    pub normal: Vec3,
    /// Penetration depth along `normal`
    pub overlap: f32,
}

/// Fixed-timestep collision solver
#[derive(Clone, Debug)]
pub struct CollisionSystem {
    timestep: FixedTimestep,
    gravity: f32,
}

impl CollisionSystem {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            timestep: FixedTimestep::from_rate(config.simulation_rate),
            gravity: config.gravity,
        }
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    /// Bank `dt` seconds and run every step now due. Returns the step count.
    pub fn update(&mut self, dt: f32, agent: &mut Agent, world: &impl BlockSource) -> u32 {
        let steps = self.timestep.advance(dt);
        let step = self.timestep.step();
        for _ in 0..steps {
            self.step(step, agent, world);
        }
        steps
    }

    /// One fixed step of length `dt`
    pub fn step(&self, dt: f32, agent: &mut Agent, world: &impl BlockSource) {
        agent.velocity.y -= self.gravity * dt;
        agent.apply_inputs(dt);
        agent.set_on_ground(false);

        let candidates = Self::broad_phase(agent, world);
        let mut contacts = Self::narrow_phase(&candidates, agent);
        if contacts.iter().any(|c| c.normal.y > 0.0) {
            agent.set_on_ground(true);
        }
        if !contacts.is_empty() {
            Self::resolve(&mut contacts, agent);
        }
    }

    /// Solid blocks whose cells touch the agent's bounds, rounded outward
    pub fn broad_phase(agent: &Agent, world: &impl BlockSource) -> Vec<IVec3> {
        agent.bounds().cells().filter(|pos| world.is_solid(*pos)).collect()
    }

    /// Contacts for candidates whose closest point lies inside the agent cylinder.
    ///
    /// The smaller of the vertical and radial overlaps wins; ties go vertical.
    pub fn narrow_phase(candidates: &[IVec3], agent: &Agent) -> Vec<Contact> {
        let center = agent.center();
        let half_height = agent.height / 2.0;

        candidates
            .iter()
            .filter_map(|block| {
                let point = Aabb::block(*block).closest_point(center);
                if !agent.contains_point(point) {
                    return None;
                }

                let d = point - center;
                let radial = (d.x * d.x + d.z * d.z).sqrt();
                let overlap_y = half_height - d.y.abs();
                let overlap_xz = agent.radius - radial;

                let (normal, overlap) = if overlap_y <= overlap_xz || radial < RADIAL_EPSILON {
                    (Vec3::new(0.0, -d.y.signum(), 0.0), overlap_y)
                } else {
                    (Vec3::new(-d.x, 0.0, -d.z) / radial, overlap_xz)
                };

                Some(Contact {
                    block: *block,
                    point,
                    normal,
                    overlap,
                })
            })
            .collect()
    }

    /// Push the agent out of each contact, smallest overlap first.
    ///
    /// Contacts whose point has left the cylinder after earlier pushes are
    /// skipped. Velocity along each applied normal is removed.
    pub fn resolve(contacts: &mut [Contact], agent: &mut Agent) {
        contacts.sort_by(|a, b| a.overlap.total_cmp(&b.overlap));

        for contact in contacts.iter() {
            if !agent.contains_point(contact.point) {
                continue;
            }
            agent.position += contact.normal * contact.overlap;
            let along = agent.velocity.dot(contact.normal);
            agent.velocity -= contact.normal * along;
        }
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}
