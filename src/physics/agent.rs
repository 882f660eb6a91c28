//! Player body - an upright cylinder driven by input and gravity

use glam::{Vec2, Vec3};

use crate::core::config::AgentConfig;
use crate::math::aabb::Aabb;

/// Where a fresh agent is placed
pub const SPAWN_POSITION: Vec3 = Vec3::new(32.0, 16.0, 32.0);
/// Where [`Agent::reset`] puts the agent by default
pub const RESET_POSITION: Vec3 = Vec3::new(32.0, 32.0, 32.0);

/// Upright cylinder body.
///
/// `position` is the top center of the cylinder (the eye point). The feet
/// sit `height` below it.
#[derive(Clone, Debug)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Horizontal target velocity (x, z) in blocks/s, replaces velocity.x/z every step
    pub input: Vec2,
    pub radius: f32,
    pub height: f32,
    pub jump_speed: f32,
    pub max_speed: f32,
    on_ground: bool,
}

impl Agent {
    pub fn new(position: Vec3, config: &AgentConfig) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            input: Vec2::ZERO,
            radius: config.radius,
            height: config.height,
            jump_speed: config.jump_speed,
            max_speed: config.max_speed,
            on_ground: false,
        }
    }

    /// Agent at the default spawn point
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(SPAWN_POSITION, config)
    }

    /// Bottom center of the cylinder
    pub fn feet(&self) -> Vec3 {
        self.position - Vec3::Y * self.height
    }

    /// Centerline reference point used by the narrow phase
    pub fn center(&self) -> Vec3 {
        self.position - Vec3::Y * (self.height / 2.0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::cylinder(self.position, self.radius, self.height)
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub(crate) fn set_on_ground(&mut self, on_ground: bool) {
        self.on_ground = on_ground;
    }

    /// Steer toward `direction` (x, z) at max speed. Zero stops horizontal motion.
    pub fn steer(&mut self, direction: Vec2) {
        self.input = direction.normalize_or_zero() * self.max_speed;
    }

    /// Add jump speed to the vertical velocity. Only works while grounded.
    pub fn jump(&mut self) -> bool {
        if !self.on_ground {
            return false;
        }
        self.velocity.y += self.jump_speed;
        self.on_ground = false;
        true
    }

    /// Teleport and stop
    pub fn reset(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.on_ground = false;
    }

    /// Apply horizontal input and integrate position over `dt`
    pub fn apply_inputs(&mut self, dt: f32) {
        self.velocity.x = self.input.x;
        self.velocity.z = self.input.y;
        self.position += self.velocity * dt;
    }

    /// Point test against the agent's bounding cylinder (strict on both tests)
    pub fn contains_point(&self, p: Vec3) -> bool {
        let d = p - self.center();
        d.y.abs() < self.height / 2.0 && d.x * d.x + d.z * d.z < self.radius * self.radius
    }
}
