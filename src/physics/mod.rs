//! Engine-facing contract of the simulation.
//!
//! Gameplay code never touches the physics engine directly. It creates bodies
//! and joints through [`PhysicsWorld`], keeps the returned handles, and reacts to
//! [`ContactEvent`]s delivered to a [`ContactListener`] while the world steps.

pub mod rapier;

#[cfg(test)]
pub mod scripted;

use crate::gameplay::ragdoll::{BodyPart, RagdollId};
use bevy::math::Vec2;

/// Non-owning reference to a body that lives inside a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) u32);

/// Non-owning reference to a joint that lives inside a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub(crate) u32);

/// User-supplied identity attached to a body at creation.
///
/// Contact resolution always goes through tags; handles are engine-specific and
/// may be reused once a body is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Ground,
    Obstacle,
    Vehicle,
    RagdollPart { ragdoll: RagdollId, part: BodyPart },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDesc {
    Segment { a: Vec2, b: Vec2 },
    Box { half_extents: Vec2 },
    Circle { radius: f32 },
    /// Convex polygon in body-local coordinates.
    Polygon { vertices: Vec<Vec2> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDesc {
    pub shape: ShapeDesc,
    pub density: f32,
    pub friction: f32,
}

impl FixtureDesc {
    pub fn new(shape: ShapeDesc, density: f32) -> Self {
        Self {
            shape,
            density,
            friction: DEFAULT_FRICTION,
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// Box2D-style default friction, used by every fixture that does not set one.
pub const DEFAULT_FRICTION: f32 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub tag: Option<BodyTag>,
    pub fixtures: Vec<FixtureDesc>,
}

impl BodyDesc {
    pub fn fixed(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            angle: 0.0,
            tag: None,
            fixtures: Vec::new(),
        }
    }

    pub fn dynamic(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            ..Self::fixed(position)
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_tag(mut self, tag: BodyTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_fixture(mut self, fixture: FixtureDesc) -> Self {
        self.fixtures.push(fixture);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointDesc {
    /// Hinge around a world-space anchor, optionally limited to `[lower, upper]`
    /// radians of relative rotation.
    Revolute {
        anchor: Vec2,
        limits: Option<[f32; 2]>,
    },
    /// Wheel suspension: body B slides along the world `axis` through `anchor`
    /// on a spring and spins freely, optionally driven by a motor. Counts as
    /// one joint however the engine builds it.
    Wheel {
        anchor: Vec2,
        axis: Vec2,
        frequency_hz: f32,
        damping_ratio: f32,
        motor: Option<WheelMotor>,
    },
}

/// Positive `speed` rolls the wheel toward +x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelMotor {
    pub speed: f32,
    pub max_torque: f32,
}

/// Particle system parameters. Particles are purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSystemDesc {
    pub gravity_scale: f32,
    pub density: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldDesc {
    pub gravity: Vec2,
    pub particles: ParticleSystemDesc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub dt: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub particle_iterations: usize,
}

/// One resolved contact between two bodies during a step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub tag_a: Option<BodyTag>,
    pub tag_b: Option<BodyTag>,
    /// Normal impulse of every manifold point.
    pub normal_impulses: Vec<f32>,
}

impl ContactEvent {
    pub fn max_normal_impulse(&self) -> f32 {
        self.normal_impulses.iter().copied().fold(0.0, f32::max)
    }
}

/// Read-only body state available while contacts are being reported.
pub trait BodyQuery {
    fn body_position(&self, body: BodyHandle) -> Option<Vec2>;
}

/// Receives post-solve events synchronously from inside [`PhysicsWorld::step`].
pub trait ContactListener {
    fn post_solve(&mut self, contact: &ContactEvent, bodies: &dyn BodyQuery);
}

/// Debug renderer driven by [`PhysicsWorld::draw`].
pub trait DebugDraw {
    fn draw_polygon(&mut self, vertices: &[Vec2], kind: BodyKind, awake: bool);
    fn draw_circle(&mut self, center: Vec2, radius: f32, angle: f32, kind: BodyKind, awake: bool);
    fn draw_segment(&mut self, a: Vec2, b: Vec2, kind: BodyKind);
}

pub trait PhysicsWorld: BodyQuery + Send + Sync {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    fn create_joint(&mut self, body_a: BodyHandle, body_b: BodyHandle, desc: &JointDesc)
        -> JointHandle;

    /// Destroying an unknown or already destroyed joint is a no-op.
    fn destroy_joint(&mut self, joint: JointHandle);

    fn set_motor_speed(&mut self, joint: JointHandle, speed: f32);

    fn apply_angular_impulse(&mut self, body: BodyHandle, impulse: f32);

    fn body_tag(&self, body: BodyHandle) -> Option<BodyTag>;

    fn body_count(&self) -> usize;

    fn joint_count(&self) -> usize;

    /// Advances the world by `settings.dt`. Every contact resolved during the
    /// step is handed to `listener` before this returns.
    fn step(&mut self, settings: &StepSettings, listener: &mut dyn ContactListener);

    fn draw(&self, drawer: &mut dyn DebugDraw);
}
