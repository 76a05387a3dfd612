//! [`PhysicsWorld`] backed by Rapier 2D.
//!
//! Contact force events are buffered while the pipeline runs and handed to the
//! listener, in solver order, before [`PhysicsWorld::step`] returns.
//!
//! A wheel joint is two Rapier joints around a hidden, collider-less axle body:
//! a sprung prismatic joint from the chassis to the axle and a motorised
//! revolute joint from the axle to the wheel.

use super::{
    BodyDesc, BodyHandle, BodyKind, BodyQuery, BodyTag, ContactEvent, ContactListener,
    DebugDraw, JointDesc, JointHandle, ParticleSystemDesc, PhysicsWorld, ShapeDesc,
    StepSettings, WorldDesc,
};
use bevy::log::{debug, warn};
use bevy::math::Vec2;
use bevy_rapier2d::rapier::na::Unit;
use bevy_rapier2d::rapier::parry::shape::TypedShape;
use bevy_rapier2d::rapier::prelude::{
    ActiveEvents, ActiveHooks, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet,
    CollisionEvent, ContactPair, DefaultBroadPhase, EventHandler, ImpulseJointHandle,
    ImpulseJointSet, IntegrationParameters, IslandManager, JointAxis, MassProperties,
    MultibodyJointSet, NarrowPhase, PairFilterContext, PhysicsHooks, PhysicsPipeline, Point,
    PrismaticJointBuilder, Real, RevoluteJointBuilder, RigidBodyBuilder, RigidBodyHandle,
    RigidBodySet, SolverFlags, Vector,
};
use std::f32::consts::TAU;
use std::sync::Mutex;

const WHEEL_MOTOR_FACTOR: Real = 10.0;
const AXLE_MASS: Real = 1.0;
const AXLE_INERTIA: Real = 0.5;
/// Rigid-body user data of axle bodies. Never a valid [`BodyHandle`].
const AXLE_USER_DATA: u128 = u128::MAX;
/// Collider user data shared by every fixture of a [`BodyTag::Vehicle`] body.
const VEHICLE_COLLIDER: u128 = 1;

#[derive(Debug)]
struct RawContact {
    collider1: ColliderHandle,
    collider2: ColliderHandle,
    normal_impulses: Vec<f32>,
}

#[derive(Debug, Default)]
struct ContactCollector {
    contacts: Mutex<Vec<RawContact>>,
}

impl ContactCollector {
    fn drain(&self) -> Vec<RawContact> {
        match self.contacts.lock() {
            Ok(mut contacts) => std::mem::take(&mut *contacts),
            Err(_) => Vec::new(),
        }
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
        let normal_impulses = contact_pair
            .manifolds
            .iter()
            .flat_map(|manifold| manifold.points.iter().map(|point| point.data.impulse))
            .collect();

        if let Ok(mut contacts) = self.contacts.lock() {
            contacts.push(RawContact {
                collider1: contact_pair.collider1,
                collider2: contact_pair.collider2,
                normal_impulses,
            });
        }
    }
}

/// Parts of the vehicle never collide with each other.
struct VehicleContactFilter;

impl PhysicsHooks for VehicleContactFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let is_vehicle = |collider: ColliderHandle| {
            context
                .colliders
                .get(collider)
                .is_some_and(|collider| collider.user_data == VEHICLE_COLLIDER)
        };
        if is_vehicle(context.collider1) && is_vehicle(context.collider2) {
            None
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum JointSlot {
    Hinge(ImpulseJointHandle),
    /// The suspension joint is owned by the axle and goes away with it.
    Wheel {
        drive: ImpulseJointHandle,
        axle: RigidBodyHandle,
    },
}

impl JointSlot {
    /// Joint whose angular motor turns the attached body.
    fn motor_joint(self) -> ImpulseJointHandle {
        match self {
            JointSlot::Hinge(joint) => joint,
            JointSlot::Wheel { drive, .. } => drive,
        }
    }
}

pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collector: ContactCollector,
    particles: ParticleSystemDesc,
    particle_iterations_noted: bool,
    body_handles: Vec<RigidBodyHandle>,
    body_tags: Vec<Option<BodyTag>>,
    joint_slots: Vec<Option<JointSlot>>,
}

impl RapierWorld {
    pub fn new(desc: &WorldDesc) -> Self {
        debug!(
            "Creating physics world: gravity {:?}, particle gravity scale {}, particle density {}.",
            desc.gravity, desc.particles.gravity_scale, desc.particles.density
        );
        Self {
            gravity: Vector::new(desc.gravity.x, desc.gravity.y),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collector: ContactCollector::default(),
            particles: desc.particles,
            particle_iterations_noted: false,
            body_handles: Vec::new(),
            body_tags: Vec::new(),
            joint_slots: Vec::new(),
        }
    }

    /// Particle parameters the world was created with. Rapier has no particle
    /// solver, so these only feed the debug panel.
    pub fn particle_system(&self) -> ParticleSystemDesc {
        self.particles
    }

    fn rigid_body_handle(&self, body: BodyHandle) -> Option<RigidBodyHandle> {
        self.body_handles.get(body.0 as usize).copied()
    }

    fn body_for_collider(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        let body = self.rigid_bodies.get(parent)?;
        u32::try_from(body.user_data).ok().map(BodyHandle)
    }

    fn to_local_point(&self, body: RigidBodyHandle, world: Vec2) -> Point<Real> {
        let world = Point::new(world.x, world.y);
        self.rigid_bodies
            .get(body)
            .map(|rb| rb.position().inverse_transform_point(&world))
            .unwrap_or(world)
    }

    fn to_local_vector(&self, body: RigidBodyHandle, world: Vec2) -> Vector<Real> {
        let world = Vector::new(world.x, world.y);
        self.rigid_bodies
            .get(body)
            .map(|rb| rb.position().inverse_transform_vector(&world))
            .unwrap_or(world)
    }

    fn build_collider(shape: &ShapeDesc) -> Option<ColliderBuilder> {
        match shape {
            ShapeDesc::Segment { a, b } => Some(ColliderBuilder::segment(
                Point::new(a.x, a.y),
                Point::new(b.x, b.y),
            )),
            ShapeDesc::Box { half_extents } => {
                Some(ColliderBuilder::cuboid(half_extents.x, half_extents.y))
            }
            ShapeDesc::Circle { radius } => Some(ColliderBuilder::ball(*radius)),
            ShapeDesc::Polygon { vertices } => {
                let points: Vec<Point<Real>> = vertices
                    .iter()
                    .map(|vertex| Point::new(vertex.x, vertex.y))
                    .collect();
                ColliderBuilder::convex_hull(&points)
            }
        }
    }

    /// Collider-less body carrying a wheel. It slides on the chassis'
    /// suspension axis and never rotates relative to the chassis.
    fn create_axle(&mut self, chassis: RigidBodyHandle, anchor: Vec2) -> RigidBodyHandle {
        let angle = self
            .rigid_bodies
            .get(chassis)
            .map_or(0.0, |rb| rb.rotation().angle());
        let axle = RigidBodyBuilder::dynamic()
            .translation(Vector::new(anchor.x, anchor.y))
            .rotation(angle)
            .additional_mass_properties(MassProperties::new(
                Point::origin(),
                AXLE_MASS,
                AXLE_INERTIA,
            ))
            .user_data(AXLE_USER_DATA)
            .build();
        self.rigid_bodies.insert(axle)
    }

    /// Moves every vehicle body, axles included, straight up by `height`.
    #[cfg(test)]
    pub(crate) fn lift_vehicle(&mut self, height: f32) {
        let vehicle: Vec<RigidBodyHandle> = self
            .rigid_bodies
            .iter()
            .filter(|(_, rb)| {
                rb.user_data == AXLE_USER_DATA
                    || u32::try_from(rb.user_data)
                        .ok()
                        .and_then(|index| self.body_tags.get(index as usize).copied().flatten())
                        == Some(BodyTag::Vehicle)
            })
            .map(|(handle, _)| handle)
            .collect();
        for handle in vehicle {
            if let Some(rb) = self.rigid_bodies.get_mut(handle) {
                let lifted = rb.translation() + Vector::new(0.0, height);
                rb.set_translation(lifted, true);
            }
        }
    }
}

impl BodyQuery for RapierWorld {
    fn body_position(&self, body: BodyHandle) -> Option<Vec2> {
        let handle = self.rigid_body_handle(body)?;
        let translation = self.rigid_bodies.get(handle)?.translation();
        Some(Vec2::new(translation.x, translation.y))
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.body_handles.len() as u32);
        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let rigid_body = builder
            .translation(Vector::new(desc.position.x, desc.position.y))
            .rotation(desc.angle)
            .user_data(u128::from(handle.0))
            .build();
        let rigid_body_handle = self.rigid_bodies.insert(rigid_body);
        let is_vehicle = desc.tag == Some(BodyTag::Vehicle);

        for fixture in &desc.fixtures {
            let Some(collider) = Self::build_collider(&fixture.shape) else {
                warn!("Skipping degenerate fixture {:?} on body {:?}.", fixture.shape, handle);
                continue;
            };
            let mut collider = collider
                .density(fixture.density)
                .friction(fixture.friction)
                .active_events(ActiveEvents::CONTACT_FORCE_EVENTS)
                .contact_force_event_threshold(0.0);
            if is_vehicle {
                collider = collider
                    .user_data(VEHICLE_COLLIDER)
                    .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS);
            }
            self.colliders
                .insert_with_parent(collider.build(), rigid_body_handle, &mut self.rigid_bodies);
        }

        self.body_handles.push(rigid_body_handle);
        self.body_tags.push(desc.tag);
        handle
    }

    fn create_joint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        desc: &JointDesc,
    ) -> JointHandle {
        let handle = JointHandle(self.joint_slots.len() as u32);
        let (Some(rb_a), Some(rb_b)) = (
            self.rigid_body_handle(body_a),
            self.rigid_body_handle(body_b),
        ) else {
            warn!("Joint {handle:?} references a missing body; nothing was created.");
            self.joint_slots.push(None);
            return handle;
        };

        let slot = match *desc {
            JointDesc::Revolute { anchor, limits } => {
                let mut builder = RevoluteJointBuilder::new()
                    .local_anchor1(self.to_local_point(rb_a, anchor))
                    .local_anchor2(self.to_local_point(rb_b, anchor))
                    .contacts_enabled(false);
                if let Some(limits) = limits {
                    builder = builder.limits(limits);
                }
                JointSlot::Hinge(self.impulse_joints.insert(rb_a, rb_b, builder, true))
            }
            JointDesc::Wheel {
                anchor,
                axis,
                frequency_hz,
                damping_ratio,
                motor,
            } => {
                let axle = self.create_axle(rb_a, anchor);
                let omega = TAU * frequency_hz;
                let spring = PrismaticJointBuilder::new(Unit::new_normalize(
                    self.to_local_vector(rb_a, axis),
                ))
                .local_anchor1(self.to_local_point(rb_a, anchor))
                .local_anchor2(Point::origin())
                .motor_position(0.0, omega * omega, 2.0 * damping_ratio * omega)
                .contacts_enabled(false);
                self.impulse_joints.insert(rb_a, axle, spring, true);

                let mut hub = RevoluteJointBuilder::new()
                    .local_anchor1(Point::origin())
                    .local_anchor2(self.to_local_point(rb_b, anchor))
                    .contacts_enabled(false);
                if let Some(motor) = motor {
                    // Positive speed rolls toward +x, which is a clockwise spin.
                    hub = hub
                        .motor_velocity(-motor.speed, WHEEL_MOTOR_FACTOR)
                        .motor_max_force(motor.max_torque);
                }
                let drive = self.impulse_joints.insert(axle, rb_b, hub, true);

                JointSlot::Wheel { drive, axle }
            }
        };

        self.joint_slots.push(Some(slot));
        handle
    }

    fn destroy_joint(&mut self, joint: JointHandle) {
        let Some(slot) = self.joint_slots.get_mut(joint.0 as usize) else {
            return;
        };
        match slot.take() {
            Some(JointSlot::Hinge(joint)) => {
                self.impulse_joints.remove(joint, true);
            }
            Some(JointSlot::Wheel { axle, .. }) => {
                // Removing the axle takes both of its joints with it.
                self.rigid_bodies.remove(
                    axle,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                );
            }
            None => {}
        }
    }

    fn set_motor_speed(&mut self, joint: JointHandle, speed: f32) {
        let Some(slot) = self.joint_slots.get(joint.0 as usize).copied().flatten() else {
            return;
        };
        if let Some(impulse_joint) = self.impulse_joints.get_mut(slot.motor_joint(), true) {
            impulse_joint
                .data
                .set_motor_velocity(JointAxis::AngX, -speed, WHEEL_MOTOR_FACTOR);
        }
    }

    fn apply_angular_impulse(&mut self, body: BodyHandle, impulse: f32) {
        let Some(handle) = self.rigid_body_handle(body) else {
            return;
        };
        if let Some(rigid_body) = self.rigid_bodies.get_mut(handle) {
            rigid_body.apply_torque_impulse(impulse, true);
        }
    }

    fn body_tag(&self, body: BodyHandle) -> Option<BodyTag> {
        self.body_tags.get(body.0 as usize).copied().flatten()
    }

    /// Axles are engine detail and not counted.
    fn body_count(&self) -> usize {
        self.body_handles.len()
    }

    /// A wheel joint counts once.
    fn joint_count(&self) -> usize {
        self.joint_slots.iter().flatten().count()
    }

    fn step(&mut self, settings: &StepSettings, listener: &mut dyn ContactListener) {
        self.integration_parameters.dt = settings.dt;
        self.integration_parameters.num_solver_iterations = settings.velocity_iterations.max(1);
        self.integration_parameters.num_internal_stabilization_iterations =
            settings.position_iterations.max(1);
        if !self.particle_iterations_noted {
            debug!(
                "No particle solver; {} particle iterations per step are ignored.",
                settings.particle_iterations
            );
            self.particle_iterations_noted = true;
        }

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &VehicleContactFilter,
            &self.collector,
        );

        let contacts: Vec<ContactEvent> = self
            .collector
            .drain()
            .into_iter()
            .filter_map(|raw| {
                let body_a = self.body_for_collider(raw.collider1)?;
                let body_b = self.body_for_collider(raw.collider2)?;
                Some(ContactEvent {
                    body_a,
                    body_b,
                    tag_a: self.body_tag(body_a),
                    tag_b: self.body_tag(body_b),
                    normal_impulses: raw.normal_impulses,
                })
            })
            .collect();

        for contact in &contacts {
            listener.post_solve(contact, &*self);
        }
    }

    fn draw(&self, drawer: &mut dyn DebugDraw) {
        for (_, collider) in self.colliders.iter() {
            let Some(rigid_body) = collider
                .parent()
                .and_then(|parent| self.rigid_bodies.get(parent))
            else {
                continue;
            };
            let kind = if rigid_body.is_dynamic() {
                BodyKind::Dynamic
            } else {
                BodyKind::Static
            };
            let awake = !rigid_body.is_sleeping();
            let position = collider.position();
            let to_world = |local: Point<Real>| {
                let world = position * local;
                Vec2::new(world.x, world.y)
            };

            match collider.shape().as_typed_shape() {
                TypedShape::Ball(ball) => {
                    let center = to_world(Point::origin());
                    drawer.draw_circle(center, ball.radius, position.rotation.angle(), kind, awake);
                }
                TypedShape::Cuboid(cuboid) => {
                    let half = cuboid.half_extents;
                    let vertices = [
                        to_world(Point::new(-half.x, -half.y)),
                        to_world(Point::new(half.x, -half.y)),
                        to_world(Point::new(half.x, half.y)),
                        to_world(Point::new(-half.x, half.y)),
                    ];
                    drawer.draw_polygon(&vertices, kind, awake);
                }
                TypedShape::Segment(segment) => {
                    drawer.draw_segment(to_world(segment.a), to_world(segment.b), kind);
                }
                TypedShape::ConvexPolygon(polygon) => {
                    let vertices: Vec<Vec2> =
                        polygon.points().iter().map(|vertex| to_world(*vertex)).collect();
                    drawer.draw_polygon(&vertices, kind, awake);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameplay::level::LevelBuilder;
    use crate::gameplay::vehicle::car::{Car, CarKind, CarTuning};
    use crate::physics::{FixtureDesc, ParticleSystemDesc, WheelMotor};

    struct CountingListener {
        contacts: usize,
    }

    impl ContactListener for CountingListener {
        fn post_solve(&mut self, _contact: &ContactEvent, _bodies: &dyn BodyQuery) {
            self.contacts += 1;
        }
    }

    fn world() -> RapierWorld {
        RapierWorld::new(&WorldDesc {
            gravity: Vec2::new(0.0, -10.0),
            particles: ParticleSystemDesc {
                gravity_scale: 0.4,
                density: 1.2,
            },
        })
    }

    fn settings() -> StepSettings {
        StepSettings {
            dt: 1.0 / 60.0,
            velocity_iterations: 8,
            position_iterations: 1,
            particle_iterations: 3,
        }
    }

    fn hulk_on_course() -> (RapierWorld, Car) {
        let mut world = world();
        LevelBuilder::create(&mut world);
        let car = Car::create(
            &mut world,
            CarKind::Hulk,
            CarTuning {
                frequency_hz: 40.0,
                damping_ratio: 0.5,
                speed: 300.0,
                max_motor_torque: 1500.0,
            },
        );
        (world, car)
    }

    fn run(world: &mut RapierWorld, steps: usize) -> usize {
        let mut listener = CountingListener { contacts: 0 };
        for _ in 0..steps {
            world.step(&settings(), &mut listener);
        }
        listener.contacts
    }

    fn wheel_fixture(radius: f32) -> FixtureDesc {
        FixtureDesc::new(ShapeDesc::Circle { radius }, 1.0)
    }

    #[test]
    fn dropped_box_lands_on_ground_and_reports_contacts() {
        let mut world = world();
        world.create_body(
            &BodyDesc::fixed(Vec2::ZERO)
                .with_tag(BodyTag::Ground)
                .with_fixture(FixtureDesc::new(
                    ShapeDesc::Segment {
                        a: Vec2::new(-20.0, 0.0),
                        b: Vec2::new(20.0, 0.0),
                    },
                    0.0,
                )),
        );
        let crate_body = world.create_body(
            &BodyDesc::dynamic(Vec2::new(0.0, 2.0))
                .with_tag(BodyTag::Obstacle)
                .with_fixture(FixtureDesc::new(
                    ShapeDesc::Box {
                        half_extents: Vec2::splat(0.5),
                    },
                    1.0,
                )),
        );

        let contacts = run(&mut world, 120);

        let position = world.body_position(crate_body).expect("box exists");
        assert!(position.y < 1.0, "box should have fallen, y = {}", position.y);
        assert!(position.y > 0.0, "box should rest on the ground, y = {}", position.y);
        assert!(contacts > 0);
        assert_eq!(world.body_tag(crate_body), Some(BodyTag::Obstacle));
    }

    #[test]
    fn destroying_a_joint_twice_is_harmless() {
        let mut world = world();
        let anchor = world.create_body(&BodyDesc::fixed(Vec2::ZERO));
        let plank = world.create_body(&BodyDesc::dynamic(Vec2::new(1.0, 0.0)).with_fixture(
            FixtureDesc::new(
                ShapeDesc::Box {
                    half_extents: Vec2::new(1.0, 0.125),
                },
                1.0,
            ),
        ));
        let joint = world.create_joint(
            anchor,
            plank,
            &JointDesc::Revolute {
                anchor: Vec2::ZERO,
                limits: None,
            },
        );
        assert_eq!(world.joint_count(), 1);

        world.destroy_joint(joint);
        world.destroy_joint(joint);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn wheel_joint_counts_once_and_takes_its_axle_along() {
        let mut world = world();
        let chassis = world.create_body(
            &BodyDesc::dynamic(Vec2::new(0.0, 2.0)).with_tag(BodyTag::Vehicle).with_fixture(
                FixtureDesc::new(
                    ShapeDesc::Box {
                        half_extents: Vec2::new(2.0, 0.5),
                    },
                    1.0,
                ),
            ),
        );
        let wheel = world.create_body(
            &BodyDesc::dynamic(Vec2::new(1.0, 1.0))
                .with_tag(BodyTag::Vehicle)
                .with_fixture(wheel_fixture(0.5)),
        );
        let joint = world.create_joint(
            chassis,
            wheel,
            &JointDesc::Wheel {
                anchor: Vec2::new(1.0, 1.0),
                axis: Vec2::Y,
                frequency_hz: 4.0,
                damping_ratio: 0.7,
                motor: Some(WheelMotor {
                    speed: 10.0,
                    max_torque: 50.0,
                }),
            },
        );

        assert_eq!(world.body_count(), 2);
        assert_eq!(world.joint_count(), 1);
        assert_eq!(world.rigid_bodies.len(), 3);
        assert_eq!(world.impulse_joints.len(), 2);

        world.destroy_joint(joint);
        assert_eq!(world.joint_count(), 0);
        assert_eq!(world.rigid_bodies.len(), 2);
        assert_eq!(world.impulse_joints.len(), 0);
        assert_eq!(world.body_position(wheel), Some(Vec2::new(1.0, 1.0)));

        // Motor calls on a destroyed wheel are ignored.
        world.set_motor_speed(joint, 5.0);
    }

    #[test]
    fn driven_wheel_spins_clockwise_for_positive_speed() {
        let mut world = world();
        let hub = world.create_body(&BodyDesc::fixed(Vec2::ZERO).with_tag(BodyTag::Vehicle));
        let wheel = world.create_body(
            &BodyDesc::dynamic(Vec2::ZERO)
                .with_tag(BodyTag::Vehicle)
                .with_fixture(wheel_fixture(0.5)),
        );
        let joint = world.create_joint(
            hub,
            wheel,
            &JointDesc::Wheel {
                anchor: Vec2::ZERO,
                axis: Vec2::Y,
                frequency_hz: 4.0,
                damping_ratio: 0.7,
                motor: Some(WheelMotor {
                    speed: 0.0,
                    max_torque: 100.0,
                }),
            },
        );

        world.set_motor_speed(joint, 5.0);
        run(&mut world, 60);

        let spin = world
            .rigid_body_handle(wheel)
            .and_then(|handle| world.rigid_bodies.get(handle))
            .map(|rb| rb.angvel())
            .expect("wheel exists");
        assert!(spin < -1.0, "wheel should spin clockwise, angvel = {spin}");
    }

    #[test]
    fn hulk_drives_forward_on_the_course() {
        let (mut world, car) = hulk_on_course();
        car.move_forward(&mut world);
        run(&mut world, 180);

        let x = car.x(&world).expect("chassis exists");
        assert!(x > 2.0, "car should have driven toward +x, x = {x}");
    }

    #[test]
    fn hulk_reverses_on_the_course() {
        let (mut world, car) = hulk_on_course();
        car.move_backward(&mut world);
        run(&mut world, 120);

        let x = car.x(&world).expect("chassis exists");
        assert!(x < -1.0, "car should have reversed toward -x, x = {x}");
    }

    #[test]
    fn idle_hulk_settles_without_drifting() {
        let (mut world, car) = hulk_on_course();
        run(&mut world, 120);

        let position = car.position(&world).expect("chassis exists");
        assert!(position.x.abs() < 2.0, "idle car drifted to x = {}", position.x);
        assert!(position.y > 1.0, "chassis should ride on its wheels, y = {}", position.y);
    }
}
