use crate::physics::{
    BodyDesc, BodyHandle, BodyQuery, BodyTag, FixtureDesc, JointDesc, JointHandle, PhysicsWorld,
    ShapeDesc, WheelMotor,
};
use bevy::log::info;
use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

const SUSPENSION_AXIS: Vec2 = Vec2::Y;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarKind {
    Hulk,
    Spider,
}

impl CarKind {
    pub const ALL: [CarKind; 2] = [CarKind::Hulk, CarKind::Spider];

    /// Id used by `config/vehicles.toml` and the score board.
    pub fn id(self) -> &'static str {
        match self {
            CarKind::Hulk => "hulk",
            CarKind::Spider => "spider",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CarKind::Hulk => "Hulk",
            CarKind::Spider => "Spider",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    fn geometry(self) -> CarGeometry {
        match self {
            CarKind::Hulk => CarGeometry {
                chassis_position: Vec2::new(0.0, 1.75),
                chassis: vec![
                    FixtureDesc::new(
                        ShapeDesc::Box {
                            half_extents: Vec2::new(4.0, 0.5),
                        },
                        1.0,
                    ),
                    // Cabin adds shape, not mass.
                    FixtureDesc::new(
                        ShapeDesc::Polygon {
                            vertices: vec![
                                Vec2::new(0.0, 0.5),
                                Vec2::new(3.0, 0.5),
                                Vec2::new(1.5, 2.0),
                                Vec2::new(0.0, 2.0),
                            ],
                        },
                        0.0,
                    ),
                ],
                wheel_radius: 1.5,
                wheel_density: 10.0,
                wheel_friction: 1.0,
                rear_axle: Vec2::new(-2.5, 0.35),
                front_axle: Vec2::new(2.5, 0.4),
            },
            CarKind::Spider => CarGeometry {
                chassis_position: Vec2::new(0.0, 1.0),
                chassis: vec![FixtureDesc::new(
                    ShapeDesc::Polygon {
                        vertices: vec![
                            Vec2::new(-1.5, -0.5),
                            Vec2::new(1.5, -0.5),
                            Vec2::new(1.5, 0.0),
                            Vec2::new(0.0, 0.9),
                            Vec2::new(-1.15, 0.9),
                            Vec2::new(-1.5, 0.2),
                        ],
                    },
                    1.0,
                )],
                wheel_radius: 0.4,
                wheel_density: 20.0,
                wheel_friction: 0.9,
                rear_axle: Vec2::new(-1.0, 0.35),
                front_axle: Vec2::new(1.0, 0.4),
            },
        }
    }
}

struct CarGeometry {
    chassis_position: Vec2,
    chassis: Vec<FixtureDesc>,
    wheel_radius: f32,
    wheel_density: f32,
    wheel_friction: f32,
    rear_axle: Vec2,
    front_axle: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarTuning {
    pub frequency_hz: f32,
    pub damping_ratio: f32,
    pub speed: f32,
    pub max_motor_torque: f32,
}

/// Player vehicle: chassis on two sprung wheels, rear-wheel drive.
#[derive(Debug, Clone)]
pub struct Car {
    kind: CarKind,
    tuning: CarTuning,
    chassis: BodyHandle,
    drive: JointHandle,
    suspension: JointHandle,
}

impl Car {
    pub fn create(world: &mut dyn PhysicsWorld, kind: CarKind, tuning: CarTuning) -> Self {
        let geometry = kind.geometry();

        let chassis = world.create_body(
            &geometry
                .chassis
                .into_iter()
                .fold(BodyDesc::dynamic(geometry.chassis_position), BodyDesc::with_fixture)
                .with_tag(BodyTag::Vehicle),
        );

        let wheel = |position: Vec2| {
            BodyDesc::dynamic(position).with_tag(BodyTag::Vehicle).with_fixture(
                FixtureDesc::new(
                    ShapeDesc::Circle {
                        radius: geometry.wheel_radius,
                    },
                    geometry.wheel_density,
                )
                .with_friction(geometry.wheel_friction),
            )
        };
        let rear_wheel = world.create_body(&wheel(geometry.rear_axle));
        let front_wheel = world.create_body(&wheel(geometry.front_axle));

        let spring = |anchor: Vec2, motor: Option<WheelMotor>| JointDesc::Wheel {
            anchor,
            axis: SUSPENSION_AXIS,
            frequency_hz: tuning.frequency_hz,
            damping_ratio: tuning.damping_ratio,
            motor,
        };
        let drive = world.create_joint(
            chassis,
            rear_wheel,
            &spring(
                geometry.rear_axle,
                Some(WheelMotor {
                    speed: 0.0,
                    max_torque: tuning.max_motor_torque,
                }),
            ),
        );
        let suspension =
            world.create_joint(chassis, front_wheel, &spring(geometry.front_axle, None));

        info!("Spawned {} with tuning {:?}.", kind.id(), tuning);

        Self {
            kind,
            tuning,
            chassis,
            drive,
            suspension,
        }
    }

    pub fn kind(&self) -> CarKind {
        self.kind
    }

    pub fn chassis(&self) -> BodyHandle {
        self.chassis
    }

    pub fn drive_joint(&self) -> JointHandle {
        self.drive
    }

    pub fn suspension_joint(&self) -> JointHandle {
        self.suspension
    }

    /// Drives toward the finish line.
    pub fn move_forward(&self, world: &mut dyn PhysicsWorld) {
        world.set_motor_speed(self.drive, self.tuning.speed);
    }

    pub fn move_backward(&self, world: &mut dyn PhysicsWorld) {
        world.set_motor_speed(self.drive, -self.tuning.speed);
    }

    pub fn stop(&self, world: &mut dyn PhysicsWorld) {
        world.set_motor_speed(self.drive, 0.0);
    }

    pub fn position(&self, bodies: &dyn BodyQuery) -> Option<Vec2> {
        bodies.body_position(self.chassis)
    }

    pub fn x(&self, bodies: &dyn BodyQuery) -> Option<f32> {
        self.position(bodies).map(|position| position.x)
    }

    pub fn y(&self, bodies: &dyn BodyQuery) -> Option<f32> {
        self.position(bodies).map(|position| position.y)
    }
}
