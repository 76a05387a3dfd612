use crate::physics::{
    BodyDesc, BodyHandle, BodyTag, FixtureDesc, JointDesc, PhysicsWorld, ShapeDesc,
};
use bevy::log::info;
use bevy::math::Vec2;

const GROUND_FRICTION: f32 = 0.6;
const TERRAIN_DX: f32 = 5.0;

const HILLS: [f32; 10] = [0.25, 1.0, 4.0, 0.0, 0.0, -1.0, -2.0, -2.0, -1.25, 0.0];
const MOUNTAIN: [f32; 18] = [
    0.25, 1.0, 4.0, 5.0, 5.0, 7.0, 9.0, 11.0, 11.0, 13.0, 16.5, 19.0, 20.0, 17.0, 14.0, 10.0,
    10.0, 5.0,
];
const RAMP: [f32; 23] = [
    0.25, 1.0, 4.0, 5.0, 5.0, 7.0, 9.0, 11.0, 11.0, 13.0, 16.5, 20.0, 20.0, 17.0, 14.0, 10.0,
    10.0, 5.0, 2.0, 2.0, 2.0, 2.0, 5.0,
];

const MOUNTAIN_START: Vec2 = Vec2::new(300.0, 0.0);
const SECOND_BRIDGE_START: Vec2 = Vec2::new(390.0, 5.0);
const RAMP_START: Vec2 = Vec2::new(430.0, 5.0);
const RAMP_LANDING_GAP: f32 = 20.0;
const FINISH_BEYOND_RAMP: f32 = 35.0;

const TEETER_HALF_EXTENTS: Vec2 = Vec2::new(10.0, 0.25);
const TEETER_POSITION: Vec2 = Vec2::new(140.0, 1.0);
const TEETER_LIMIT_DEGREES: f32 = 8.0;
const TEETER_KICK: f32 = 100.0;
const SECOND_TEETER_LIMIT_DEGREES: f32 = 16.0;
const SECOND_TEETER_TILT_DEGREES: f32 = -10.0;

const BRIDGE_PLANKS: usize = 20;
const PLANK_HALF_EXTENTS: Vec2 = Vec2::new(1.0, 0.125);
const FIRST_BRIDGE_START: Vec2 = Vec2::new(160.0, -0.125);
const FIRST_BRIDGE_DENSITY: f32 = 10.0;
const SECOND_BRIDGE_DENSITY: f32 = 1.0;

const BOX_STACK_X: f32 = 230.0;
const BOX_STACK_HEIGHT: usize = 5;
const BOX_DENSITY: f32 = 0.5;

/// One static edge of the course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSegment {
    pub start: Vec2,
    pub end: Vec2,
}

impl TerrainSegment {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            start: Vec2::new(x1, y1),
            end: Vec2::new(x2, y2),
        }
    }
}

/// Built course. Immutable once [`LevelBuilder::create`] returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    segments: Vec<TerrainSegment>,
    obstacles: Vec<BodyHandle>,
    map_end_x: f32,
}

impl Level {
    pub fn segments(&self) -> &[TerrainSegment] {
        &self.segments
    }

    pub fn obstacles(&self) -> &[BodyHandle] {
        &self.obstacles
    }

    /// Finish line. Reaching it ends the run with a time bonus.
    pub fn map_end_x(&self) -> f32 {
        self.map_end_x
    }
}

pub struct LevelBuilder<'w> {
    world: &'w mut dyn PhysicsWorld,
    ground: BodyHandle,
    obstacles: Vec<BodyHandle>,
}

impl<'w> LevelBuilder<'w> {
    pub fn create(world: &'w mut dyn PhysicsWorld) -> Level {
        let (segments, ramp_end) = terrain_segments();

        let ground = segments.iter().fold(
            BodyDesc::fixed(Vec2::ZERO).with_tag(BodyTag::Ground),
            |desc, segment| {
                desc.with_fixture(
                    FixtureDesc::new(
                        ShapeDesc::Segment {
                            a: segment.start,
                            b: segment.end,
                        },
                        0.0,
                    )
                    .with_friction(GROUND_FRICTION),
                )
            },
        );
        let ground = world.create_body(&ground);

        let mut builder = Self {
            world,
            ground,
            obstacles: Vec::new(),
        };

        let teeter = builder.teeter(TEETER_POSITION, TEETER_LIMIT_DEGREES, 0.0);
        builder.world.apply_angular_impulse(teeter, TEETER_KICK);
        builder.bridge(FIRST_BRIDGE_START, FIRST_BRIDGE_DENSITY);
        builder.box_stack();
        builder.bridge(SECOND_BRIDGE_START, SECOND_BRIDGE_DENSITY);
        builder.teeter(
            Vec2::new(ramp_end.x, TEETER_POSITION.y),
            SECOND_TEETER_LIMIT_DEGREES,
            SECOND_TEETER_TILT_DEGREES.to_radians(),
        );

        let map_end_x = ramp_end.x + FINISH_BEYOND_RAMP;
        info!(
            "Level built: {} terrain segments, {} obstacles, finish at x = {map_end_x}.",
            segments.len(),
            builder.obstacles.len()
        );

        Level {
            segments,
            obstacles: builder.obstacles,
            map_end_x,
        }
    }

    fn obstacle(&mut self, desc: BodyDesc) -> BodyHandle {
        let body = self.world.create_body(&desc.with_tag(BodyTag::Obstacle));
        self.obstacles.push(body);
        body
    }

    fn teeter(&mut self, pivot: Vec2, limit_degrees: f32, tilt: f32) -> BodyHandle {
        let plank = self.obstacle(
            BodyDesc::dynamic(pivot).with_angle(tilt).with_fixture(FixtureDesc::new(
                ShapeDesc::Box {
                    half_extents: TEETER_HALF_EXTENTS,
                },
                1.0,
            )),
        );
        let limit = limit_degrees.to_radians();
        self.world.create_joint(
            self.ground,
            plank,
            &JointDesc::Revolute {
                anchor: pivot,
                limits: Some([-limit, limit]),
            },
        );
        plank
    }

    /// Chain of planks hinged end to end, pinned to the ground at both ends.
    fn bridge(&mut self, start: Vec2, density: f32) {
        let mut previous = self.ground;
        for i in 0..BRIDGE_PLANKS {
            let offset = 2.0 * i as f32;
            let plank = self.obstacle(
                BodyDesc::dynamic(Vec2::new(start.x + 1.0 + offset, start.y)).with_fixture(
                    FixtureDesc::new(
                        ShapeDesc::Box {
                            half_extents: PLANK_HALF_EXTENTS,
                        },
                        density,
                    )
                    .with_friction(GROUND_FRICTION),
                ),
            );
            self.world.create_joint(
                previous,
                plank,
                &JointDesc::Revolute {
                    anchor: Vec2::new(start.x + offset, start.y),
                    limits: None,
                },
            );
            previous = plank;
        }

        self.world.create_joint(
            previous,
            self.ground,
            &JointDesc::Revolute {
                anchor: Vec2::new(start.x + 2.0 * BRIDGE_PLANKS as f32, start.y),
                limits: None,
            },
        );
    }

    fn box_stack(&mut self) {
        for level in 0..BOX_STACK_HEIGHT {
            self.obstacle(
                BodyDesc::dynamic(Vec2::new(BOX_STACK_X, 0.5 + level as f32)).with_fixture(
                    FixtureDesc::new(
                        ShapeDesc::Box {
                            half_extents: Vec2::splat(0.5),
                        },
                        BOX_DENSITY,
                    ),
                ),
            );
        }
    }
}

/// Static course edges plus the point where the ramp's landing run starts.
fn terrain_segments() -> (Vec<TerrainSegment>, Vec2) {
    let mut segments = vec![TerrainSegment::new(-20.0, 0.0, 20.0, 0.0)];

    let (x, y) = profile(&mut segments, 20.0, 0.0, &HILLS);
    let (mut x, _) = profile(&mut segments, x, y, &HILLS);

    // Flat run, a pit spanned by the first bridge, a kicker, then flat again.
    segments.push(TerrainSegment::new(x, 0.0, x + 40.0, 0.0));
    x += 80.0;
    segments.push(TerrainSegment::new(x, 0.0, x + 40.0, 0.0));
    x += 40.0;
    segments.push(TerrainSegment::new(x, 0.0, x + 10.0, 5.0));
    x += 20.0;
    segments.push(TerrainSegment::new(x, 0.0, x + 40.0, 0.0));

    profile(&mut segments, MOUNTAIN_START.x, MOUNTAIN_START.y, &MOUNTAIN);

    let (ramp_x, _) = profile(&mut segments, RAMP_START.x, RAMP_START.y, &RAMP);
    let landing_x = ramp_x + RAMP_LANDING_GAP;
    segments.push(TerrainSegment::new(landing_x, 0.0, landing_x + 40.0, 0.0));

    (segments, Vec2::new(landing_x, 0.0))
}

/// Appends one segment per height, `TERRAIN_DX` apart, and returns the end point.
fn profile(
    segments: &mut Vec<TerrainSegment>,
    mut x: f32,
    mut y: f32,
    heights: &[f32],
) -> (f32, f32) {
    for &height in heights {
        segments.push(TerrainSegment::new(x, y, x + TERRAIN_DX, height));
        y = height;
        x += TERRAIN_DX;
    }
    (x, y)
}
