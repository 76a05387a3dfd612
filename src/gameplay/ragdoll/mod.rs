pub mod population;

use crate::physics::{
    BodyDesc, BodyHandle, BodyQuery, BodyTag, ContactEvent, FixtureDesc, JointDesc, JointHandle,
    PhysicsWorld, ShapeDesc,
};
use bevy::log::debug;
use bevy::math::Vec2;
use serde::Deserialize;

pub use population::{AttackedRagdoll, RagdollPopulation};

const IMPULSE_MULTIPLIER: f32 = 4.0;
const HEAD_BREAK_IMPULSE: f32 = 15.0;
const ARM_BREAK_IMPULSE: f32 = 10.0;
const LEG_BREAK_IMPULSE: f32 = 12.0;

const PART_DENSITY: f32 = 1.0;
const LEG_LIMIT_DEGREES: [f32; 2] = [-10.0, 10.0];
const HEAD_LIMIT_DEGREES: [f32; 2] = [-10.0, 10.0];
const ARM_LIMIT_DEGREES: [f32; 2] = [-80.0, 90.0];

/// Parts below this height no longer count as standing on the course.
pub const DOWN_LEVEL_Y: f32 = -3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RagdollId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodyPart {
    pub const ALL: [BodyPart; 6] = [
        BodyPart::Head,
        BodyPart::Torso,
        BodyPart::LeftArm,
        BodyPart::RightArm,
        BodyPart::LeftLeg,
        BodyPart::RightLeg,
    ];

    /// Parts hinged to the torso by a breakable joint, in joint-arena order.
    pub const LIMBS: [BodyPart; 5] = [
        BodyPart::Head,
        BodyPart::LeftArm,
        BodyPart::RightArm,
        BodyPart::LeftLeg,
        BodyPart::RightLeg,
    ];

    pub fn kind(self) -> PartKind {
        match self {
            BodyPart::Head => PartKind::Head,
            BodyPart::Torso => PartKind::Torso,
            BodyPart::LeftArm | BodyPart::RightArm => PartKind::Arm,
            BodyPart::LeftLeg | BodyPart::RightLeg => PartKind::Leg,
        }
    }

    fn index(self) -> usize {
        match self {
            BodyPart::Head => 0,
            BodyPart::Torso => 1,
            BodyPart::LeftArm => 2,
            BodyPart::RightArm => 3,
            BodyPart::LeftLeg => 4,
            BodyPart::RightLeg => 5,
        }
    }

    fn limb_index(self) -> Option<usize> {
        match self {
            BodyPart::Head => Some(0),
            BodyPart::Torso => None,
            BodyPart::LeftArm => Some(1),
            BodyPart::RightArm => Some(2),
            BodyPart::LeftLeg => Some(3),
            BodyPart::RightLeg => Some(4),
        }
    }
}

/// Scoring category of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Head,
    Arm,
    Leg,
    Torso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagdollSize {
    Small,
    Normal,
    Big,
}

impl RagdollSize {
    pub fn multiplier(self) -> f32 {
        match self {
            RagdollSize::Small => 0.2,
            RagdollSize::Normal => 0.3,
            RagdollSize::Big => 0.45,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RagdollSize::Small => "small",
            RagdollSize::Normal => "normal",
            RagdollSize::Big => "big",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointState {
    Intact,
    /// Break impulse exceeded; the engine joint still exists until the next
    /// [`Ragdoll::update_bodies_state`].
    Broken,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakableJoint {
    pub part: BodyPart,
    pub joint: JointHandle,
    pub threshold: f32,
    pub state: JointState,
}

impl BreakableJoint {
    fn is_unbroken(&self) -> bool {
        self.state == JointState::Intact
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBreak {
    pub impulse: f32,
    pub kind: PartKind,
}

#[derive(Debug)]
pub struct Ragdoll {
    id: RagdollId,
    parts: [BodyHandle; 6],
    joints: [BreakableJoint; 5],
}

impl Ragdoll {
    /// Builds a six-part humanoid whose left leg's lower-left corner sits on
    /// `anchor`. Everything else is laid out relative to that corner.
    pub fn create(
        world: &mut dyn PhysicsWorld,
        id: RagdollId,
        size: RagdollSize,
        anchor: Vec2,
    ) -> Self {
        let s = size.multiplier();

        let leg_half = Vec2::new(0.5 * s, 2.0 * s);
        let torso_half = Vec2::new(1.5 * s, 2.0 * s);
        let arm_half = Vec2::new(1.5 * s, 0.25 * s);
        let head_radius = s;

        let left_leg_pos = anchor + leg_half;
        let torso_pos = Vec2::new(
            anchor.x + torso_half.x,
            anchor.y + 2.0 * leg_half.y + torso_half.y,
        );
        let right_leg_pos = Vec2::new(
            torso_pos.x + torso_half.x - leg_half.x,
            anchor.y + leg_half.y,
        );
        let head_pos = Vec2::new(torso_pos.x, torso_pos.y + torso_half.y + head_radius);
        let shoulder_y = torso_pos.y + 0.4 * torso_half.y;
        let left_arm_pos = Vec2::new(torso_pos.x - torso_half.x - arm_half.x, shoulder_y);
        let right_arm_pos = Vec2::new(torso_pos.x + torso_half.x + arm_half.x, shoulder_y);

        let mut spawn = |part: BodyPart, position: Vec2, shape: ShapeDesc| {
            world.create_body(
                &BodyDesc::dynamic(position)
                    .with_tag(BodyTag::RagdollPart { ragdoll: id, part })
                    .with_fixture(FixtureDesc::new(shape, PART_DENSITY)),
            )
        };

        let boxed = |half_extents: Vec2| ShapeDesc::Box { half_extents };
        let head = spawn(BodyPart::Head, head_pos, ShapeDesc::Circle { radius: head_radius });
        let torso = spawn(BodyPart::Torso, torso_pos, boxed(torso_half));
        let left_arm = spawn(BodyPart::LeftArm, left_arm_pos, boxed(arm_half));
        let right_arm = spawn(BodyPart::RightArm, right_arm_pos, boxed(arm_half));
        let left_leg = spawn(BodyPart::LeftLeg, left_leg_pos, boxed(leg_half));
        let right_leg = spawn(BodyPart::RightLeg, right_leg_pos, boxed(leg_half));

        let hip_y = torso_pos.y - torso_half.y;
        let neck = Vec2::new(torso_pos.x, head_pos.y - head_radius);
        let left_shoulder = Vec2::new(torso_pos.x - torso_half.x, shoulder_y);
        let right_shoulder = Vec2::new(torso_pos.x + torso_half.x, shoulder_y);
        let hinges = [
            (BodyPart::Head, head, neck, HEAD_LIMIT_DEGREES),
            (BodyPart::LeftArm, left_arm, left_shoulder, ARM_LIMIT_DEGREES),
            (BodyPart::RightArm, right_arm, right_shoulder, ARM_LIMIT_DEGREES),
            (BodyPart::LeftLeg, left_leg, Vec2::new(left_leg_pos.x, hip_y), LEG_LIMIT_DEGREES),
            (BodyPart::RightLeg, right_leg, Vec2::new(right_leg_pos.x, hip_y), LEG_LIMIT_DEGREES),
        ];

        let thresholds = Self::thresholds(size);
        let joints = std::array::from_fn(|i| {
            let (part, body, anchor, [lower, upper]) = hinges[i];
            let joint = world.create_joint(
                body,
                torso,
                &JointDesc::Revolute {
                    anchor,
                    limits: Some([lower.to_radians(), upper.to_radians()]),
                },
            );
            BreakableJoint {
                part,
                joint,
                threshold: thresholds[i],
                state: JointState::Intact,
            }
        });

        debug!("Spawned {} ragdoll {:?} at {:?}.", size.label(), id, anchor);

        Self {
            id,
            parts: [head, torso, left_arm, right_arm, left_leg, right_leg],
            joints,
        }
    }

    /// Break impulses in [`BodyPart::LIMBS`] order.
    pub fn thresholds(size: RagdollSize) -> [f32; 5] {
        let scale = IMPULSE_MULTIPLIER * size.multiplier();
        [
            scale * HEAD_BREAK_IMPULSE,
            scale * ARM_BREAK_IMPULSE,
            scale * ARM_BREAK_IMPULSE,
            scale * LEG_BREAK_IMPULSE,
            scale * LEG_BREAK_IMPULSE,
        ]
    }

    pub fn id(&self) -> RagdollId {
        self.id
    }

    pub fn body(&self, part: BodyPart) -> BodyHandle {
        self.parts[part.index()]
    }

    pub fn joint(&self, part: BodyPart) -> Option<&BreakableJoint> {
        part.limb_index().map(|i| &self.joints[i])
    }

    pub fn joints(&self) -> &[BreakableJoint; 5] {
        &self.joints
    }

    /// Marks at most one joint as broken when `contact` touches one of this
    /// ragdoll's limbs harder than its threshold.
    pub fn break_joint_on_contact(&mut self, contact: &ContactEvent) -> Option<JointBreak> {
        for tag in [contact.tag_a, contact.tag_b].into_iter().flatten() {
            let BodyTag::RagdollPart { ragdoll, part } = tag else {
                continue;
            };
            if ragdoll != self.id {
                continue;
            }
            let Some(limb) = part.limb_index() else {
                continue;
            };
            let joint = &mut self.joints[limb];
            if !joint.is_unbroken() {
                continue;
            }

            let impulse = contact.max_normal_impulse();
            if impulse > joint.threshold {
                joint.state = JointState::Broken;
                return Some(JointBreak {
                    impulse,
                    kind: part.kind(),
                });
            }
        }
        None
    }

    pub fn broken_count(&self) -> usize {
        self.joints.iter().filter(|joint| !joint.is_unbroken()).count()
    }

    pub fn is_dead(&self) -> bool {
        let broken = self.broken_count();
        let unbroken = self.joints.len() - broken;
        let head_off = !self.joints[0].is_unbroken();
        unbroken < 3 || broken > 2 || head_off
    }

    /// True when every limb still hinged to the torso has dropped below
    /// [`DOWN_LEVEL_Y`].
    pub fn is_down(&self, bodies: &dyn BodyQuery) -> bool {
        self.joints
            .iter()
            .filter(|joint| joint.state != JointState::Destroyed)
            .all(|joint| {
                bodies
                    .body_position(self.body(joint.part))
                    .is_some_and(|position| position.y < DOWN_LEVEL_Y)
            })
    }

    /// Destroys the engine joint of every newly broken limb.
    pub fn update_bodies_state(&mut self, world: &mut dyn PhysicsWorld) {
        for joint in self.joints.iter_mut().filter(|joint| joint.state == JointState::Broken) {
            world.destroy_joint(joint.joint);
            joint.state = JointState::Destroyed;
        }
    }
}

/// Hands out ragdoll ids, starting at 1 and never reusing one.
#[derive(Debug)]
pub struct RagdollFactory {
    next_id: u32,
}

impl Default for RagdollFactory {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl RagdollFactory {
    pub fn create(
        &mut self,
        world: &mut dyn PhysicsWorld,
        size: RagdollSize,
        anchor: Vec2,
    ) -> Ragdoll {
        let id = RagdollId(self.next_id);
        self.next_id += 1;
        Ragdoll::create(world, id, size, anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::scripted::ScriptedWorld;

    fn contact_on(ragdoll: &Ragdoll, part: BodyPart, impulses: &[f32]) -> ContactEvent {
        ContactEvent {
            body_a: ragdoll.body(part),
            body_b: BodyHandle(u32::MAX),
            tag_a: Some(BodyTag::RagdollPart {
                ragdoll: ragdoll.id(),
                part,
            }),
            tag_b: Some(BodyTag::Vehicle),
            normal_impulses: impulses.to_vec(),
        }
    }

    fn spawn(world: &mut ScriptedWorld, size: RagdollSize) -> Ragdoll {
        RagdollFactory::default().create(world, size, Vec2::new(15.0, 0.0))
    }

    #[test]
    fn thresholds_scale_with_size() {
        for size in [RagdollSize::Small, RagdollSize::Normal, RagdollSize::Big] {
            let s = size.multiplier();
            let expected = [60.0 * s, 40.0 * s, 40.0 * s, 48.0 * s, 48.0 * s];
            let actual = Ragdoll::thresholds(size);
            for (actual, expected) in actual.iter().zip(expected) {
                assert!((actual - expected).abs() < 1e-5, "{size:?}: {actual} != {expected}");
            }
        }
    }

    #[test]
    fn create_builds_six_parts_and_five_limited_joints() {
        let mut world = ScriptedWorld::default();
        let ragdoll = spawn(&mut world, RagdollSize::Normal);

        assert_eq!(world.body_count(), 6);
        assert_eq!(world.joint_count(), 5);
        for part in BodyPart::ALL {
            assert_eq!(
                world.body_tag(ragdoll.body(part)),
                Some(BodyTag::RagdollPart {
                    ragdoll: ragdoll.id(),
                    part
                })
            );
        }

        let left_leg = world.body_desc(ragdoll.body(BodyPart::LeftLeg)).expect("left leg");
        assert!((left_leg.position.x - (15.0 + 0.15)).abs() < 1e-5);
        assert!((left_leg.position.y - 0.6).abs() < 1e-5);
    }

    #[test]
    fn factory_ids_are_monotonic() {
        let mut world = ScriptedWorld::default();
        let mut factory = RagdollFactory::default();
        let first = factory.create(&mut world, RagdollSize::Small, Vec2::ZERO);
        let second = factory.create(&mut world, RagdollSize::Big, Vec2::ZERO);
        assert_eq!(first.id(), RagdollId(1));
        assert_eq!(second.id(), RagdollId(2));
    }

    #[test]
    fn weak_contact_breaks_nothing() {
        let mut world = ScriptedWorld::default();
        let mut ragdoll = spawn(&mut world, RagdollSize::Normal);
        let contact = contact_on(&ragdoll, BodyPart::LeftArm, &[1.0, 2.0]);

        assert_eq!(ragdoll.break_joint_on_contact(&contact), None);
        assert_eq!(ragdoll.broken_count(), 0);
        assert!(!ragdoll.is_dead());
    }

    #[test]
    fn strong_contact_breaks_the_touched_limb_once() {
        let mut world = ScriptedWorld::default();
        let mut ragdoll = spawn(&mut world, RagdollSize::Normal);
        let contact = contact_on(&ragdoll, BodyPart::LeftLeg, &[3.0, 20.0]);

        let broken = ragdoll.break_joint_on_contact(&contact);
        assert_eq!(
            broken,
            Some(JointBreak {
                impulse: 20.0,
                kind: PartKind::Leg
            })
        );
        assert_eq!(ragdoll.break_joint_on_contact(&contact), None);
        assert_eq!(
            ragdoll.joint(BodyPart::LeftLeg).map(|joint| joint.state),
            Some(JointState::Broken)
        );
        assert_eq!(
            ragdoll.joint(BodyPart::RightLeg).map(|joint| joint.state),
            Some(JointState::Intact)
        );
    }

    #[test]
    fn torso_and_foreign_contacts_do_not_match() {
        let mut world = ScriptedWorld::default();
        let mut factory = RagdollFactory::default();
        let mut ragdoll = factory.create(&mut world, RagdollSize::Normal, Vec2::ZERO);
        let other = factory.create(&mut world, RagdollSize::Normal, Vec2::new(10.0, 0.0));

        let torso_hit = contact_on(&ragdoll, BodyPart::Torso, &[500.0]);
        let other_hit = contact_on(&other, BodyPart::Head, &[500.0]);
        let untagged = ContactEvent {
            tag_a: None,
            tag_b: Some(BodyTag::Ground),
            ..torso_hit.clone()
        };

        assert_eq!(ragdoll.break_joint_on_contact(&torso_hit), None);
        assert_eq!(ragdoll.break_joint_on_contact(&other_hit), None);
        assert_eq!(ragdoll.break_joint_on_contact(&untagged), None);
    }

    #[test]
    fn head_off_is_always_dead() {
        let mut world = ScriptedWorld::default();
        let mut ragdoll = spawn(&mut world, RagdollSize::Small);
        ragdoll.break_joint_on_contact(&contact_on(&ragdoll, BodyPart::Head, &[100.0]));
        assert!(ragdoll.is_dead());
    }

    #[test]
    fn dead_after_third_limb_in_any_order() {
        let orders = [
            [BodyPart::LeftArm, BodyPart::RightArm, BodyPart::LeftLeg],
            [BodyPart::RightLeg, BodyPart::LeftLeg, BodyPart::RightArm],
            [BodyPart::LeftLeg, BodyPart::RightArm, BodyPart::LeftArm],
        ];
        for order in orders {
            let mut world = ScriptedWorld::default();
            let mut ragdoll = spawn(&mut world, RagdollSize::Big);
            for (i, part) in order.into_iter().enumerate() {
                assert!(!ragdoll.is_dead(), "{order:?} dead after {i} breaks");
                let broken = ragdoll.break_joint_on_contact(&contact_on(&ragdoll, part, &[500.0]));
                assert!(broken.is_some());
            }
            assert!(ragdoll.is_dead(), "{order:?} should be dead");
        }
    }

    #[test]
    fn update_destroys_each_broken_joint_exactly_once() {
        let mut world = ScriptedWorld::default();
        let mut ragdoll = spawn(&mut world, RagdollSize::Normal);
        ragdoll.break_joint_on_contact(&contact_on(&ragdoll, BodyPart::RightArm, &[500.0]));

        ragdoll.update_bodies_state(&mut world);
        ragdoll.update_bodies_state(&mut world);

        let joint = ragdoll.joint(BodyPart::RightArm).copied().expect("arm joint");
        assert_eq!(joint.state, JointState::Destroyed);
        assert_eq!(world.destroyed_joints(), &[joint.joint]);
        assert_eq!(world.joint_count(), 4);
        assert!(!ragdoll.is_dead());
    }

    #[test]
    fn down_when_every_attached_limb_is_below_the_course() {
        let mut world = ScriptedWorld::default();
        let mut ragdoll = spawn(&mut world, RagdollSize::Normal);
        assert!(!ragdoll.is_down(&world));

        for part in BodyPart::LIMBS {
            world.set_position(ragdoll.body(part), Vec2::new(40.0, -4.0));
        }
        assert!(ragdoll.is_down(&world));
        assert!(!ragdoll.is_dead());

        // A torn-off arm lying on the ground no longer counts.
        world.set_position(ragdoll.body(BodyPart::LeftArm), Vec2::new(40.0, 0.0));
        assert!(!ragdoll.is_down(&world));
        ragdoll.break_joint_on_contact(&contact_on(&ragdoll, BodyPart::LeftArm, &[500.0]));
        ragdoll.update_bodies_state(&mut world);
        assert!(ragdoll.is_down(&world));
    }
}
