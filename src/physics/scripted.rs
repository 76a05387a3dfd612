//! Deterministic in-memory [`PhysicsWorld`] for tests.
//!
//! Bodies never move on their own: tests place them with
//! [`ScriptedWorld::set_position`] and queue the contacts the next
//! [`PhysicsWorld::step`] should report.

use super::{
    BodyDesc, BodyHandle, BodyQuery, BodyTag, ContactEvent, ContactListener, DebugDraw,
    JointDesc, JointHandle, PhysicsWorld, StepSettings, WorldDesc,
};
use bevy::math::Vec2;
use std::collections::VecDeque;

#[derive(Debug)]
struct ScriptedBody {
    desc: BodyDesc,
    position: Vec2,
    angular_impulse: f32,
}

#[derive(Debug, Default)]
pub struct ScriptedWorld {
    desc: Option<WorldDesc>,
    bodies: Vec<ScriptedBody>,
    joints: Vec<(BodyHandle, BodyHandle, JointDesc, bool)>,
    destroyed_joints: Vec<JointHandle>,
    motor_speeds: Vec<(JointHandle, f32)>,
    pending_steps: VecDeque<Vec<ContactEvent>>,
    steps: usize,
}

impl ScriptedWorld {
    pub fn new(desc: &WorldDesc) -> Self {
        Self {
            desc: Some(*desc),
            ..Self::default()
        }
    }

    pub fn world_desc(&self) -> Option<&WorldDesc> {
        self.desc.as_ref()
    }

    pub fn body_desc(&self, body: BodyHandle) -> Option<&BodyDesc> {
        self.bodies.get(body.0 as usize).map(|scripted| &scripted.desc)
    }

    pub fn bodies_tagged(&self, tag: BodyTag) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .enumerate()
            .filter(|(_, scripted)| scripted.desc.tag == Some(tag))
            .map(|(i, _)| BodyHandle(i as u32))
            .collect()
    }

    pub fn joint_desc(&self, joint: JointHandle) -> Option<&JointDesc> {
        self.joints.get(joint.0 as usize).map(|(_, _, desc, _)| desc)
    }

    pub fn joint_bodies(&self, joint: JointHandle) -> Option<(BodyHandle, BodyHandle)> {
        self.joints.get(joint.0 as usize).map(|(a, b, _, _)| (*a, *b))
    }

    pub fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(scripted) = self.bodies.get_mut(body.0 as usize) {
            scripted.position = position;
        }
    }

    pub fn angular_impulse(&self, body: BodyHandle) -> f32 {
        self.bodies
            .get(body.0 as usize)
            .map_or(0.0, |scripted| scripted.angular_impulse)
    }

    /// Contacts the next step reports, in order.
    pub fn queue_step(&mut self, contacts: Vec<ContactEvent>) {
        self.pending_steps.push_back(contacts);
    }

    pub fn destroyed_joints(&self) -> &[JointHandle] {
        &self.destroyed_joints
    }

    pub fn motor_speeds(&self) -> &[(JointHandle, f32)] {
        &self.motor_speeds
    }

    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl BodyQuery for ScriptedWorld {
    fn body_position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.0 as usize).map(|scripted| scripted.position)
    }
}

impl PhysicsWorld for ScriptedWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(ScriptedBody {
            desc: desc.clone(),
            position: desc.position,
            angular_impulse: 0.0,
        });
        handle
    }

    fn create_joint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        desc: &JointDesc,
    ) -> JointHandle {
        let handle = JointHandle(self.joints.len() as u32);
        self.joints.push((body_a, body_b, *desc, true));
        handle
    }

    fn destroy_joint(&mut self, joint: JointHandle) {
        if let Some((_, _, _, alive)) = self.joints.get_mut(joint.0 as usize) {
            if *alive {
                *alive = false;
                self.destroyed_joints.push(joint);
            }
        }
    }

    fn set_motor_speed(&mut self, joint: JointHandle, speed: f32) {
        self.motor_speeds.push((joint, speed));
    }

    fn apply_angular_impulse(&mut self, body: BodyHandle, impulse: f32) {
        if let Some(scripted) = self.bodies.get_mut(body.0 as usize) {
            scripted.angular_impulse += impulse;
        }
    }

    fn body_tag(&self, body: BodyHandle) -> Option<BodyTag> {
        self.bodies.get(body.0 as usize).and_then(|scripted| scripted.desc.tag)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn joint_count(&self) -> usize {
        self.joints.iter().filter(|(_, _, _, alive)| *alive).count()
    }

    fn step(&mut self, _settings: &StepSettings, listener: &mut dyn ContactListener) {
        self.steps += 1;
        let contacts = self.pending_steps.pop_front().unwrap_or_default();
        for contact in &contacts {
            listener.post_solve(contact, &*self);
        }
    }

    fn draw(&self, drawer: &mut dyn DebugDraw) {
        for scripted in &self.bodies {
            drawer.draw_circle(scripted.position, 0.1, 0.0, scripted.desc.kind, true);
        }
    }
}
