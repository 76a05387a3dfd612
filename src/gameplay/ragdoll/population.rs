use super::{PartKind, Ragdoll, RagdollFactory, RagdollId, RagdollSize};
use crate::physics::{BodyQuery, ContactEvent, PhysicsWorld};
use bevy::log::info;
use bevy::math::Vec2;
use std::collections::HashSet;

/// One ragdoll hurt by a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackedRagdoll {
    pub id: RagdollId,
    pub dead: bool,
    pub impulse: f32,
    pub kind: PartKind,
}

impl AttackedRagdoll {
    fn fallen(id: RagdollId) -> Self {
        Self {
            id,
            dead: true,
            impulse: 0.0,
            kind: PartKind::Head,
        }
    }
}

#[derive(Debug)]
struct Member {
    ragdoll: Ragdoll,
    fallen_reported: bool,
}

#[derive(Debug, Default)]
pub struct RagdollPopulation {
    factory: RagdollFactory,
    members: Vec<Member>,
    attacked: Vec<AttackedRagdoll>,
}

impl RagdollPopulation {
    pub fn create(
        &mut self,
        world: &mut dyn PhysicsWorld,
        size: RagdollSize,
        x: f32,
        y: f32,
    ) -> RagdollId {
        let ragdoll = self.factory.create(world, size, Vec2::new(x, y));
        let id = ragdoll.id();
        self.members.push(Member {
            ragdoll,
            fallen_reported: false,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RagdollId> + '_ {
        self.members.iter().map(|member| member.ragdoll.id())
    }

    pub fn get(&self, id: RagdollId) -> Option<&Ragdoll> {
        self.members
            .iter()
            .map(|member| &member.ragdoll)
            .find(|ragdoll| ragdoll.id() == id)
    }

    /// Offers `contact` to every live ragdoll and returns who got hurt. A
    /// ragdoll that has just fallen off the course is reported dead once.
    pub fn post_solve(
        &mut self,
        contact: &ContactEvent,
        bodies: &dyn BodyQuery,
    ) -> &[AttackedRagdoll] {
        self.attacked.clear();
        for member in &mut self.members {
            let id = member.ragdoll.id();
            if let Some(broken) = member.ragdoll.break_joint_on_contact(contact) {
                self.attacked.push(AttackedRagdoll {
                    id,
                    dead: member.ragdoll.is_dead(),
                    impulse: broken.impulse,
                    kind: broken.kind,
                });
            } else if !member.fallen_reported && member.ragdoll.is_down(bodies) {
                member.fallen_reported = true;
                self.attacked.push(AttackedRagdoll::fallen(id));
            }
        }
        &self.attacked
    }

    /// Destroys broken joints, then drops every ragdoll reported dead by the
    /// latest [`Self::post_solve`] along with any reported fallen since the
    /// previous update.
    pub fn update_bodies_state(&mut self, world: &mut dyn PhysicsWorld) {
        for member in &mut self.members {
            member.ragdoll.update_bodies_state(world);
        }

        let dead: HashSet<RagdollId> = self
            .attacked
            .drain(..)
            .filter(|attacked| attacked.dead)
            .map(|attacked| attacked.id)
            .collect();

        self.members.retain(|member| {
            let keep = !member.fallen_reported && !dead.contains(&member.ragdoll.id());
            if !keep {
                info!("Ragdoll {:?} is out of the game.", member.ragdoll.id());
            }
            keep
        });
    }
}
