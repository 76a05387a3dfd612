//! One run of the game: physics world, course, car, ragdolls and score.

pub mod clock;
pub mod systems;

use crate::gameplay::level::{Level, LevelBuilder};
use crate::gameplay::ragdoll::{AttackedRagdoll, PartKind, RagdollPopulation, RagdollSize};
use crate::gameplay::vehicle::car::{Car, CarKind, CarTuning};
use crate::physics::{
    BodyQuery, ContactEvent, ContactListener, DebugDraw, PhysicsWorld, StepSettings, WorldDesc,
};
use bevy::log::{info, warn};
use bevy::math::Vec2;
use std::fmt;
use std::time::Duration;

pub use clock::{Clock, InstantClock};
pub use systems::{ActiveSession, InfoBanner, SessionPlugin};

const DEATH_POINTS: f32 = 1000.0;
const FINISH_POINTS: u32 = 5000;
const FINISH_MS_PER_POINT: f64 = 10.0;
/// The car is lost once its chassis drops to this height.
pub const FELL_OFF_Y: f32 = -15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagdollSpawn {
    pub size: RagdollSize,
    pub position: Vec2,
}

/// Everything a session needs before [`GameSession::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    pub car: CarKind,
    pub tuning: CarTuning,
    pub world: WorldDesc,
    pub duration: Duration,
    pub spawns: Vec<RagdollSpawn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    TimeUp,
    FellOff,
    ReachedFinish { bonus: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Finished(FinishReason),
}

/// What the honoured contact of the last step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStepInfo {
    pub is_pain: bool,
    pub is_dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRejected {
    pub state: SessionState,
}

impl fmt::Display for StepRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot step a session in state {:?}", self.state)
    }
}

impl std::error::Error for StepRejected {}

fn part_multiplier(kind: PartKind) -> f32 {
    match kind {
        PartKind::Head => 3.0,
        PartKind::Arm => 2.0,
        PartKind::Leg => 1.0,
        PartKind::Torso => 0.0,
    }
}

/// Points for one step's attacked ragdolls, rounded half to even.
pub fn step_points(attacked: &[AttackedRagdoll]) -> u32 {
    let total: f32 = attacked
        .iter()
        .map(|hit| {
            let death = if hit.dead { DEATH_POINTS } else { 0.0 };
            death + hit.impulse * part_multiplier(hit.kind)
        })
        .sum();
    total.round_ties_even() as u32
}

fn finish_bonus(time_left_ms: i64) -> u32 {
    let time_points = (time_left_ms.max(0) as f64 / FINISH_MS_PER_POINT).round_ties_even();
    FINISH_POINTS + time_points as u32
}

/// Contact listener half of the session. Lives beside the world so the
/// engine can call back into it while stepping.
#[derive(Debug, Default)]
struct ScoreKeeper {
    population: RagdollPopulation,
    score: u32,
    contact_processed: bool,
    step_info: Option<GameStepInfo>,
}

impl ScoreKeeper {
    fn begin_step(&mut self) {
        self.contact_processed = false;
        self.step_info = None;
    }
}

impl ContactListener for ScoreKeeper {
    fn post_solve(&mut self, contact: &ContactEvent, bodies: &dyn BodyQuery) {
        if self.contact_processed {
            return;
        }
        let attacked = self.population.post_solve(contact, bodies);
        if attacked.is_empty() {
            return;
        }

        let points = step_points(attacked);
        let is_dead = attacked.iter().any(|hit| hit.dead);
        for hit in attacked.iter().filter(|hit| hit.dead) {
            info!("Ragdoll {:?} died ({:?} hit, impulse {:.1}).", hit.id, hit.kind, hit.impulse);
        }

        self.score = self.score.saturating_add(points);
        self.step_info = Some(GameStepInfo {
            is_pain: true,
            is_dead,
        });
        self.contact_processed = true;
    }
}

struct Run<W> {
    world: W,
    level: Level,
    car: Car,
    keeper: ScoreKeeper,
    deadline: Duration,
}

pub struct GameSession<W: PhysicsWorld> {
    setup: SessionSetup,
    clock: Box<dyn Clock>,
    state: SessionState,
    run: Option<Run<W>>,
}

impl<W: PhysicsWorld> GameSession<W> {
    pub fn new(setup: SessionSetup, clock: Box<dyn Clock>) -> Self {
        Self {
            setup,
            clock,
            state: SessionState::Created,
            run: None,
        }
    }

    /// Builds the world with `build_world` and populates it. Only the first
    /// call on a fresh session does anything.
    pub fn create(&mut self, build_world: impl FnOnce(&WorldDesc) -> W) {
        if self.state != SessionState::Created {
            warn!("Ignoring create() on a session in state {:?}.", self.state);
            return;
        }

        let mut world = build_world(&self.setup.world);
        let level = LevelBuilder::create(&mut world);
        let car = Car::create(&mut world, self.setup.car, self.setup.tuning);
        let mut keeper = ScoreKeeper::default();
        for spawn in &self.setup.spawns {
            keeper
                .population
                .create(&mut world, spawn.size, spawn.position.x, spawn.position.y);
        }
        let deadline = self.clock.now() + self.setup.duration;

        info!(
            "Session started with {} and {} ragdolls; {}s on the clock.",
            self.setup.car.id(),
            keeper.population.len(),
            self.setup.duration.as_secs()
        );

        self.run = Some(Run {
            world,
            level,
            car,
            keeper,
            deadline,
        });
        self.state = SessionState::Running;
    }

    /// Advances the world by one fixed interval. Contacts resolved during the
    /// step are scored before this returns.
    pub fn step(&mut self, settings: &StepSettings) -> Result<(), StepRejected> {
        let state = self.state;
        let Some(run) = self.run.as_mut().filter(|_| state == SessionState::Running) else {
            return Err(StepRejected { state });
        };

        run.keeper.begin_step();
        run.world.step(settings, &mut run.keeper);
        Ok(())
    }

    /// Applies deferred joint destruction and drops dead ragdolls. Does
    /// nothing once the run has finished.
    pub fn update_bodies_state(&mut self) {
        if let Some(run) = self.running_mut() {
            run.keeper.population.update_bodies_state(&mut run.world);
        }
    }

    pub fn draw(&self, drawer: &mut dyn DebugDraw) {
        if let Some(run) = &self.run {
            run.world.draw(drawer);
        }
    }

    pub fn move_car_forward(&mut self) {
        if let Some(run) = self.running_mut() {
            run.car.move_forward(&mut run.world);
        }
    }

    pub fn move_car_backward(&mut self) {
        if let Some(run) = self.running_mut() {
            run.car.move_backward(&mut run.world);
        }
    }

    pub fn stop_engine(&mut self) {
        if let Some(run) = self.running_mut() {
            run.car.stop(&mut run.world);
        }
    }

    pub fn car_kind(&self) -> CarKind {
        self.setup.car
    }

    pub fn car_position(&self) -> Option<Vec2> {
        let run = self.run.as_ref()?;
        run.car.position(&run.world)
    }

    pub fn score(&self) -> u32 {
        self.run.as_ref().map_or(0, |run| run.keeper.score)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn step_info(&self) -> Option<GameStepInfo> {
        self.run.as_ref().and_then(|run| run.keeper.step_info)
    }

    /// Milliseconds until the deadline; negative once it has passed.
    pub fn time_left_ms(&self) -> i64 {
        let Some(run) = &self.run else {
            return self.setup.duration.as_millis() as i64;
        };
        run.deadline.as_millis() as i64 - self.clock.now().as_millis() as i64
    }

    pub fn level(&self) -> Option<&Level> {
        self.run.as_ref().map(|run| &run.level)
    }

    pub fn population(&self) -> Option<&RagdollPopulation> {
        self.run.as_ref().map(|run| &run.keeper.population)
    }

    pub fn world(&self) -> Option<&W> {
        self.run.as_ref().map(|run| &run.world)
    }

    /// Checks the end conditions and latches the first one met. Reaching the
    /// finish line awards the time bonus, once.
    pub fn is_game_finished(&mut self) -> bool {
        match self.state {
            SessionState::Created => return false,
            SessionState::Finished(_) => return true,
            SessionState::Running => {}
        }

        let time_left_ms = self.time_left_ms();
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        let car_position = run.car.position(&run.world);

        let reason = if time_left_ms <= 0 {
            FinishReason::TimeUp
        } else if car_position.is_some_and(|position| position.y <= FELL_OFF_Y) {
            FinishReason::FellOff
        } else if car_position.is_some_and(|position| position.x >= run.level.map_end_x()) {
            let bonus = finish_bonus(time_left_ms);
            run.keeper.score = run.keeper.score.saturating_add(bonus);
            FinishReason::ReachedFinish { bonus }
        } else {
            return false;
        };

        info!("Run finished: {:?}, final score {}.", reason, run.keeper.score);
        self.state = SessionState::Finished(reason);
        true
    }

    fn running_mut(&mut self) -> Option<&mut Run<W>> {
        if self.state != SessionState::Running {
            return None;
        }
        self.run.as_mut()
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> Option<&mut W> {
        self.run.as_mut().map(|run| &mut run.world)
    }
}

#[cfg(test)]
mod tests {
    use super::clock::ManualClock;
    use super::*;
    use crate::gameplay::ragdoll::{BodyPart, RagdollId};
    use crate::physics::rapier::RapierWorld;
    use crate::physics::scripted::ScriptedWorld;
    use crate::physics::{BodyHandle, BodyTag, ParticleSystemDesc};

    fn setup() -> SessionSetup {
        SessionSetup {
            car: CarKind::Hulk,
            tuning: CarTuning {
                frequency_hz: 40.0,
                damping_ratio: 0.5,
                speed: 300.0,
                max_motor_torque: 1500.0,
            },
            world: WorldDesc {
                gravity: Vec2::new(0.0, -10.0),
                particles: ParticleSystemDesc {
                    gravity_scale: 0.4,
                    density: 1.2,
                },
            },
            duration: Duration::from_secs(180),
            spawns: vec![
                RagdollSpawn {
                    size: RagdollSize::Normal,
                    position: Vec2::new(15.0, 0.0),
                },
                RagdollSpawn {
                    size: RagdollSize::Small,
                    position: Vec2::new(43.0, 0.0),
                },
                RagdollSpawn {
                    size: RagdollSize::Big,
                    position: Vec2::new(105.0, 0.0),
                },
            ],
        }
    }

    fn settings() -> StepSettings {
        StepSettings {
            dt: 1.0 / 60.0,
            velocity_iterations: 8,
            position_iterations: 1,
            particle_iterations: 3,
        }
    }

    fn running_session() -> (GameSession<ScriptedWorld>, ManualClock) {
        let clock = ManualClock::default();
        let mut session = GameSession::new(setup(), Box::new(clock.clone()));
        session.create(ScriptedWorld::new);
        (session, clock)
    }

    fn ragdoll_ids<W: PhysicsWorld>(session: &GameSession<W>) -> Vec<RagdollId> {
        session.population().expect("population").ids().collect()
    }

    fn hit(
        session: &GameSession<ScriptedWorld>,
        id: RagdollId,
        part: BodyPart,
        impulse: f32,
    ) -> ContactEvent {
        let body = session
            .population()
            .and_then(|population| population.get(id))
            .map(|ragdoll| ragdoll.body(part))
            .expect("live ragdoll");
        ContactEvent {
            body_a: BodyHandle(0),
            body_b: body,
            tag_a: Some(BodyTag::Vehicle),
            tag_b: Some(BodyTag::RagdollPart { ragdoll: id, part }),
            normal_impulses: vec![impulse * 0.5, impulse],
        }
    }

    fn place_car(session: &mut GameSession<ScriptedWorld>, position: Vec2) {
        let Some(run) = session.run.as_ref() else {
            panic!("session not created");
        };
        let chassis = run.car.chassis();
        session
            .world_mut()
            .expect("world")
            .set_position(chassis, position);
    }

    #[test]
    fn create_builds_world_from_setup() {
        let (session, _) = running_session();
        let world = session.world().expect("world");

        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(world.world_desc().map(|desc| desc.particles.density), Some(1.2));
        assert_eq!(session.population().map(RagdollPopulation::len), Some(3));
        assert_eq!(session.level().map(Level::map_end_x), Some(600.0));
        assert_eq!(session.time_left_ms(), 180_000);
        assert_eq!(session.car_position(), Some(Vec2::new(0.0, 1.75)));
    }

    #[test]
    fn step_is_rejected_before_create() {
        let mut session: GameSession<ScriptedWorld> =
            GameSession::new(setup(), Box::new(ManualClock::default()));
        assert_eq!(
            session.step(&settings()),
            Err(StepRejected {
                state: SessionState::Created
            })
        );
        assert!(!session.is_game_finished());
    }

    #[test]
    fn score_head_break_with_death() {
        let attacked = [AttackedRagdoll {
            id: RagdollId(1),
            dead: true,
            impulse: 7.5,
            kind: PartKind::Head,
        }];
        assert_eq!(step_points(&attacked), 1022);
    }

    #[test]
    fn score_sums_every_attacked_ragdoll() {
        let attacked = [
            AttackedRagdoll {
                id: RagdollId(1),
                dead: false,
                impulse: 10.0,
                kind: PartKind::Arm,
            },
            AttackedRagdoll {
                id: RagdollId(2),
                dead: false,
                impulse: 10.25,
                kind: PartKind::Leg,
            },
            AttackedRagdoll {
                id: RagdollId(3),
                dead: true,
                impulse: 0.0,
                kind: PartKind::Head,
            },
            AttackedRagdoll {
                id: RagdollId(4),
                dead: false,
                impulse: 99.0,
                kind: PartKind::Torso,
            },
        ];
        assert_eq!(step_points(&attacked), 1030);
    }

    #[test]
    fn contact_breaks_limb_and_scores() {
        let (mut session, _) = running_session();
        let ids = ragdoll_ids(&session);
        let contact = hit(&session, ids[1], BodyPart::Head, 20.0);
        session.world_mut().expect("world").queue_step(vec![contact]);

        session.step(&settings()).expect("running");

        // Small head breaks above 12: death plus 3 x 20.
        assert_eq!(session.score(), 1060);
        assert_eq!(
            session.step_info(),
            Some(GameStepInfo {
                is_pain: true,
                is_dead: true
            })
        );

        session.update_bodies_state();
        assert_eq!(ragdoll_ids(&session), vec![ids[0], ids[2]]);

        session.step(&settings()).expect("running");
        assert_eq!(session.step_info(), None);
    }

    #[test]
    fn only_first_scoring_contact_per_step_counts() {
        let (mut session, _) = running_session();
        let ids = ragdoll_ids(&session);
        let weak = hit(&session, ids[0], BodyPart::LeftArm, 1.0);
        let first = hit(&session, ids[0], BodyPart::LeftArm, 30.0);
        let second = hit(&session, ids[2], BodyPart::RightLeg, 40.0);
        session
            .world_mut()
            .expect("world")
            .queue_step(vec![weak, first, second.clone()]);

        session.step(&settings()).expect("running");
        assert_eq!(session.score(), 60);
        let untouched = session
            .population()
            .and_then(|population| population.get(ids[2]))
            .and_then(|ragdoll| ragdoll.joint(BodyPart::RightLeg))
            .map(|joint| joint.state);
        assert_eq!(untouched, Some(crate::gameplay::ragdoll::JointState::Intact));

        // The guard resets on the next step.
        session.world_mut().expect("world").queue_step(vec![second]);
        session.step(&settings()).expect("running");
        assert_eq!(session.score(), 100);
    }

    #[test]
    fn score_never_decreases() {
        let (mut session, _) = running_session();
        let ids = ragdoll_ids(&session);
        let parts = [
            BodyPart::LeftArm,
            BodyPart::Torso,
            BodyPart::RightLeg,
            BodyPart::Head,
            BodyPart::RightArm,
        ];

        let mut previous = 0;
        for (i, part) in parts.into_iter().enumerate() {
            let Some(&id) = ragdoll_ids(&session).first() else {
                break;
            };
            let contact = hit(&session, id, part, 5.0 + 10.0 * i as f32);
            session.world_mut().expect("world").queue_step(vec![contact]);
            session.step(&settings()).expect("running");
            session.update_bodies_state();
            assert!(session.score() >= previous);
            previous = session.score();
        }
        assert!(previous > 0);
        assert!(!ids.is_empty());
    }

    #[test]
    fn fallen_ragdoll_counts_as_dead_and_is_removed() {
        let (mut session, _) = running_session();
        let ids = ragdoll_ids(&session);
        let limbs: Vec<_> = {
            let ragdoll = session
                .population()
                .and_then(|population| population.get(ids[0]))
                .expect("ragdoll");
            BodyPart::LIMBS.iter().map(|part| ragdoll.body(*part)).collect()
        };
        let world = session.world_mut().expect("world");
        for body in limbs {
            world.set_position(body, Vec2::new(15.0, -3.5));
        }
        world.queue_step(vec![ContactEvent {
            body_a: BodyHandle(0),
            body_b: BodyHandle(1),
            tag_a: Some(BodyTag::Ground),
            tag_b: Some(BodyTag::Vehicle),
            normal_impulses: vec![2.0],
        }]);

        session.step(&settings()).expect("running");
        assert_eq!(session.score(), 1000);
        session.update_bodies_state();
        assert_eq!(ragdoll_ids(&session), vec![ids[1], ids[2]]);
    }

    #[test]
    fn reaching_the_finish_awards_the_bonus_once() {
        let (mut session, clock) = running_session();
        clock.advance(Duration::from_millis(138_000));
        place_car(&mut session, Vec2::new(601.0, 2.0));

        assert!(session.is_game_finished());
        assert_eq!(session.score(), 9200);
        assert_eq!(
            session.state(),
            SessionState::Finished(FinishReason::ReachedFinish { bonus: 9200 })
        );

        clock.advance(Duration::from_millis(1_000));
        assert!(session.is_game_finished());
        assert_eq!(session.score(), 9200);
        assert!(session.step(&settings()).is_err());
        assert_eq!(session.score(), 9200);
    }

    #[test]
    fn falling_into_a_pit_ends_without_bonus() {
        let (mut session, _) = running_session();
        place_car(&mut session, Vec2::new(180.0, -16.0));

        assert!(session.is_game_finished());
        assert_eq!(session.state(), SessionState::Finished(FinishReason::FellOff));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn running_out_of_time_ends_the_run() {
        let (mut session, clock) = running_session();
        assert!(!session.is_game_finished());

        clock.advance(Duration::from_secs(180));
        assert!(session.is_game_finished());
        assert_eq!(session.state(), SessionState::Finished(FinishReason::TimeUp));
        assert_eq!(session.time_left_ms(), 0);
    }

    #[test]
    fn car_controls_are_ignored_after_finish() {
        let (mut session, _) = running_session();
        session.move_car_forward();
        place_car(&mut session, Vec2::new(0.0, -20.0));
        assert!(session.is_game_finished());
        session.move_car_backward();
        session.stop_engine();

        let world = session.world().expect("world");
        assert_eq!(world.motor_speeds().len(), 1);
        assert_eq!(world.motor_speeds()[0].1, 300.0);
    }

    #[test]
    fn finished_session_leaves_bodies_alone() {
        let (mut session, clock) = running_session();
        let ids = ragdoll_ids(&session);
        let contact = hit(&session, ids[1], BodyPart::Head, 20.0);
        session.world_mut().expect("world").queue_step(vec![contact]);
        session.step(&settings()).expect("running");
        assert!(session.score() > 0);

        clock.advance(Duration::from_secs(180));
        assert!(session.is_game_finished());
        session.update_bodies_state();

        let world = session.world().expect("world");
        assert!(world.destroyed_joints().is_empty());
        assert_eq!(session.population().map(RagdollPopulation::len), Some(3));
    }

    #[test]
    fn car_dropped_on_a_ragdoll_breaks_it_and_scores() {
        let clock = ManualClock::default();
        let mut setup = setup();
        setup.spawns = vec![RagdollSpawn {
            size: RagdollSize::Normal,
            position: Vec2::new(1.0, 0.0),
        }];
        let mut session = GameSession::new(setup, Box::new(clock));
        session.create(RapierWorld::new);
        let id = ragdoll_ids(&session)[0];
        session.world_mut().expect("world").lift_vehicle(15.0);

        for _ in 0..240 {
            session.step(&settings()).expect("running");
            session.update_bodies_state();
        }

        assert!(session.score() > 0, "no joint broke under the car");
        let broken = session
            .population()
            .and_then(|population| population.get(id))
            .map_or(true, |ragdoll| ragdoll.broken_count() > 0);
        assert!(broken);
    }
}
