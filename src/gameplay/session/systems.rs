use super::{GameSession, GameStepInfo, InstantClock};
use crate::camera::CourseCamera;
use crate::config::GameConfig;
use crate::gameplay::vehicle::{DriveCommand, VehicleInputState};
use crate::physics::rapier::RapierWorld;
use crate::states::{GameState, RunSummary, SelectedCar};
use bevy::prelude::*;

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InfoBanner>()
            .add_systems(Startup, configure_fixed_timestep)
            .add_systems(OnEnter(GameState::InRun), start_session)
            .add_systems(OnExit(GameState::InRun), end_session)
            .add_systems(
                FixedUpdate,
                advance_session
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(
                Update,
                follow_car
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>),
            );
    }
}

#[derive(Resource)]
pub struct ActiveSession(pub GameSession<RapierWorld>);

/// Pain/death notice shown for a fixed number of steps after a hit.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoBanner {
    pub info: Option<GameStepInfo>,
    pub frames_left: u32,
}

impl InfoBanner {
    pub fn tick(&mut self, latest: Option<GameStepInfo>, duration_frames: u32) {
        if let Some(info) = latest {
            self.info = Some(info);
            self.frames_left = duration_frames;
            return;
        }

        self.frames_left = self.frames_left.saturating_sub(1);
        if self.frames_left == 0 {
            self.info = None;
        }
    }

    pub fn text(&self) -> Option<&'static str> {
        self.info
            .map(|info| if info.is_dead { "DEAD!" } else { "PAIN!" })
    }
}

fn configure_fixed_timestep(mut commands: Commands, config: Res<GameConfig>) {
    commands.insert_resource(Time::<Fixed>::from_hz(f64::from(
        config.game.app.fixed_timestep_hz,
    )));
}

fn start_session(
    mut commands: Commands,
    config: Res<GameConfig>,
    selected: Res<SelectedCar>,
    mut banner: ResMut<InfoBanner>,
    mut camera: ResMut<CourseCamera>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(setup) = config.session_setup(selected.0) else {
        error!("No tuning for vehicle `{}`; returning to menu.", selected.0.id());
        next_state.set(GameState::Menu);
        return;
    };

    let mut session = GameSession::new(setup, Box::new(InstantClock::default()));
    session.create(RapierWorld::new);

    *banner = InfoBanner::default();
    camera.home();
    commands.insert_resource(ActiveSession(session));
}

fn end_session(mut commands: Commands) {
    commands.remove_resource::<ActiveSession>();
}

fn advance_session(
    config: Res<GameConfig>,
    input: Res<VehicleInputState>,
    mut active: ResMut<ActiveSession>,
    mut banner: ResMut<InfoBanner>,
    mut summary: ResMut<RunSummary>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let session = &mut active.0;

    match input.drive {
        DriveCommand::Forward => session.move_car_forward(),
        DriveCommand::Backward => session.move_car_backward(),
        DriveCommand::Idle => session.stop_engine(),
    }

    if let Err(rejected) = session.step(&config.step_settings()) {
        debug!("Skipping fixed step: {rejected}");
        return;
    }
    session.update_bodies_state();
    banner.tick(session.step_info(), config.game.app.info_banner_frames);

    if session.is_game_finished() {
        *summary = RunSummary::finished(session);
        next_state.set(GameState::Results);
    }
}

fn follow_car(active: Res<ActiveSession>, mut camera: ResMut<CourseCamera>) {
    if let Some(position) = active.0.car_position() {
        camera.follow(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIN: GameStepInfo = GameStepInfo {
        is_pain: true,
        is_dead: false,
    };

    #[test]
    fn banner_stays_for_the_configured_frames() {
        let mut banner = InfoBanner::default();
        banner.tick(Some(PAIN), 3);
        assert_eq!(banner.text(), Some("PAIN!"));

        banner.tick(None, 3);
        banner.tick(None, 3);
        assert_eq!(banner.text(), Some("PAIN!"));
        banner.tick(None, 3);
        assert_eq!(banner.text(), None);
    }

    #[test]
    fn new_hit_restarts_the_banner() {
        let mut banner = InfoBanner::default();
        banner.tick(Some(PAIN), 240);
        banner.tick(None, 240);
        banner.tick(
            Some(GameStepInfo {
                is_pain: true,
                is_dead: true,
            }),
            240,
        );
        assert_eq!(banner.frames_left, 240);
        assert_eq!(banner.text(), Some("DEAD!"));
    }
}
