use crate::config::GameConfig;
use crate::gameplay::session::{FinishReason, GameSession, SessionState};
use crate::gameplay::vehicle::car::CarKind;
use crate::physics::PhysicsWorld;
use crate::scores::JsonScoreFile;
use bevy::app::AppExit;
use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    Menu,
    InRun,
    Results,
    Leaderboard,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunSummary>()
            .add_systems(Startup, (setup_camera, setup_run_resources))
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(Update, boot_to_menu.run_if(in_state(GameState::Boot)))
            .add_systems(OnEnter(GameState::Menu), enter_menu)
            .add_systems(Update, menu_controls.run_if(in_state(GameState::Menu)))
            .add_systems(OnEnter(GameState::InRun), enter_in_run)
            .add_systems(Update, in_run_controls.run_if(in_state(GameState::InRun)))
            .add_systems(OnEnter(GameState::Results), enter_results)
            .add_systems(
                Update,
                results_controls.run_if(in_state(GameState::Results)),
            )
            .add_systems(OnEnter(GameState::Leaderboard), enter_leaderboard)
            .add_systems(
                Update,
                leaderboard_controls.run_if(in_state(GameState::Leaderboard)),
            );
    }
}

/// Car the next run is played with.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedCar(pub CarKind);

#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub car: Option<CarKind>,
    pub score: u32,
    pub reason: Option<FinishReason>,
    pub saved: bool,
}

impl RunSummary {
    pub fn finished<W: PhysicsWorld>(session: &GameSession<W>) -> Self {
        let reason = match session.state() {
            SessionState::Finished(reason) => Some(reason),
            SessionState::Created | SessionState::Running => None,
        };
        Self {
            car: Some(session.car_kind()),
            score: session.score(),
            reason,
            saved: false,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.reason {
            Some(FinishReason::ReachedFinish { .. }) => "FINISHED",
            Some(FinishReason::FellOff) => "FELL OFF",
            Some(FinishReason::TimeUp) => "TIME UP",
            None => "RUN ABANDONED",
        }
    }
}

/// Menu shortcut for each car; `None` for unbound keys.
pub fn car_for_key(key: KeyCode) -> Option<CarKind> {
    match key {
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(CarKind::Hulk),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(CarKind::Spider),
        _ => None,
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn setup_run_resources(mut commands: Commands, config: Res<GameConfig>) {
    commands.insert_resource(SelectedCar(config.default_car()));
    commands.insert_resource(JsonScoreFile::new(&config.game.app.scores_path));
    info!("Scores are stored in `{}`.", config.game.app.scores_path);
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_menu(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::Menu);
}

fn enter_menu() {
    info!("Entered state: Menu");
}

fn menu_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut selected: ResMut<SelectedCar>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if let Some(car) = keyboard.get_just_pressed().find_map(|key| car_for_key(*key)) {
        selected.0 = car;
        next_state.set(GameState::InRun);
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyL) {
        next_state.set(GameState::Leaderboard);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}

fn enter_in_run(mut run_summary: ResMut<RunSummary>, selected: Res<SelectedCar>) {
    *run_summary = RunSummary::default();
    info!("Entered state: InRun with {}", selected.0.id());
}

fn in_run_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        info!("Run abandoned.");
        next_state.set(GameState::Menu);
    }
}

fn enter_results(run_summary: Res<RunSummary>) {
    info!(
        "Entered state: Results ({}, score {})",
        run_summary.headline(),
        run_summary.score
    );
}

fn results_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    // Text entry owns the keyboard on this screen; only Escape is global.
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::Menu);
    }
}

fn enter_leaderboard() {
    info!("Entered state: Leaderboard");
}

fn leaderboard_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::Menu);
    }
}
