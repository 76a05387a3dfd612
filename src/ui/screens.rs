use crate::config::GameConfig;
use crate::gameplay::vehicle::car::CarKind;
use crate::scores::{JsonScoreFile, ScoreRecord, ScoreStore};
use crate::states::{GameState, RunSummary, SelectedCar};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

const LEADERBOARD_ROWS: usize = 20;

pub(super) struct ScreensPlugin;

impl Plugin for ScreensPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ResultsForm>()
            .init_resource::<LeaderboardView>()
            .add_systems(OnEnter(GameState::Results), reset_results_form)
            .add_systems(OnEnter(GameState::Leaderboard), load_leaderboard)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    menu_screen_ui.run_if(in_state(GameState::Menu)),
                    results_screen_ui
                        .run_if(in_state(GameState::Results))
                        .run_if(resource_exists::<JsonScoreFile>),
                    leaderboard_screen_ui.run_if(in_state(GameState::Leaderboard)),
                ),
            );
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct ResultsForm {
    player_name: String,
    status: String,
}

#[derive(Resource, Debug, Clone, Default)]
struct LeaderboardView {
    records: Vec<ScoreRecord>,
    error: Option<String>,
}

fn menu_screen_ui(
    mut egui_contexts: EguiContexts,
    config: Res<GameConfig>,
    mut selected: ResMut<SelectedCar>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    egui::Window::new("Pain or Dead")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("Choose your car");
            ui.label("Break as many limbs as you can before the clock runs out.");
            ui.separator();

            for (index, car) in CarKind::ALL.into_iter().enumerate() {
                let label = config.vehicle_label(car);
                let button = ui.button(format!("{} - {label}", index + 1));
                if button.clicked() {
                    selected.0 = car;
                    next_state.set(GameState::InRun);
                }
            }

            ui.separator();
            if ui.button("L - Leaderboard").clicked() {
                next_state.set(GameState::Leaderboard);
            }
            ui.small("D/Right drive forward, A/Left reverse, Esc back to menu.");
        });
}

fn reset_results_form(mut form: ResMut<ResultsForm>) {
    form.status.clear();
}

fn results_screen_ui(
    mut egui_contexts: EguiContexts,
    mut form: ResMut<ResultsForm>,
    mut summary: ResMut<RunSummary>,
    mut store: ResMut<JsonScoreFile>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    let mut save_clicked = false;
    egui::Window::new(summary.headline())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading(format!("Score {}", summary.score));
            if let Some(car) = summary.car {
                ui.label(format!("Car: {}", car.label()));
            }
            ui.separator();

            ui.add_enabled_ui(!summary.saved, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut form.player_name);
                });
                save_clicked = ui.button("Save score").clicked();
            });
            if !form.status.is_empty() {
                ui.label(form.status.as_str());
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Play again").clicked() {
                    next_state.set(GameState::InRun);
                }
                if ui.button("Leaderboard").clicked() {
                    next_state.set(GameState::Leaderboard);
                }
                if ui.button("Menu").clicked() {
                    next_state.set(GameState::Menu);
                }
            });
        });

    if !save_clicked || summary.saved {
        return;
    }
    let Some(car) = summary.car else {
        form.status = "Nothing to save for an abandoned run.".to_string();
        return;
    };

    let record = ScoreRecord::now(car, summary.score, form.player_name.trim());
    match store.submit(record) {
        Ok(()) => {
            info!("Saved score {} for `{}`.", summary.score, form.player_name.trim());
            summary.saved = true;
            form.status = "Saved.".to_string();
        }
        Err(error) => {
            warn!("Score was not saved: {error}");
            form.status = format!("Not saved: {error}");
        }
    }
}

fn load_leaderboard(store: Option<Res<JsonScoreFile>>, mut view: ResMut<LeaderboardView>) {
    let Some(store) = store else {
        view.records.clear();
        view.error = Some("Score board is not available.".to_string());
        return;
    };

    match store.all() {
        Ok(records) => {
            view.records = records;
            view.error = None;
        }
        Err(error) => {
            error!("Failed to read leaderboard: {error}");
            view.records.clear();
            view.error = Some(error.to_string());
        }
    }
}

fn leaderboard_screen_ui(
    mut egui_contexts: EguiContexts,
    view: Res<LeaderboardView>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    egui::Window::new("Leaderboard")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            if let Some(error) = &view.error {
                ui.colored_label(egui::Color32::LIGHT_RED, error.as_str());
            } else if view.records.is_empty() {
                ui.label("No scores yet.");
            } else {
                egui::Grid::new("leaderboard_grid")
                    .striped(true)
                    .num_columns(4)
                    .show(ui, |ui| {
                        ui.strong("#");
                        ui.strong("Player");
                        ui.strong("Car");
                        ui.strong("Score");
                        ui.end_row();

                        for (rank, record) in view.records.iter().take(LEADERBOARD_ROWS).enumerate()
                        {
                            ui.label(format!("{}", rank + 1));
                            ui.label(record.created_by.as_str());
                            ui.label(record.car_type.label());
                            ui.label(record.score.to_string());
                            ui.end_row();
                        }
                    });
            }

            ui.separator();
            if ui.button("Back (Esc)").clicked() {
                next_state.set(GameState::Menu);
            }
        });
}
