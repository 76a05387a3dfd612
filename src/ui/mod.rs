mod screens;

use crate::camera::CourseCamera;
use crate::gameplay::session::{ActiveSession, InfoBanner};
use crate::states::GameState;
use bevy::prelude::*;
use screens::ScreensPlugin;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.06, 0.09, 0.12, 0.86);
const HUD_PANEL_BORDER: Color = Color::srgba(0.58, 0.68, 0.76, 0.92);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_TEXT_MUTED: Color = Color::srgb(0.76, 0.83, 0.9);
const HUD_PAIN_COLOR: Color = Color::srgb(1.0, 0.78, 0.22);
const HUD_DEAD_COLOR: Color = Color::srgb(0.95, 0.18, 0.16);
/// Banner's top-left corner relative to the chassis, in world units.
const BANNER_WORLD_OFFSET: Vec2 = Vec2::new(-3.0, 7.0);

pub struct GameUiPlugin;

impl Plugin for GameUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ScreensPlugin)
            .add_systems(OnEnter(GameState::InRun), spawn_game_hud)
            .add_systems(OnExit(GameState::InRun), cleanup_game_hud)
            .add_systems(
                Update,
                update_game_hud
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudTextKind {
    Score,
    TimeLeft,
    Car,
    Banner,
}

/// Window position of the banner for a car at `car_position`.
fn banner_element_position(camera: &CourseCamera, car_position: Vec2) -> Vec2 {
    camera.world_to_element(car_position + BANNER_WORLD_OFFSET)
}

/// Time left as `mm:ss`, clamped at zero.
pub fn format_time_left(time_left_ms: i64) -> String {
    let seconds = time_left_ms.max(0) / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(12.0),
                right: Val::Px(12.0),
                top: Val::Px(10.0),
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::FlexStart,
                ..default()
            },
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|root| {
            root.spawn((
                Name::new("GameHudMainPanel"),
                Node {
                    width: Val::Px(300.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(6.0),
                    padding: UiRect::all(Val::Px(12.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(HUD_PANEL_BG),
                BorderColor::all(HUD_PANEL_BORDER),
            ))
            .with_children(|panel| {
                panel.spawn((
                    HudTextKind::Score,
                    Text::new("SCORE 0"),
                    TextFont {
                        font_size: 30.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_PRIMARY),
                ));
                panel.spawn((
                    HudTextKind::TimeLeft,
                    Text::new("TIME 00:00"),
                    TextFont {
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_PRIMARY),
                ));
                panel.spawn((
                    HudTextKind::Car,
                    Text::new(""),
                    TextFont {
                        font_size: 16.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_MUTED),
                ));
            });
        });

    commands.spawn((
        Name::new("GameHudBanner"),
        GameHudRoot,
        HudTextKind::Banner,
        Text::new(""),
        TextFont {
            font_size: 64.0,
            ..default()
        },
        TextColor(HUD_PAIN_COLOR),
        Node {
            position_type: PositionType::Absolute,
            ..default()
        },
        ZIndex(HUD_PANEL_Z_INDEX),
    ));
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_game_hud(
    active: Res<ActiveSession>,
    banner: Res<InfoBanner>,
    camera: Res<CourseCamera>,
    mut text_query: Query<(&HudTextKind, &mut Text, &mut TextColor, &mut Node)>,
) {
    let session = &active.0;
    let ragdolls_left = session.population().map_or(0, |population| population.len());

    for (kind, mut text, mut color, mut node) in &mut text_query {
        match kind {
            HudTextKind::Score => {
                *text = Text::new(format!("SCORE {}", session.score()));
            }
            HudTextKind::TimeLeft => {
                *text = Text::new(format!(
                    "TIME {}",
                    format_time_left(session.time_left_ms())
                ));
            }
            HudTextKind::Car => {
                *text = Text::new(format!(
                    "{} | ragdolls left {ragdolls_left}",
                    session.car_kind().label()
                ));
            }
            HudTextKind::Banner => {
                *text = Text::new(banner.text().unwrap_or_default());
                let is_dead = banner.info.is_some_and(|info| info.is_dead);
                *color = TextColor(if is_dead {
                    HUD_DEAD_COLOR
                } else {
                    HUD_PAIN_COLOR
                });
                if let Some(car_position) = session.car_position() {
                    let anchor = banner_element_position(&camera, car_position);
                    node.left = Val::Px(anchor.x);
                    node.top = Val::Px(anchor.y);
                }
            }
        }
    }
}
