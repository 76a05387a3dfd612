use crate::camera::CursorWorldPosition;
use crate::config::GameConfig;
use crate::gameplay::session::ActiveSession;
use crate::gameplay::vehicle::VehicleInputState;
use crate::physics::{BodyKind, DebugDraw, PhysicsWorld};
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

const STATIC_COLOR: Color = Color::srgb(0.5, 0.9, 0.5);
const AWAKE_COLOR: Color = Color::srgb(0.9, 0.7, 0.7);
const SLEEPING_COLOR: Color = Color::srgb(0.6, 0.6, 0.9);

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugDrawState>()
            .add_systems(Startup, init_debug_draw_state)
            .add_systems(Update, toggle_debug_draw)
            .add_systems(
                Update,
                draw_physics_world
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>)
                    .run_if(debug_draw_enabled),
            )
            .add_systems(
                EguiPrimaryContextPass,
                session_stats_panel_ui
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>)
                    .run_if(debug_draw_enabled),
            );
    }
}

#[derive(Resource, Debug, Clone, Copy, Default)]
struct DebugDrawState {
    enabled: bool,
}

/// Renders physics shapes through Bevy gizmos.
struct GizmoDrawer<'a, 'w, 's> {
    gizmos: &'a mut Gizmos<'w, 's>,
}

fn body_color(kind: BodyKind, awake: bool) -> Color {
    match (kind, awake) {
        (BodyKind::Static, _) => STATIC_COLOR,
        (BodyKind::Dynamic, true) => AWAKE_COLOR,
        (BodyKind::Dynamic, false) => SLEEPING_COLOR,
    }
}

impl DebugDraw for GizmoDrawer<'_, '_, '_> {
    fn draw_polygon(&mut self, vertices: &[Vec2], kind: BodyKind, awake: bool) {
        let Some(first) = vertices.first() else {
            return;
        };
        let closed = vertices.iter().copied().chain(std::iter::once(*first));
        self.gizmos.linestrip_2d(closed, body_color(kind, awake));
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, angle: f32, kind: BodyKind, awake: bool) {
        let color = body_color(kind, awake);
        self.gizmos
            .circle_2d(Isometry2d::from_translation(center), radius, color);
        // Spoke so wheel rotation is visible.
        let spoke = Vec2::from_angle(angle) * radius;
        self.gizmos.line_2d(center, center + spoke, color);
    }

    fn draw_segment(&mut self, a: Vec2, b: Vec2, kind: BodyKind) {
        self.gizmos.line_2d(a, b, body_color(kind, false));
    }
}

fn init_debug_draw_state(config: Res<GameConfig>, mut state: ResMut<DebugDrawState>) {
    state.enabled = config.game.app.debug_draw;
}

fn debug_draw_enabled(state: Res<DebugDrawState>) -> bool {
    state.enabled
}

fn toggle_debug_draw(keyboard: Res<ButtonInput<KeyCode>>, mut state: ResMut<DebugDrawState>) {
    if keyboard.just_pressed(KeyCode::F3) {
        state.enabled = !state.enabled;
        info!(
            "Physics debug draw {}.",
            if state.enabled { "enabled" } else { "disabled" }
        );
    }
}

fn draw_physics_world(active: Res<ActiveSession>, mut gizmos: Gizmos) {
    let mut drawer = GizmoDrawer {
        gizmos: &mut gizmos,
    };
    active.0.draw(&mut drawer);
}

fn session_stats_panel_ui(
    mut egui_contexts: EguiContexts,
    diagnostics: Res<DiagnosticsStore>,
    active: Res<ActiveSession>,
    input_state: Res<VehicleInputState>,
    cursor: Res<CursorWorldPosition>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    let session = &active.0;
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let (bodies, joints) = session
        .world()
        .map_or((0, 0), |world| (world.body_count(), world.joint_count()));
    let ragdolls = session.population().map_or(0, |population| population.len());
    let position = session.car_position().unwrap_or(Vec2::ZERO);
    let (segments, obstacles, map_end_x) = session.level().map_or((0, 0, 0.0), |level| {
        (level.segments().len(), level.obstacles().len(), level.map_end_x())
    });
    let particles = session.world().map(|world| world.particle_system());

    egui::Window::new("Physics")
        .default_pos([1000.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(format!("FPS: {fps:>5.1}"));
            ui.label(format!("Bodies: {bodies} | Joints: {joints}"));
            ui.label(format!("Ragdolls alive: {ragdolls}"));
            ui.label(format!(
                "Car: ({:.1}, {:.1}) | finish at x {map_end_x:.0}",
                position.x, position.y
            ));
            ui.label(format!("Course: {segments} edges | {obstacles} obstacles"));
            if let Some(particles) = particles {
                ui.label(format!(
                    "Particles: gravity x{:.2} | density {:.2}",
                    particles.gravity_scale, particles.density
                ));
            }
            if let Some(point) = cursor.0 {
                ui.label(format!("Cursor: ({:.1}, {:.1})", point.x, point.y));
            }
            ui.label(format!("Drive: {:?}", input_state.drive));
            ui.label(format!("State: {:?}", session.state()));
            ui.small("F3 toggle debug draw | F5 reload config");
        });
}
