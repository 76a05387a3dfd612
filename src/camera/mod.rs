//! World view of the course.
//!
//! Four spaces are involved: element (window pixels, origin top-left, y down),
//! viewport (pixels, origin at the window centre, y up), projection (world units
//! relative to the view centre) and world.

use crate::states::GameState;
use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

const DEFAULT_CENTER: Vec2 = Vec2::new(0.0, 20.0);
const DEFAULT_EXTENT: f32 = 25.0;
const DEFAULT_SIZE: Vec2 = Vec2::new(1280.0, 800.0);
const HOME_HEIGHT: f32 = 20.0;
const FOLLOW_HEIGHT: f32 = 2.0;

pub struct CourseCameraPlugin;

impl Plugin for CourseCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CourseCamera>()
            .init_resource::<CursorWorldPosition>()
            .add_systems(
                Update,
                (
                    track_window_size,
                    pan_with_right_mouse.run_if(not(in_state(GameState::InRun))),
                    track_cursor,
                    apply_course_camera,
                )
                    .chain(),
            );
    }
}

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CourseCamera {
    pub center: Vec2,
    /// Half the visible world height at zoom 1.
    pub extent: f32,
    pub zoom: f32,
    /// Element size in pixels.
    pub size: Vec2,
}

/// World point under the mouse cursor, if it is over the window.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorWorldPosition(pub Option<Vec2>);

impl Default for CourseCamera {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            extent: DEFAULT_EXTENT,
            zoom: 1.0,
            size: DEFAULT_SIZE,
        }
    }
}

impl CourseCamera {
    pub fn home(&mut self) {
        self.center = Vec2::new(0.0, HOME_HEIGHT * self.zoom);
    }

    pub fn move_by(&mut self, delta: Vec2) {
        self.center += delta;
    }

    /// Pans so the world point under the cursor stays under it after the
    /// cursor moved by `pixels` (element space).
    pub fn drag_by(&mut self, pixels: Vec2) {
        let delta = self.element_to_projection(Vec2::ZERO) - self.element_to_projection(pixels);
        self.move_by(delta);
    }

    pub fn follow(&mut self, target: Vec2) {
        self.center = Vec2::new(target.x, target.y + FOLLOW_HEIGHT);
    }

    /// World units per pixel.
    pub fn units_per_pixel(&self) -> f32 {
        2.0 * self.extent * self.zoom / self.size.y
    }

    pub fn element_to_viewport(&self, element: Vec2) -> Vec2 {
        Vec2::new(element.x - 0.5 * self.size.x, 0.5 * self.size.y - element.y)
    }

    pub fn viewport_to_element(&self, viewport: Vec2) -> Vec2 {
        Vec2::new(viewport.x + 0.5 * self.size.x, 0.5 * self.size.y - viewport.y)
    }

    pub fn viewport_to_projection(&self, viewport: Vec2) -> Vec2 {
        viewport * self.units_per_pixel()
    }

    pub fn projection_to_viewport(&self, projection: Vec2) -> Vec2 {
        projection / self.units_per_pixel()
    }

    pub fn projection_to_world(&self, projection: Vec2) -> Vec2 {
        projection + self.center
    }

    pub fn world_to_projection(&self, world: Vec2) -> Vec2 {
        world - self.center
    }

    pub fn element_to_world(&self, element: Vec2) -> Vec2 {
        let viewport = self.element_to_viewport(element);
        self.projection_to_world(self.viewport_to_projection(viewport))
    }

    pub fn world_to_element(&self, world: Vec2) -> Vec2 {
        let projection = self.world_to_projection(world);
        self.viewport_to_element(self.projection_to_viewport(projection))
    }

    pub fn element_to_projection(&self, element: Vec2) -> Vec2 {
        self.viewport_to_projection(self.element_to_viewport(element))
    }
}

fn track_window_size(
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut camera: ResMut<CourseCamera>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let size = Vec2::new(window.width(), window.height());
    if size.x > 0.0 && size.y > 0.0 && camera.size != size {
        camera.size = size;
    }
}

fn pan_with_right_mouse(
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    mut camera: ResMut<CourseCamera>,
) {
    if buttons.pressed(MouseButton::Right) && motion.delta != Vec2::ZERO {
        camera.drag_by(motion.delta);
    }
}

fn track_cursor(
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera: Res<CourseCamera>,
    mut cursor: ResMut<CursorWorldPosition>,
) {
    let position = window_query
        .single()
        .ok()
        .and_then(Window::cursor_position)
        .map(|element| camera.element_to_world(element));
    if cursor.0 != position {
        cursor.0 = position;
    }
}

fn apply_course_camera(
    camera: Res<CourseCamera>,
    mut camera_query: Query<(&mut Transform, &mut Projection), With<Camera2d>>,
) {
    let Ok((mut transform, mut projection)) = camera_query.single_mut() else {
        return;
    };

    transform.translation.x = camera.center.x;
    transform.translation.y = camera.center.y;
    if let Projection::Orthographic(ortho) = &mut *projection {
        ortho.scale = camera.units_per_pixel();
    }
}
