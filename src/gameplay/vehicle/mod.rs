pub mod car;

use crate::states::GameState;
use bevy::prelude::*;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleInputState>()
            .init_resource::<VehicleInputBindings>()
            .add_systems(OnExit(GameState::InRun), reset_vehicle_input)
            .add_systems(
                Update,
                read_vehicle_input.run_if(in_state(GameState::InRun)),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveCommand {
    Forward,
    Backward,
    #[default]
    Idle,
}

/// Forward wins when both directions are held.
pub fn drive_command(forward: bool, backward: bool) -> DriveCommand {
    if forward {
        DriveCommand::Forward
    } else if backward {
        DriveCommand::Backward
    } else {
        DriveCommand::Idle
    }
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct VehicleInputState {
    pub drive: DriveCommand,
}

#[derive(Resource, Debug, Clone)]
struct VehicleInputBindings {
    forward: Vec<KeyCode>,
    backward: Vec<KeyCode>,
}

impl Default for VehicleInputBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            backward: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
        }
    }
}

fn read_vehicle_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<VehicleInputBindings>,
    mut input_state: ResMut<VehicleInputState>,
) {
    input_state.drive = drive_command(
        bindings.forward.iter().any(|key| keyboard.pressed(*key)),
        bindings.backward.iter().any(|key| keyboard.pressed(*key)),
    );
}

fn reset_vehicle_input(mut input_state: ResMut<VehicleInputState>) {
    input_state.drive = DriveCommand::Idle;
}
