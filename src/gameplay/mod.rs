pub mod level;
pub mod ragdoll;
pub mod session;
pub mod vehicle;

use bevy::prelude::*;
use session::SessionPlugin;
use vehicle::VehicleGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(VehicleGameplayPlugin)
            .add_plugins(SessionPlugin);
    }
}
