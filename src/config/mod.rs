use crate::gameplay::ragdoll::RagdollSize;
use crate::gameplay::session::{RagdollSpawn, SessionSetup};
use crate::gameplay::vehicle::car::{CarKind, CarTuning};
use crate::physics::{ParticleSystemDesc, StepSettings, WorldDesc};
use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
            info!("Vehicle and ragdoll changes apply from the next run.");
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} vehicles, {} ragdoll spawns, {}s runs at {} Hz.",
        config.vehicles_by_id.len(),
        config.ragdolls.spawns.len(),
        config.game.session.duration_seconds,
        config.game.app.fixed_timestep_hz
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub vehicles: VehiclesFile,
    pub ragdolls: RagdollsFile,
    pub vehicles_by_id: HashMap<String, VehicleConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let vehicles: VehiclesFile = read_toml(&config_dir.join("vehicles.toml"))?;
        let ragdolls: RagdollsFile = read_toml(&config_dir.join("ragdolls.toml"))?;

        let config = Self {
            vehicles_by_id: to_index("vehicles.toml::vehicles", &vehicles.vehicles)?,
            game,
            vehicles,
            ragdolls,
        };

        config.validate_references()?;
        Ok(config)
    }

    pub fn default_car(&self) -> CarKind {
        CarKind::from_id(&self.game.app.default_vehicle).unwrap_or(CarKind::Hulk)
    }

    /// Display name from `vehicles.toml`, falling back to the built-in one.
    pub fn vehicle_label(&self, car: CarKind) -> &str {
        self.vehicles_by_id
            .get(car.id())
            .map_or(car.label(), |vehicle| vehicle.label.as_str())
    }

    pub fn step_settings(&self) -> StepSettings {
        let physics = &self.game.physics;
        StepSettings {
            dt: 1.0 / self.game.app.fixed_timestep_hz,
            velocity_iterations: physics.velocity_iterations,
            position_iterations: physics.position_iterations,
            particle_iterations: physics.particle_iterations,
        }
    }

    pub fn session_setup(&self, car: CarKind) -> Option<SessionSetup> {
        let vehicle = self.vehicles_by_id.get(car.id())?;
        let physics = &self.game.physics;

        Some(SessionSetup {
            car,
            tuning: CarTuning {
                frequency_hz: vehicle.frequency_hz,
                damping_ratio: vehicle.damping_ratio,
                speed: vehicle.speed,
                max_motor_torque: vehicle.max_motor_torque,
            },
            world: WorldDesc {
                gravity: Vec2::from_array(physics.gravity),
                particles: ParticleSystemDesc {
                    gravity_scale: physics.particle_gravity_scale,
                    density: physics.particle_density,
                },
            },
            duration: Duration::from_secs(self.game.session.duration_seconds),
            spawns: self
                .ragdolls
                .spawns
                .iter()
                .map(|spawn| RagdollSpawn {
                    size: spawn.size,
                    position: Vec2::new(spawn.x, spawn.y),
                })
                .collect(),
        })
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        if CarKind::from_id(&self.game.app.default_vehicle).is_none() {
            return Err(ConfigError::Validation(format!(
                "game.toml::app.default_vehicle references unknown vehicle id `{}`",
                self.game.app.default_vehicle
            )));
        }

        for kind in CarKind::ALL {
            if !self.vehicles_by_id.contains_key(kind.id()) {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles is missing vehicle id `{}`",
                    kind.id()
                )));
            }
        }

        if self.game.app.fixed_timestep_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.fixed_timestep_hz must be > 0".to_string(),
            ));
        }

        if self.game.app.info_banner_frames == 0 {
            return Err(ConfigError::Validation(
                "game.toml::app.info_banner_frames must be > 0".to_string(),
            ));
        }

        if self.game.app.scores_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "game.toml::app.scores_path cannot be empty".to_string(),
            ));
        }

        if self.game.physics.velocity_iterations == 0 {
            return Err(ConfigError::Validation(
                "game.toml::physics.velocity_iterations must be > 0".to_string(),
            ));
        }

        if self.game.physics.particle_density <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::physics.particle_density must be > 0".to_string(),
            ));
        }

        if self.game.session.duration_seconds == 0 {
            return Err(ConfigError::Validation(
                "game.toml::session.duration_seconds must be > 0".to_string(),
            ));
        }

        for (index, vehicle) in self.vehicles.vehicles.iter().enumerate() {
            if CarKind::from_id(&vehicle.id).is_none() {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].id `{}` is not a known car",
                    vehicle.id
                )));
            }
            if vehicle.frequency_hz <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].frequency_hz must be > 0"
                )));
            }
            if vehicle.damping_ratio < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].damping_ratio must be >= 0"
                )));
            }
            if vehicle.speed <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].speed must be > 0"
                )));
            }
            if vehicle.max_motor_torque <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].max_motor_torque must be > 0"
                )));
            }
        }

        if self.ragdolls.spawns.is_empty() {
            return Err(ConfigError::Validation(
                "ragdolls.toml::spawns must contain at least one ragdoll".to_string(),
            ));
        }

        for (index, spawn) in self.ragdolls.spawns.iter().enumerate() {
            if !spawn.x.is_finite() || !spawn.y.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "ragdolls.toml::spawns[{index}] position must be finite"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub physics: PhysicsConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fixed_timestep_hz: f32,
    pub default_vehicle: String,
    pub debug_draw: bool,
    pub scores_path: String,
    #[serde(default = "default_info_banner_frames")]
    pub info_banner_frames: u32,
}

fn default_info_banner_frames() -> u32 {
    240
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    pub gravity: [f32; 2],
    pub particle_gravity_scale: f32,
    pub particle_density: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub particle_iterations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesFile {
    pub vehicles: Vec<VehicleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    pub id: String,
    pub label: String,
    pub frequency_hz: f32,
    pub damping_ratio: f32,
    pub speed: f32,
    pub max_motor_torque: f32,
}

impl HasId for VehicleConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagdollsFile {
    pub spawns: Vec<RagdollSpawnConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagdollSpawnConfig {
    pub size: RagdollSize,
    pub x: f32,
    pub y: f32,
}
