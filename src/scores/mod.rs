//! Persisted results and the leaderboard.

use crate::gameplay::vehicle::car::CarKind;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub car_type: CarKind,
    pub score: u32,
    pub created_by: String,
    /// Unix seconds.
    pub created_at: u64,
}

impl ScoreRecord {
    pub fn now(car_type: CarKind, score: u32, created_by: impl Into<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            car_type,
            score,
            created_by: created_by.into(),
            created_at,
        }
    }
}

#[derive(Debug)]
pub enum ScoreStoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingPlayer,
}

impl Display for ScoreStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "malformed score file `{}`: {source}", path.display())
            }
            Self::MissingPlayer => write!(f, "player name is required"),
        }
    }
}

impl Error for ScoreStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::MissingPlayer => None,
        }
    }
}

pub trait ScoreStore {
    fn submit(&mut self, record: ScoreRecord) -> Result<(), ScoreStoreError>;

    /// Every record, best score first.
    fn all(&self) -> Result<Vec<ScoreRecord>, ScoreStoreError>;
}

/// Score board kept as a JSON array in a single file.
#[derive(Resource, Debug, Clone)]
pub struct JsonScoreFile {
    path: PathBuf,
}

impl JsonScoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ScoreStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| ScoreStoreError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

impl ScoreStore for JsonScoreFile {
    fn submit(&mut self, record: ScoreRecord) -> Result<(), ScoreStoreError> {
        if record.created_by.trim().is_empty() {
            return Err(ScoreStoreError::MissingPlayer);
        }

        let mut records = self.read()?;
        records.push(record);
        let raw = serde_json::to_string_pretty(&records).map_err(|source| ScoreStoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| ScoreStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn all(&self) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let mut records = self.read()?;
        records.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(records)
    }
}
