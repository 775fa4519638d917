//! Simulation settings
//!
//! Stored as JSON. Missing fields fall back to their defaults, so a settings
//! file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::sim::SimError;

/// How a body standing on a moving kinematic body is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CarryMode {
    /// Translate by the carrier's raw velocity each move (unscaled by dt)
    #[default]
    Velocity,
    /// Translate by the carrier's velocity times the step's dt
    Displacement,
}

impl CarryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarryMode::Velocity => "Velocity",
            CarryMode::Displacement => "Displacement",
        }
    }
}

/// What happens when a node is created with a name that is already indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DuplicateNamePolicy {
    /// The newer node takes over the name; a warning is logged
    #[default]
    LastWriteWins,
    /// Creation fails with [`SimError::DuplicateName`]
    Reject,
}

/// Tunables for a [`Scene`](crate::sim::Scene) and its frame driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Fixed simulation step in seconds
    pub fixed_dt: f32,
    /// Most fixed steps run for a single frame before backlog is dropped
    pub max_substeps: u32,
    pub carry: CarryMode,
    pub duplicate_names: DuplicateNamePolicy,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            fixed_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            carry: CarryMode::default(),
            duplicate_names: DuplicateNamePolicy::default(),
        }
    }
}

impl SimSettings {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return Err(SimError::Settings(format!(
                "fixed_dt must be a positive number of seconds, got {}",
                self.fixed_dt
            )));
        }
        if self.max_substeps == 0 {
            return Err(SimError::Settings("max_substeps must be at least 1".into()));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| SimError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::Settings(e.to_string()))
    }

    /// Read settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::Settings(format!("{}: {e}", path.display())))?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SimSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.carry, CarryMode::Velocity);
        assert_eq!(settings.duplicate_names, DuplicateNamePolicy::LastWriteWins);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = SimSettings::from_json(r#"{ "carry": "Displacement" }"#).unwrap();
        assert_eq!(settings.carry, CarryMode::Displacement);
        assert_eq!(settings.max_substeps, MAX_SUBSTEPS);
    }

    #[test]
    fn test_json_round_trip() {
        let settings = SimSettings {
            fixed_dt: 1.0 / 120.0,
            max_substeps: 4,
            carry: CarryMode::Displacement,
            duplicate_names: DuplicateNamePolicy::Reject,
        };
        let json = settings.to_json().unwrap();
        assert_eq!(SimSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(SimSettings::from_json(r#"{ "fixed_dt": 0.0 }"#).is_err());
        assert!(SimSettings::from_json(r#"{ "max_substeps": 0 }"#).is_err());
        assert!(SimSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = SimSettings::load_from("/nonexistent/scene2d-settings.json").unwrap_err();
        assert!(matches!(err, SimError::Settings(_)));
    }
}
