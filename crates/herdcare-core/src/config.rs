//! Application settings.
//!
//! Loaded from an optional TOML file and `HERDCARE__*` environment variables,
//! e.g. `HERDCARE__ALERTS__MISSED_TASK_HIGH_DAYS=5`.

use std::path::Path;

use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::tasks::TaskPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub tasks: TaskSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

/// Follow-up task generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSettings {
    #[serde(default)]
    pub policy: TaskPolicy,
    /// Time of day every generated task is scheduled at
    #[serde(default = "default_administration_time")]
    pub administration_time: NaiveTime,
    #[serde(default = "default_points_per_task")]
    pub points_per_task: u32,
    /// How far back a farmer's task list reaches
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

/// Sweep thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSettings {
    #[serde(default = "default_missed_task_grace_days")]
    pub missed_task_grace_days: u32,
    #[serde(default = "default_missed_task_high_days")]
    pub missed_task_high_days: u32,
    #[serde(default = "default_prolonged_withdrawal_days")]
    pub prolonged_withdrawal_days: u32,
}

fn default_administration_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_points_per_task() -> u32 {
    5
}

fn default_lookback_days() -> u32 {
    7
}

fn default_missed_task_grace_days() -> u32 {
    1
}

fn default_missed_task_high_days() -> u32 {
    3
}

fn default_prolonged_withdrawal_days() -> u32 {
    30
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            policy: TaskPolicy::default(),
            administration_time: default_administration_time(),
            points_per_task: default_points_per_task(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            missed_task_grace_days: default_missed_task_grace_days(),
            missed_task_high_days: default_missed_task_high_days(),
            prolonged_withdrawal_days: default_prolonged_withdrawal_days(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given and present) layered under the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("HERDCARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string, without consulting the environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tasks
            .policy
            .validate()
            .map_err(|e| ConfigError::Message(format!("tasks.policy: {}", e)))?;

        if self.alerts.missed_task_high_days < self.alerts.missed_task_grace_days {
            return Err(ConfigError::Message(format!(
                "alerts.missed_task_high_days ({}) must be at least missed_task_grace_days ({})",
                self.alerts.missed_task_high_days, self.alerts.missed_task_grace_days
            )));
        }
        Ok(())
    }
}
