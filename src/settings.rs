use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::{
    adaptive::{AdaptiveConfig, InterventionRules},
    error::ConfigError,
    fusion::FusionConfig,
    sensing::SensingConfig,
    session::SessionConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub fusion: FusionConfig,
    pub adaptive: AdaptiveConfig,
    pub interventions: InterventionRules,
    pub sensing: SensingConfig,
    pub session: SessionConfig,
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fusion.validate()?;
        self.adaptive.validate()?;
        self.sensing.validate()?;
        self.session.validate()
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing or unparsable file yields defaults;
    /// a file that parses but holds invalid values is an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            parse_or_default(&contents)
        } else {
            AppSettings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> AppSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn update_fusion(&self, fusion: FusionConfig) -> Result<()> {
        let mut settings = self.get();
        settings.fusion = fusion;
        self.update(settings)
    }

    pub fn update_adaptive(&self, adaptive: AdaptiveConfig) -> Result<()> {
        let mut settings = self.get();
        settings.adaptive = adaptive;
        self.update(settings)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: AppSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }
}

fn parse_or_default(contents: &str) -> AppSettings {
    serde_json::from_str(contents).unwrap_or_else(|err| {
        warn!("settings file unreadable, using defaults: {err}");
        AppSettings::default()
    })
}
