use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{api::DEFAULT_BASE_URL, timer::DEFAULT_TICK_INTERVAL};

pub const SETTINGS_FILE: &str = "settings.json";

const ENV_DATA_DIR: &str = "TIMO_DATA_DIR";
const ENV_BASE_URL: &str = "TIMO_API_BASE_URL";
const ENV_TICK_INTERVAL: &str = "TIMO_TICK_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Base that relative request paths are resolved against.
    pub api_base_url: String,
    pub tick_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Apply `TIMO_*` overrides from `lookup` (normally the process env).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = base.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TICK_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_interval_ms = ms,
                _ => warn!("Ignoring {ENV_TICK_INTERVAL}={raw:?}: expected a positive integer"),
            }
        }

        self
    }
}

/// Settings persisted as JSON next to the store.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Settings at {} are unreadable ({err}); using defaults", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stored settings with environment overrides applied.
    pub fn effective(&self) -> Settings {
        self.settings().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

/// `TIMO_DATA_DIR`, else the platform data dir, else the working directory.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match dirs::data_local_dir() {
        Some(dir) => dir.join("timo"),
        None => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_local_store() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, "sqlite://local");
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let settings = Settings::default().with_overrides(env(&[
            (ENV_BASE_URL, " sqlite://other "),
            (ENV_TICK_INTERVAL, "250"),
        ]));
        assert_eq!(settings.api_base_url, "sqlite://other");
        assert_eq!(settings.tick_interval_ms, 250);

        let settings = Settings::default().with_overrides(env(&[(ENV_TICK_INTERVAL, "soon")]));
        assert_eq!(settings.tick_interval_ms, 1000);
    }

    #[test]
    fn store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(SETTINGS_FILE);

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings(), Settings::default());

        let updated = Settings {
            api_base_url: "sqlite://work".into(),
            tick_interval_ms: 500,
        };
        store.update(updated.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.settings(), updated);
    }

    #[test]
    fn partial_or_corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        fs::write(&path, r#"{ "tickIntervalMs": 200 }"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings().tick_interval_ms, 200);
        assert_eq!(store.settings().api_base_url, DEFAULT_BASE_URL);

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SettingsStore::new(path).unwrap().settings(), Settings::default());
    }
}
