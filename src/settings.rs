use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::bridge::SessionOptions;

/// Tunables for the completion bridge, kept user-editable because the
/// remote page's pacing varies between services and network conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSettings {
    /// The chat page a session navigates to before injecting.
    pub target_url: String,
    pub poll_interval_ms: u64,
    pub stable_threshold: u32,
    pub settle_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            target_url: "https://chatgpt.com/".into(),
            poll_interval_ms: 1_000,
            stable_threshold: 5,
            settle_delay_ms: 2_000,
            timeout_ms: 120_000,
        }
    }
}

impl BridgeSettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stable_threshold: self.stable_threshold,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    bridge: BridgeSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn bridge(&self) -> BridgeSettings {
        self.data.read().unwrap().bridge.clone()
    }

    pub fn update_bridge(&self, settings: BridgeSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.bridge = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_match_the_bridge_defaults() {
        let options = BridgeSettings::default().session_options();
        let reference = SessionOptions::default();
        assert_eq!(options.poll_interval, reference.poll_interval);
        assert_eq!(options.stable_threshold, reference.stable_threshold);
        assert_eq!(options.settle_delay, reference.settle_delay);
        assert_eq!(options.timeout, reference.timeout);
    }

    #[test]
    fn settings_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let mut bridge = store.bridge();
        bridge.poll_interval_ms = 500;
        bridge.target_url = "https://chat.example/".into();
        store.update_bridge(bridge).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.bridge().poll_interval_ms, 500);
        assert_eq!(reopened.bridge().target_url, "https://chat.example/");
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.bridge().poll_interval_ms, 1_000);
    }
}
