//! SettingsManager: environment-backed settings with defaults, validation and
//! feature status.

use std::collections::HashMap;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{FeatureStatus, SettingInfo, SettingType};

/// Older deployments used `PORT`; `SERVER_PORT` wins when both are set.
const KEY_ALIASES: &[(&str, &str)] = &[("PORT", "SERVER_PORT")];

/// Snapshot of raw setting values taken at start-up.
#[derive(Debug, Clone, Default)]
pub struct SettingsManager {
    values: HashMap<String, String>,
}

impl SettingsManager {
    /// Capture every known setting from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(
            DEFAULT_SETTINGS
                .keys()
                .map(|k| k.to_string())
                .chain(KEY_ALIASES.iter().map(|(alias, _)| alias.to_string()))
                .filter_map(|key| std::env::var(&key).ok().map(|v| (key, v))),
        )
    }

    /// Build from explicit key/value pairs. Aliases are folded into their
    /// canonical key.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        let mut aliased = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into().trim().to_string();
            if value.is_empty() {
                continue;
            }
            match KEY_ALIASES.iter().find(|(alias, _)| *alias == key) {
                Some((_, canonical)) => aliased.push((canonical.to_string(), value)),
                None => {
                    values.insert(key, value);
                }
            }
        }
        for (key, value) in aliased {
            values.entry(key).or_insert(value);
        }
        Self { values }
    }

    /// Get a setting value. Falls back to the default when unset or invalid.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        let def = DEFAULT_SETTINGS
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("setting not found: {key}"))?;

        let Some(value) = self.values.get(key) else {
            return Ok(def.default.to_string());
        };
        match validate_setting(key, value) {
            Ok(()) => Ok(value.clone()),
            Err(e) => {
                tracing::warn!(key, error = %e, default = def.default, "Invalid setting, using default");
                Ok(def.default.to_string())
            }
        }
    }

    /// Get all settings sorted by key, filling in defaults for missing keys.
    /// Secret values are masked.
    pub fn get_all_settings(&self) -> Vec<SettingInfo> {
        let mut settings: Vec<SettingInfo> = DEFAULT_SETTINGS
            .iter()
            .map(|(key, def)| {
                let value = self.get_setting(key).unwrap_or_default();
                let has_value = !value.is_empty();
                let (setting_type, value) = if def.secret {
                    let masked = if has_value { "********".to_string() } else { String::new() };
                    (SettingType::Secret, masked)
                } else {
                    (SettingType::Normal, value)
                };
                SettingInfo {
                    key: key.to_string(),
                    value,
                    setting_type,
                    required: def.required,
                    description: def.description.to_string(),
                    has_value,
                }
            })
            .collect();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        settings
    }

    /// Check which connectors are properly configured.
    pub fn check_feature_status(&self) -> FeatureStatus {
        let mut status = FeatureStatus {
            twitch_configured: true,
            youtube_configured: true,
            ..FeatureStatus::default()
        };

        if self.get_setting("TWITCH_CHANNEL").unwrap_or_default().is_empty() {
            status.missing_settings.push("TWITCH_CHANNEL".into());
            status.twitch_configured = false;
        }

        let live_id = self.get_setting("YOUTUBE_LIVE_ID").unwrap_or_default();
        for key in ["YOUTUBE_CHANNEL_ID", "YOUTUBE_API_KEY"] {
            // A fixed live id makes the channel id unnecessary.
            if key == "YOUTUBE_CHANNEL_ID" && !live_id.is_empty() {
                continue;
            }
            if self.get_setting(key).unwrap_or_default().is_empty() {
                status.missing_settings.push(key.to_string());
                status.youtube_configured = false;
            }
        }

        for (key, value) in &self.values {
            if let Err(e) = validate_setting(key, value) {
                status.warnings.push(format!("{key} is invalid ({e}), using default"));
            }
        }
        status.warnings.sort();

        if !live_id.is_empty() {
            status
                .warnings
                .push("YOUTUBE_LIVE_ID is set - broadcast search is skipped".into());
        }

        status
    }
}
