use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::Settings;
use crate::core::{
    errors::{QuoteError, Result},
    utils::{ensure_dir, PathResolver},
    validation::DataValidator,
};
use crate::storage::json_backend::replace_file;

const RECENT_FILAMENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserPreferences {
    pub animations_enabled: bool,
    pub transition_speed: String,
    pub startup_view: String,
    pub auto_save_quotes: bool,
    pub currency_display: String,
    pub decimal_places: u8,
    /// Most recent first.
    pub recent_filaments: Vec<String>,
    pub favorite_settings: BTreeMap<String, serde_json::Value>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            transition_speed: "normal".into(),
            startup_view: "/".into(),
            auto_save_quotes: true,
            currency_display: "symbol".into(),
            decimal_places: 2,
            recent_filaments: Vec::new(),
            favorite_settings: BTreeMap::new(),
        }
    }
}

impl UserPreferences {
    /// Formats an amount with `decimal_places`, prefixed by the currency symbol,
    /// or by its code when `currency_display` is "code".
    pub fn format_money(&self, value: f64, settings: &Settings) -> String {
        let prefix = if self.currency_display.trim().eq_ignore_ascii_case("code") {
            format!("{} ", settings.currency.code())
        } else {
            settings.currency_symbol.clone()
        };
        DataValidator::format_money(value, &prefix, self.decimal_places)
    }
}

pub struct PreferencesManager {
    path: PathBuf,
    preferences: UserPreferences,
}

impl PreferencesManager {
    pub fn open(base: &Path) -> Result<Self> {
        ensure_dir(base)?;
        let path = PathResolver::preferences_file_in(base);
        let preferences = read_preferences(&path);
        Ok(Self { path, preferences })
    }

    /// Picks up a file replaced on disk, e.g. by a backup restore.
    pub fn reload(&mut self) {
        self.preferences = read_preferences(&self.path);
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let prefs = &mut self.preferences;
        match key {
            "animations_enabled" => prefs.animations_enabled = parse_flag(key, value)?,
            "auto_save_quotes" => prefs.auto_save_quotes = parse_flag(key, value)?,
            "transition_speed" => prefs.transition_speed = value.trim().to_string(),
            "startup_view" => prefs.startup_view = value.trim().to_string(),
            "currency_display" => prefs.currency_display = value.trim().to_string(),
            "decimal_places" => {
                prefs.decimal_places = value.trim().parse().map_err(|_| {
                    QuoteError::InvalidInput(format!("`{}` expects 0-255, got `{}`", key, value))
                })?
            }
            _ => {
                return Err(QuoteError::ConfigError(format!(
                    "unknown preference `{}`",
                    key
                )))
            }
        }
        self.save()
    }

    /// Moves `filament` to the front of the recent list, keeping the five newest.
    pub fn record_recent_filament(&mut self, filament: &str) -> Result<()> {
        let recent = &mut self.preferences.recent_filaments;
        recent.retain(|existing| existing != filament);
        recent.insert(0, filament.to_string());
        recent.truncate(RECENT_FILAMENT_LIMIT);
        self.save()
    }

    pub fn add_favorite_setting(&mut self, name: &str, settings: serde_json::Value) -> Result<()> {
        self.preferences
            .favorite_settings
            .insert(name.to_string(), settings);
        self.save()
    }

    pub fn remove_favorite_setting(&mut self, name: &str) -> Result<()> {
        if self.preferences.favorite_settings.remove(name).is_some() {
            self.save()?;
        }
        Ok(())
    }

    pub fn reset_to_default(&mut self) -> Result<()> {
        self.preferences = UserPreferences::default();
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.preferences)?;
        replace_file(&self.path, &json)
    }
}

fn read_preferences(path: &Path) -> UserPreferences {
    if !path.exists() {
        return UserPreferences::default();
    }
    match fs::read_to_string(path)
        .map_err(QuoteError::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(QuoteError::from))
    {
        Ok(prefs) => prefs,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable preferences");
            UserPreferences::default()
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(QuoteError::InvalidInput(format!(
            "`{}` expects true or false, got `{}`",
            key, raw
        ))),
    }
}
