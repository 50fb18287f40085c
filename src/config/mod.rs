pub mod preferences;

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::core::{
    calculator::CostRates,
    errors::{QuoteError, Result},
    utils::{ensure_dir, PathResolver},
};
use crate::storage::json_backend::replace_file;

pub use preferences::{PreferencesManager, UserPreferences};

const FILAMENT_KEY_PREFIX: &str = "filament.";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "ARS")]
    Ars,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Ars];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ars => "ARS",
        }
    }

    pub fn symbol(self) -> &'static str {
        "$"
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Currency::Usd => "Dólares (USD)",
            Currency::Ars => "Pesos Argentinos (ARS)",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = QuoteError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "ARS" => Ok(Currency::Ars),
            other => Err(QuoteError::InvalidInput(format!(
                "unsupported currency `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FilamentSpec {
    pub price_per_kg: f64,
}

/// Flat application settings. Keys missing from the file take their default value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub theme_mode: String,
    pub currency: Currency,
    pub currency_symbol: String,
    pub currency_name: String,
    pub machine_cost_per_hour: f64,
    pub electricity_kwh_price: f64,
    pub printer_power_watts: f64,
    pub filaments: BTreeMap<String, FilamentSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        let filaments = [
            ("PLA", 25.0),
            ("PETG", 30.0),
            ("ABS", 28.0),
            ("TPU", 40.0),
            ("Wood", 35.0),
            ("Carbon Fiber", 60.0),
        ]
        .into_iter()
        .map(|(name, price_per_kg)| (name.to_string(), FilamentSpec { price_per_kg }))
        .collect();
        Self {
            theme_mode: "system".into(),
            currency: Currency::Usd,
            currency_symbol: Currency::Usd.symbol().into(),
            currency_name: Currency::Usd.display_name().into(),
            machine_cost_per_hour: 0.50,
            electricity_kwh_price: 0.15,
            printer_power_watts: 150.0,
            filaments,
        }
    }
}

impl Settings {
    pub fn rates(&self) -> CostRates {
        CostRates {
            machine_cost_per_hour: self.machine_cost_per_hour,
            electricity_kwh_price: self.electricity_kwh_price,
            printer_power_watts: self.printer_power_watts,
        }
    }

    pub fn filament_prices(&self) -> BTreeMap<String, f64> {
        self.filaments
            .iter()
            .map(|(name, spec)| (name.clone(), spec.price_per_kg))
            .collect()
    }

    /// Setting keys understood by [`SettingsManager::get`] and [`SettingsManager::set`].
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [
            "theme_mode",
            "currency",
            "currency_symbol",
            "currency_name",
            "machine_cost_per_hour",
            "electricity_kwh_price",
            "printer_power_watts",
        ]
        .iter()
        .map(|key| key.to_string())
        .collect();
        keys.extend(
            self.filaments
                .keys()
                .map(|name| format!("{}{}", FILAMENT_KEY_PREFIX, name)),
        );
        keys
    }
}

/// Owns `settings.json` and the in-memory settings loaded from it.
pub struct SettingsManager {
    path: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    pub fn new() -> Result<Self> {
        Self::open(&PathResolver::base_dir())
    }

    /// Loads settings from `base`. A missing file is created with defaults; an
    /// unreadable one is replaced by defaults in memory only.
    pub fn open(base: &Path) -> Result<Self> {
        ensure_dir(base)?;
        let path = PathResolver::settings_file_in(base);
        let settings = if path.exists() {
            read_settings(&path)
        } else {
            let manager = Self {
                path: path.clone(),
                settings: Settings::default(),
            };
            manager.save()?;
            tracing::info!(path = %path.display(), "default settings written");
            manager.settings
        };
        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rates(&self) -> CostRates {
        self.settings.rates()
    }

    pub fn filament_prices(&self) -> BTreeMap<String, f64> {
        self.settings.filament_prices()
    }

    /// Returns the display value of `key`, or `None` when the key is unknown.
    pub fn get(&self, key: &str) -> Option<String> {
        let s = &self.settings;
        let value = match key {
            "theme_mode" => s.theme_mode.clone(),
            "currency" => s.currency.code().to_string(),
            "currency_symbol" => s.currency_symbol.clone(),
            "currency_name" => s.currency_name.clone(),
            "machine_cost_per_hour" => s.machine_cost_per_hour.to_string(),
            "electricity_kwh_price" => s.electricity_kwh_price.to_string(),
            "printer_power_watts" => s.printer_power_watts.to_string(),
            other => {
                let name = other.strip_prefix(FILAMENT_KEY_PREFIX)?;
                return s
                    .filaments
                    .get(name)
                    .map(|spec| spec.price_per_kg.to_string());
            }
        };
        Some(value)
    }

    /// Parses `value` for `key`, stores it, and saves the whole file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "theme_mode" => self.settings.theme_mode = value.trim().to_string(),
            "currency" => return self.update_currency(value),
            "currency_symbol" => self.settings.currency_symbol = value.trim().to_string(),
            "currency_name" => self.settings.currency_name = value.trim().to_string(),
            "machine_cost_per_hour" => {
                self.settings.machine_cost_per_hour = parse_setting(key, value)?
            }
            "electricity_kwh_price" => {
                self.settings.electricity_kwh_price = parse_setting(key, value)?
            }
            "printer_power_watts" => self.settings.printer_power_watts = parse_setting(key, value)?,
            other => match other.strip_prefix(FILAMENT_KEY_PREFIX) {
                Some(name) => return self.set_filament_price(name, parse_setting(key, value)?),
                None => {
                    return Err(QuoteError::ConfigError(format!(
                        "unknown setting `{}`",
                        key
                    )))
                }
            },
        }
        self.save()
    }

    /// Switches currency code, symbol, and name together.
    pub fn update_currency(&mut self, code: &str) -> Result<()> {
        let currency: Currency = code.parse()?;
        self.settings.currency = currency;
        self.settings.currency_symbol = currency.symbol().to_string();
        self.settings.currency_name = currency.display_name().to_string();
        self.save()
    }

    pub fn set_filament_price(&mut self, name: &str, price_per_kg: f64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuoteError::InvalidInput("filament name is required".into()));
        }
        self.settings
            .filaments
            .insert(name.to_string(), FilamentSpec { price_per_kg });
        self.save()
    }

    pub fn remove_filament(&mut self, name: &str) -> Result<()> {
        if self.settings.filaments.remove(name.trim()).is_none() {
            return Err(QuoteError::not_found("Filament", name.trim()));
        }
        self.save()
    }

    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.settings = Settings::default();
        self.save()
    }

    /// Re-reads the settings file.
    pub fn reload(&mut self) {
        self.settings = read_settings(&self.path);
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        replace_file(&self.path, &json).map_err(|err| {
            tracing::error!(path = %self.path.display(), error = %err, "error saving settings");
            err
        })
    }
}

fn read_settings(path: &Path) -> Settings {
    let parsed = fs::read_to_string(path)
        .map_err(QuoteError::from)
        .and_then(|raw| serde_json::from_str::<Settings>(&raw).map_err(QuoteError::from));
    match parsed {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable settings, using defaults");
            Settings::default()
        }
    }
}

fn parse_setting(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| QuoteError::InvalidInput(format!("`{}` expects a number, got `{}`", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let temp = tempdir().expect("temp dir");
        let manager = SettingsManager::open(temp.path()).expect("open");
        assert!(manager.path().exists());
        assert_eq!(manager.settings(), &Settings::default());
        assert_eq!(manager.get("printer_power_watts").as_deref(), Some("150"));
        assert_eq!(manager.get("filament.Carbon Fiber").as_deref(), Some("60"));
    }

    #[test]
    fn present_keys_override_defaults() {
        let temp = tempdir().expect("temp dir");
        fs::write(
            temp.path().join("settings.json"),
            r#"{"machine_cost_per_hour": 1.25, "theme_mode": "dark"}"#,
        )
        .expect("seed settings");
        let manager = SettingsManager::open(temp.path()).expect("open");
        assert_eq!(manager.settings().machine_cost_per_hour, 1.25);
        assert_eq!(manager.settings().theme_mode, "dark");
        assert_eq!(manager.settings().electricity_kwh_price, 0.15);
        assert_eq!(manager.settings().filaments.len(), 6);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = tempdir().expect("temp dir");
        fs::write(temp.path().join("settings.json"), "not json").expect("seed");
        let manager = SettingsManager::open(temp.path()).expect("open");
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn set_persists_and_accepts_out_of_range_values() {
        let temp = tempdir().expect("temp dir");
        let mut manager = SettingsManager::open(temp.path()).expect("open");
        manager.set("printer_power_watts", "-5").expect("set power");
        manager.set("filament.Nylon", "55.5").expect("set filament");
        let reopened = SettingsManager::open(temp.path()).expect("reopen");
        assert_eq!(reopened.settings().printer_power_watts, -5.0);
        assert_eq!(reopened.filament_prices().get("Nylon"), Some(&55.5));
    }

    #[test]
    fn set_rejects_unknown_keys_and_text() {
        let temp = tempdir().expect("temp dir");
        let mut manager = SettingsManager::open(temp.path()).expect("open");
        assert!(matches!(
            manager.set("volume", "11"),
            Err(QuoteError::ConfigError(_))
        ));
        assert!(matches!(
            manager.set("electricity_kwh_price", "cheap"),
            Err(QuoteError::InvalidInput(_))
        ));
    }

    #[test]
    fn currency_switch_updates_symbol_and_name() {
        let temp = tempdir().expect("temp dir");
        let mut manager = SettingsManager::open(temp.path()).expect("open");
        manager.update_currency("ars").expect("switch");
        assert_eq!(manager.settings().currency, Currency::Ars);
        assert_eq!(manager.settings().currency_name, "Pesos Argentinos (ARS)");
        assert!(manager.update_currency("EUR").is_err());
    }
}
