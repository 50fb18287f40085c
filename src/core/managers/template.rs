//! Reusable job presets, one JSON file per template under `<data>/templates/`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::core::{
    calculator::{self, CostBreakdown, CostInputs},
    errors::{QuoteError, Result},
    utils::{ensure_dir, PathResolver},
};
use crate::storage::json_backend::replace_file;

const TEMPLATE_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteTemplate {
    pub name: String,
    pub piece_name: String,
    pub weight_g: f64,
    pub total_hours: f64,
    pub filament_type: String,
    pub profit_margin_percent: f64,
    pub created_at: DateTime<Utc>,
}

impl QuoteTemplate {
    pub fn new(name: impl Into<String>, piece_name: impl Into<String>, inputs: &CostInputs) -> Self {
        Self {
            name: name.into(),
            piece_name: piece_name.into(),
            weight_g: inputs.weight_g,
            total_hours: inputs.total_hours,
            filament_type: inputs.filament_type.clone(),
            profit_margin_percent: inputs.profit_margin_percent,
            created_at: Utc::now(),
        }
    }

    pub fn inputs(&self) -> CostInputs {
        CostInputs::new(
            self.weight_g,
            self.total_hours,
            self.filament_type.clone(),
            self.profit_margin_percent,
        )
    }
}

/// Values replacing the template's own when it is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOverrides {
    pub piece_name: Option<String>,
    pub weight_g: Option<f64>,
    pub total_hours: Option<f64>,
    pub filament_type: Option<String>,
    pub profit_margin_percent: Option<f64>,
}

/// A template priced against the current settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTemplate {
    pub piece_name: String,
    pub inputs: CostInputs,
    pub costs: CostBreakdown,
}

/// One file in the template directory. `template` is `None` when the file
/// could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateListing {
    pub name: String,
    pub template: Option<QuoteTemplate>,
}

pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn open(base: &Path) -> Result<Self> {
        let dir = PathResolver::template_dir_in(base);
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the template, replacing one with the same file name.
    pub fn save(&self, template: &QuoteTemplate) -> Result<PathBuf> {
        let file_name = file_stem(&template.name)?;
        if !(template.weight_g.is_finite() && template.weight_g > 0.0) {
            return Err(QuoteError::Validation(
                "template weight must be greater than zero".into(),
            ));
        }
        if !(template.total_hours.is_finite() && template.total_hours > 0.0) {
            return Err(QuoteError::Validation(
                "template print time must be greater than zero".into(),
            ));
        }
        if template.filament_type.trim().is_empty() {
            return Err(QuoteError::Validation("template needs a filament type".into()));
        }
        let path = self.path_for(&file_name);
        let json = serde_json::to_string_pretty(template)?;
        replace_file(&path, &json)?;
        tracing::info!(template = %template.name, "template saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<QuoteTemplate> {
        let path = self.path_for(&file_stem(name)?);
        if !path.exists() {
            return Err(QuoteError::not_found("template", name));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Every template file sorted by name. Unreadable files are listed without content.
    pub fn list(&self) -> Result<Vec<TemplateListing>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut listings = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let template = match fs::read_to_string(&path)
                .map_err(QuoteError::from)
                .and_then(|raw| serde_json::from_str::<QuoteTemplate>(&raw).map_err(QuoteError::from))
            {
                Ok(template) => Some(template),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "unreadable template");
                    None
                }
            };
            listings.push(TemplateListing {
                name: name.to_string(),
                template,
            });
        }
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(&file_stem(name)?);
        if !path.exists() {
            return Err(QuoteError::not_found("template", name));
        }
        fs::remove_file(&path)?;
        tracing::info!(template = name, "template deleted");
        Ok(())
    }

    /// Loads `name`, applies the overrides and prices the result with `settings`.
    pub fn apply(
        &self,
        name: &str,
        overrides: &TemplateOverrides,
        settings: &Settings,
    ) -> Result<AppliedTemplate> {
        let template = self.load(name)?;
        let mut inputs = template.inputs();
        if let Some(weight) = overrides.weight_g {
            inputs.weight_g = weight;
        }
        if let Some(hours) = overrides.total_hours {
            inputs.total_hours = hours;
        }
        if let Some(filament) = &overrides.filament_type {
            inputs.filament_type = filament.clone();
        }
        if let Some(margin) = overrides.profit_margin_percent {
            inputs.profit_margin_percent = margin;
        }
        let costs = calculator::calculate(&inputs, &settings.rates(), &settings.filament_prices())?;
        let piece_name = overrides
            .piece_name
            .clone()
            .unwrap_or_else(|| template.piece_name.clone());
        Ok(AppliedTemplate {
            piece_name,
            inputs,
            costs,
        })
    }

    /// Writes the stock small, medium and large presets that are missing.
    /// Returns the names written.
    pub fn create_defaults(&self) -> Result<Vec<String>> {
        let presets = [
            ("small_piece", "Small piece", 25.0, 1.5),
            ("medium_piece", "Medium piece", 100.0, 4.0),
            ("large_piece", "Large piece", 300.0, 12.0),
        ];
        let mut created = Vec::new();
        for (name, piece, weight, hours) in presets {
            if self.path_for(name).exists() {
                continue;
            }
            let inputs = CostInputs::new(weight, hours, "PLA", 30.0);
            self.save(&QuoteTemplate::new(name, piece, &inputs))?;
            created.push(name.to_string());
        }
        Ok(created)
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{TEMPLATE_EXTENSION}"))
    }
}

/// File-safe form of a template name: letters, digits, `-` and `_`.
fn file_stem(name: &str) -> Result<String> {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if stem.is_empty() {
        return Err(QuoteError::InvalidInput(format!(
            "template name `{}` has no usable characters",
            name
        )));
    }
    Ok(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, TemplateStore) {
        let temp = tempdir().expect("temp dir");
        let store = TemplateStore::open(temp.path()).expect("store");
        (temp, store)
    }

    #[test]
    fn saved_templates_load_and_list() {
        let (_temp, store) = store();
        let inputs = CostInputs::new(40.0, 2.5, "PETG", 25.0);
        store
            .save(&QuoteTemplate::new("phone stand", "Phone stand", &inputs))
            .expect("save");
        let loaded = store.load("phone stand").expect("load");
        assert_eq!(loaded.piece_name, "Phone stand");
        assert_eq!(loaded.inputs(), inputs);
        assert!(store.dir().join("phone_stand.json").exists());

        let listings = store.list().expect("list");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "phone_stand");
    }

    #[test]
    fn unreadable_files_are_listed_without_content() {
        let (_temp, store) = store();
        fs::write(store.dir().join("broken.json"), "{ not json").expect("write");
        fs::write(store.dir().join("notes.txt"), "ignored").expect("write");
        let listings = store.list().expect("list");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "broken");
        assert!(listings[0].template.is_none());
        assert!(store.load("broken").is_err());
    }

    #[test]
    fn names_are_sanitized_and_checked() {
        let (_temp, store) = store();
        let inputs = CostInputs::new(10.0, 1.0, "PLA", 30.0);
        let path = store
            .save(&QuoteTemplate::new("../evil/name", "x", &inputs))
            .expect("save");
        assert_eq!(path, store.dir().join("evilname.json"));
        assert!(matches!(
            store.save(&QuoteTemplate::new("../", "x", &inputs)),
            Err(QuoteError::InvalidInput(_))
        ));
        let zero = CostInputs::new(0.0, 1.0, "PLA", 30.0);
        assert!(matches!(
            store.save(&QuoteTemplate::new("zero", "x", &zero)),
            Err(QuoteError::Validation(_))
        ));
    }

    #[test]
    fn delete_removes_the_file() {
        let (_temp, store) = store();
        store.create_defaults().expect("defaults");
        store.delete("small_piece").expect("delete");
        assert!(store.load("small_piece").unwrap_err().is_not_found());
        assert!(store.delete("small_piece").unwrap_err().is_not_found());
    }

    #[test]
    fn defaults_are_written_once() {
        let (_temp, store) = store();
        let created = store.create_defaults().expect("defaults");
        assert_eq!(created, vec!["small_piece", "medium_piece", "large_piece"]);
        assert!(store.create_defaults().expect("again").is_empty());
        let large = store.load("large_piece").expect("load");
        assert_eq!(large.weight_g, 300.0);
        assert_eq!(large.total_hours, 12.0);
        assert_eq!(large.profit_margin_percent, 30.0);
    }

    #[test]
    fn apply_prices_with_current_settings_and_overrides() {
        let (_temp, store) = store();
        store.create_defaults().expect("defaults");
        let settings = Settings::default();

        let applied = store
            .apply("medium_piece", &TemplateOverrides::default(), &settings)
            .expect("apply");
        assert_eq!(applied.piece_name, "Medium piece");
        // 0.1 kg * 25 + 4 h * 0.5 + 0.15 kW * 4 h * 0.15
        assert!((applied.costs.subtotal - 4.59).abs() < 1e-9);

        let overrides = TemplateOverrides {
            piece_name: Some("Bracket".into()),
            weight_g: Some(200.0),
            filament_type: Some("PETG".into()),
            ..TemplateOverrides::default()
        };
        let applied = store
            .apply("medium_piece", &overrides, &settings)
            .expect("apply");
        assert_eq!(applied.piece_name, "Bracket");
        assert_eq!(applied.inputs.filament_type, "PETG");
        assert!((applied.costs.material_cost - 6.0).abs() < 1e-9);

        let unknown = TemplateOverrides {
            filament_type: Some("Nylon".into()),
            ..TemplateOverrides::default()
        };
        assert!(matches!(
            store.apply("medium_piece", &unknown, &settings),
            Err(QuoteError::UnknownFilament(_))
        ));
    }
}
