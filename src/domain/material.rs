use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

const DEFAULT_DENSITY: f64 = 1.24;

fn default_min_stock_alert() -> f64 {
    1.0
}

fn default_density_value() -> f64 {
    DEFAULT_DENSITY
}

/// Filament or resin stock tracked in the material catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub material_type: String,
    #[serde(default)]
    pub price_per_kg: f64,
    #[serde(default = "default_density_value")]
    pub density: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub status: MaterialStatus,
    #[serde(default)]
    pub stock_quantity: f64,
    #[serde(default = "default_min_stock_alert")]
    pub min_stock_alert: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// Creates a material with density and printing properties preset for its type.
    pub fn new(name: impl Into<String>, material_type: impl Into<String>, price_per_kg: f64) -> Self {
        let material_type = material_type.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            density: default_density(&material_type),
            properties: default_properties(&material_type),
            material_type,
            price_per_kg,
            color: String::new(),
            manufacturer: String::new(),
            supplier: String::new(),
            status: MaterialStatus::Active,
            stock_quantity: 0.0,
            min_stock_alert: default_min_stock_alert(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_alert
    }

    pub fn inventory_value(&self) -> f64 {
        self.stock_quantity * self.price_per_kg
    }

    /// Price of `weight_g` grams of this material.
    pub fn cost_for_weight(&self, weight_g: f64) -> f64 {
        (weight_g / 1000.0) * self.price_per_kg
    }
}

/// Typical density in g/cm³ for a material family.
pub fn default_density(material_type: &str) -> f64 {
    match material_type.trim().to_ascii_uppercase().as_str() {
        "PLA" => 1.24,
        "ABS" => 1.04,
        "PETG" => 1.27,
        "TPU" => 1.21,
        "NYLON" => 1.15,
        "PC" => 1.20,
        "WOOD FILL" => 1.28,
        "METAL FILL" => 3.50,
        _ => DEFAULT_DENSITY,
    }
}

/// Printing properties preset for the common filament families.
pub fn default_properties(material_type: &str) -> BTreeMap<String, String> {
    let preset: &[(&str, &str)] = match material_type.trim().to_ascii_uppercase().as_str() {
        "PLA" => &[
            ("printing_temp", "190-220°C"),
            ("bed_temp", "50-60°C"),
            ("diameter", "1.75mm"),
            ("finish", "Glossy"),
            ("strength", "Medium"),
        ],
        "ABS" => &[
            ("printing_temp", "220-250°C"),
            ("bed_temp", "90-110°C"),
            ("diameter", "1.75mm"),
            ("finish", "Matte"),
            ("strength", "High"),
        ],
        "PETG" => &[
            ("printing_temp", "220-250°C"),
            ("bed_temp", "70-80°C"),
            ("diameter", "1.75mm"),
            ("finish", "Semi-transparent"),
            ("strength", "High"),
        ],
        "TPU" => &[
            ("printing_temp", "220-240°C"),
            ("bed_temp", "50-60°C"),
            ("diameter", "1.75mm"),
            ("finish", "Flexible"),
            ("strength", "Flexible"),
        ],
        _ => &[],
    };
    preset
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

impl Displayable for Material {
    fn display_label(&self) -> String {
        let flag = if self.is_low_stock() { " LOW" } else { "" };
        format!(
            "{} ({}) ${:.2}/kg stock {:.2}{} [{}]",
            self.name, self.material_type, self.price_per_kg, self.stock_quantity, flag, self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialPatch {
    pub name: Option<String>,
    pub material_type: Option<String>,
    pub price_per_kg: Option<f64>,
    pub density: Option<f64>,
    pub color: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub status: Option<MaterialStatus>,
    pub min_stock_alert: Option<f64>,
    pub properties: Option<BTreeMap<String, String>>,
    pub notes: Option<String>,
}

impl Entity for Material {
    const FILE_NAME: &'static str = "materials.json";
    const KIND: &'static str = "Material";
    type Patch = MaterialPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn natural_key(&self) -> Option<&str> {
        Some(self.name.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.material_type.as_str(),
            self.manufacturer.as_str(),
            self.color.as_str(),
        ]
    }

    fn apply_patch(&mut self, patch: MaterialPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.material_type {
            self.material_type = value;
        }
        if let Some(value) = patch.price_per_kg {
            self.price_per_kg = value;
        }
        if let Some(value) = patch.density {
            self.density = value;
        }
        if let Some(value) = patch.color {
            self.color = value;
        }
        if let Some(value) = patch.manufacturer {
            self.manufacturer = value;
        }
        if let Some(value) = patch.supplier {
            self.supplier = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.min_stock_alert {
            self.min_stock_alert = value;
        }
        if let Some(value) = patch.properties {
            self.properties = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    #[default]
    Active,
    Discontinued,
}

crate::domain::impl_status_text!(MaterialStatus {
    Active => "active",
    Discontinued => "discontinued",
});

/// How a stock quantity is applied to the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOperation {
    Add,
    Remove,
    Set,
}

crate::domain::impl_status_text!(StockOperation {
    Add => "add",
    Remove => "remove",
    Set => "set",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_material_uses_type_presets() {
        let material = Material::new("PLA Premium", "PLA", 25.0);
        assert_eq!(material.density, 1.24);
        assert_eq!(
            material.properties.get("bed_temp").map(String::as_str),
            Some("50-60°C")
        );
        let metal = Material::new("Bronze", "Metal Fill", 90.0);
        assert_eq!(metal.density, 3.50);
        assert!(metal.properties.is_empty());
    }

    #[test]
    fn low_stock_is_inclusive() {
        let mut material = Material::new("ABS Black", "ABS", 28.0);
        material.stock_quantity = 1.0;
        assert!(material.is_low_stock());
        material.stock_quantity = 1.01;
        assert!(!material.is_low_stock());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = format!(
            r#"{{"id":"{}","name":"Legacy","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        let material: Material = serde_json::from_str(&json).expect("parse legacy material");
        assert_eq!(material.min_stock_alert, 1.0);
        assert_eq!(material.density, 1.24);
        assert_eq!(material.status, MaterialStatus::Active);
    }
}
