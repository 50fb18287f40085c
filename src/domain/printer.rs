use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

fn default_nozzle_diameter() -> f64 {
    0.4
}

fn default_layer_height_range() -> String {
    "0.05-0.3mm".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Printer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub status: PrinterStatus,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub hourly_rate: f64,
    /// Draw in watts.
    #[serde(default)]
    pub power_consumption: f64,
    #[serde(default)]
    pub build_volume: String,
    #[serde(default)]
    pub technology: PrinterTechnology,
    #[serde(default = "default_nozzle_diameter")]
    pub nozzle_diameter: f64,
    #[serde(default = "default_layer_height_range")]
    pub layer_height_range: String,
    #[serde(default)]
    pub materials_supported: Vec<String>,
    /// Print hours between services; zero disables maintenance tracking.
    #[serde(default)]
    pub maintenance_schedule: f64,
    #[serde(default)]
    pub last_maintenance: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_print_hours: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Printer {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        manufacturer: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            model: model.into(),
            manufacturer: manufacturer.into(),
            status: PrinterStatus::Active,
            purchase_date: None,
            purchase_price: 0.0,
            hourly_rate: 0.0,
            power_consumption: 0.0,
            build_volume: String::new(),
            technology: PrinterTechnology::Fdm,
            nozzle_diameter: default_nozzle_diameter(),
            layer_height_range: default_layer_height_range(),
            materials_supported: Vec::new(),
            maintenance_schedule: 0.0,
            last_maintenance: None,
            total_print_hours: 0.0,
            location: String::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due_for_maintenance(&self) -> bool {
        self.maintenance_schedule > 0.0 && self.total_print_hours >= self.maintenance_schedule
    }

    pub fn electricity_cost(&self, hours: f64, kwh_price: f64) -> f64 {
        (self.power_consumption / 1000.0) * hours * kwh_price
    }

    pub fn labor_cost(&self, hours: f64) -> f64 {
        self.hourly_rate * hours
    }

    /// Share of the last `days` days spent printing, capped at 100%.
    pub fn utilization_rate(&self, days: u32) -> f64 {
        if days == 0 {
            return 0.0;
        }
        let available = f64::from(days) * 24.0;
        (self.total_print_hours / available * 100.0).min(100.0)
    }
}

impl Displayable for Printer {
    fn display_label(&self) -> String {
        let flag = if self.is_due_for_maintenance() {
            " MAINTENANCE DUE"
        } else {
            ""
        };
        format!(
            "{} {} {} ({}) {:.1}h{} [{}]",
            self.name,
            self.manufacturer,
            self.model,
            self.technology,
            self.total_print_hours,
            flag,
            self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrinterPatch {
    pub name: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub status: Option<PrinterStatus>,
    pub purchase_date: Option<Option<NaiveDate>>,
    pub purchase_price: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub power_consumption: Option<f64>,
    pub build_volume: Option<String>,
    pub technology: Option<PrinterTechnology>,
    pub nozzle_diameter: Option<f64>,
    pub layer_height_range: Option<String>,
    pub materials_supported: Option<Vec<String>>,
    pub maintenance_schedule: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Entity for Printer {
    const FILE_NAME: &'static str = "printers.json";
    const KIND: &'static str = "Printer";
    type Patch = PrinterPatch;

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
            self.model.as_str(),
            self.manufacturer.as_str(),
            self.location.as_str(),
        ]
    }

    fn apply_patch(&mut self, patch: PrinterPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.manufacturer {
            self.manufacturer = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.purchase_date {
            self.purchase_date = value;
        }
        if let Some(value) = patch.purchase_price {
            self.purchase_price = value;
        }
        if let Some(value) = patch.hourly_rate {
            self.hourly_rate = value;
        }
        if let Some(value) = patch.power_consumption {
            self.power_consumption = value;
        }
        if let Some(value) = patch.build_volume {
            self.build_volume = value;
        }
        if let Some(value) = patch.technology {
            self.technology = value;
        }
        if let Some(value) = patch.nozzle_diameter {
            self.nozzle_diameter = value;
        }
        if let Some(value) = patch.layer_height_range {
            self.layer_height_range = value;
        }
        if let Some(value) = patch.materials_supported {
            self.materials_supported = value;
        }
        if let Some(value) = patch.maintenance_schedule {
            self.maintenance_schedule = value;
        }
        if let Some(value) = patch.location {
            self.location = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrinterStatus {
    #[default]
    Active,
    Maintenance,
    Retired,
}

crate::domain::impl_status_text!(PrinterStatus {
    Active => "active",
    Maintenance => "maintenance",
    Retired => "retired",
});

/// Printing process. Unrecognised labels are preserved verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String", into = "String")]
pub enum PrinterTechnology {
    #[default]
    Fdm,
    Sla,
    Sls,
    Other(String),
}

impl PrinterTechnology {
    pub fn label(&self) -> &str {
        match self {
            PrinterTechnology::Fdm => "FDM",
            PrinterTechnology::Sla => "SLA",
            PrinterTechnology::Sls => "SLS",
            PrinterTechnology::Other(label) => label,
        }
    }
}

impl From<String> for PrinterTechnology {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FDM" => PrinterTechnology::Fdm,
            "SLA" => PrinterTechnology::Sla,
            "SLS" => PrinterTechnology::Sls,
            _ => PrinterTechnology::Other(raw.trim().to_string()),
        }
    }
}

impl From<PrinterTechnology> for String {
    fn from(value: PrinterTechnology) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for PrinterTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_schedule_never_requires_maintenance() {
        let mut printer = Printer::new("Prusa", "MK4", "Prusa Research");
        printer.total_print_hours = 500.0;
        assert!(!printer.is_due_for_maintenance());
        printer.maintenance_schedule = 400.0;
        assert!(printer.is_due_for_maintenance());
    }

    #[test]
    fn electricity_cost_uses_kilowatts() {
        let mut printer = Printer::new("Ender", "3 V2", "Creality");
        printer.power_consumption = 150.0;
        assert!((printer.electricity_cost(2.0, 0.15) - 0.045).abs() < 1e-9);
    }

    #[test]
    fn utilization_is_capped() {
        let mut printer = Printer::new("Bambu", "X1C", "Bambu Lab");
        printer.total_print_hours = 1000.0;
        assert_eq!(printer.utilization_rate(30), 100.0);
        printer.total_print_hours = 72.0;
        assert!((printer.utilization_rate(30) - 10.0).abs() < 1e-9);
        assert_eq!(printer.utilization_rate(0), 0.0);
    }

    #[test]
    fn technology_keeps_unknown_labels() {
        let tech: PrinterTechnology = serde_json::from_str("\"DLP\"").expect("parse");
        assert_eq!(tech, PrinterTechnology::Other("DLP".into()));
        assert_eq!(serde_json::to_string(&tech).expect("encode"), "\"DLP\"");
        let fdm: PrinterTechnology = serde_json::from_str("\"fdm\"").expect("parse");
        assert_eq!(fdm, PrinterTechnology::Fdm);
    }
}
