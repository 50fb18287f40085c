use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::calculator::{CostBreakdown, CostInputs};
use crate::core::repository::Entity;
use crate::domain::common::Displayable;

/// A saved cost-calculation result for one printed piece.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub piece_name: String,
    #[serde(default)]
    pub weight_g: f64,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub filament_type: String,
    #[serde(default)]
    pub material_cost: f64,
    #[serde(default)]
    pub print_time_cost: f64,
    #[serde(default)]
    pub electricity_cost: f64,
    #[serde(default)]
    pub profit_margin_percent: f64,
    #[serde(default)]
    pub final_price: f64,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(piece_name: impl Into<String>, inputs: &CostInputs, costs: &CostBreakdown) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            piece_name: piece_name.into(),
            weight_g: inputs.weight_g,
            total_hours: inputs.total_hours,
            filament_type: inputs.filament_type.clone(),
            material_cost: costs.material_cost,
            print_time_cost: costs.print_time_cost,
            electricity_cost: costs.electricity_cost,
            profit_margin_percent: inputs.profit_margin_percent,
            final_price: costs.final_price,
            status: QuoteStatus::Pending,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moment the quote was calculated.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subtotal(&self) -> f64 {
        self.material_cost + self.print_time_cost + self.electricity_cost
    }
}

impl Displayable for Quote {
    fn display_label(&self) -> String {
        format!(
            "{} [{}] {:.1}g {:.2}h ${:.2} ({})",
            self.piece_name,
            self.filament_type,
            self.weight_g,
            self.total_hours,
            self.final_price,
            self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuotePatch {
    pub piece_name: Option<String>,
    pub status: Option<QuoteStatus>,
    pub notes: Option<String>,
}

impl Entity for Quote {
    const FILE_NAME: &'static str = "quotes.json";
    const KIND: &'static str = "Quote";
    type Patch = QuotePatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.piece_name.as_str(), self.filament_type.as_str()]
    }

    fn apply_patch(&mut self, patch: QuotePatch) {
        if let Some(name) = patch.piece_name {
            self.piece_name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

crate::domain::impl_status_text!(QuoteStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});
