use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

const NOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub quote_count: u32,
    #[serde(default)]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preferred_filament: String,
    /// Percentage applied to this client's quotes.
    #[serde(default)]
    pub discount_rate: f64,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: String::new(),
            phone: String::new(),
            company: String::new(),
            address: String::new(),
            status: ClientStatus::Active,
            total_spent: 0.0,
            quote_count: 0,
            last_contact: None,
            preferred_filament: String::new(),
            discount_rate: 0.0,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn average_order_value(&self) -> f64 {
        if self.quote_count == 0 {
            0.0
        } else {
            self.total_spent / f64::from(self.quote_count)
        }
    }

    /// Appends a `[timestamp] note` line to the running notes.
    pub fn append_note(&mut self, note: &str, at: DateTime<Utc>) {
        let line = format!("[{}] {}", at.format(NOTE_TIMESTAMP_FORMAT), note.trim());
        if self.notes.is_empty() {
            self.notes = line;
        } else {
            self.notes.push('\n');
            self.notes.push_str(&line);
        }
    }

    pub fn discounted(&self, amount: f64) -> f64 {
        amount * (1.0 - self.discount_rate / 100.0)
    }
}

impl Displayable for Client {
    fn display_label(&self) -> String {
        let company = if self.company.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.company)
        };
        format!(
            "{}{} {} spent ${:.2} over {} quotes [{}]",
            self.name, company, self.email, self.total_spent, self.quote_count, self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub status: Option<ClientStatus>,
    pub preferred_filament: Option<String>,
    pub discount_rate: Option<f64>,
    pub notes: Option<String>,
}

impl Entity for Client {
    const FILE_NAME: &'static str = "clients.json";
    const KIND: &'static str = "Client";
    type Patch = ClientPatch;

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
            self.email.as_str(),
            self.company.as_str(),
            self.phone.as_str(),
        ]
    }

    fn apply_patch(&mut self, patch: ClientPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.email {
            self.email = value;
        }
        if let Some(value) = patch.phone {
            self.phone = value;
        }
        if let Some(value) = patch.company {
            self.company = value;
        }
        if let Some(value) = patch.address {
            self.address = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.preferred_filament {
            self.preferred_filament = value;
        }
        if let Some(value) = patch.discount_rate {
            self.discount_rate = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

crate::domain::impl_status_text!(ClientStatus {
    Active => "active",
    Inactive => "inactive",
});

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notes_are_appended_with_timestamps() {
        let mut client = Client::new("Acme");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        client.append_note("first call", at);
        client.append_note("  sent samples ", at);
        assert_eq!(
            client.notes,
            "[2024-05-01 09:30:00] first call\n[2024-05-01 09:30:00] sent samples"
        );
    }

    #[test]
    fn average_order_value_handles_no_orders() {
        let mut client = Client::new("Empty");
        assert_eq!(client.average_order_value(), 0.0);
        client.total_spent = 90.0;
        client.quote_count = 3;
        assert_eq!(client.average_order_value(), 30.0);
    }
}
