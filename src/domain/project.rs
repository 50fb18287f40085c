use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

/// Groups quotes for one job or customer order.
///
/// `quotes` holds plain quote ids; nothing checks that they still exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub quotes: Vec<Uuid>,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub actual_cost: f64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: ProjectStatus::Active,
            quotes: Vec::new(),
            budget: 0.0,
            actual_cost: 0.0,
            deadline: None,
            client: String::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Budget left after actual costs; zero when no budget was set.
    pub fn remaining_budget(&self) -> f64 {
        if self.budget > 0.0 {
            self.budget - self.actual_cost
        } else {
            0.0
        }
    }

    pub fn budget_utilization(&self) -> f64 {
        if self.budget > 0.0 {
            self.actual_cost / self.budget * 100.0
        } else {
            0.0
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ProjectStatus::Active && self.deadline.map_or(false, |due| due < today)
    }
}

impl Displayable for Project {
    fn display_label(&self) -> String {
        let deadline = self
            .deadline
            .map(|date| format!(" due {}", date))
            .unwrap_or_default();
        format!(
            "{} ({} quotes, ${:.2}/${:.2}){} [{}]",
            self.name,
            self.quotes.len(),
            self.actual_cost,
            self.budget,
            deadline,
            self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub budget: Option<f64>,
    pub actual_cost: Option<f64>,
    pub deadline: Option<Option<NaiveDate>>,
    pub client: Option<String>,
    pub notes: Option<String>,
}

impl Entity for Project {
    const FILE_NAME: &'static str = "projects.json";
    const KIND: &'static str = "Project";
    type Patch = ProjectPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.client.as_str(),
        ]
    }

    fn apply_patch(&mut self, patch: ProjectPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.description {
            self.description = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.budget {
            self.budget = value;
        }
        if let Some(value) = patch.actual_cost {
            self.actual_cost = value;
        }
        if let Some(value) = patch.deadline {
            self.deadline = value;
        }
        if let Some(value) = patch.client {
            self.client = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

crate::domain::impl_status_text!(ProjectStatus {
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_figures_are_zero_without_budget() {
        let mut project = Project::new("Cosplay", "");
        project.actual_cost = 40.0;
        assert_eq!(project.remaining_budget(), 0.0);
        assert_eq!(project.budget_utilization(), 0.0);
        project.budget = 160.0;
        assert_eq!(project.remaining_budget(), 120.0);
        assert_eq!(project.budget_utilization(), 25.0);
    }

    #[test]
    fn only_active_projects_are_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let mut project = Project::new("Late", "");
        project.deadline = NaiveDate::from_ymd_opt(2024, 6, 9);
        assert!(project.is_overdue(today));
        project.status = ProjectStatus::Completed;
        assert!(!project.is_overdue(today));
    }
}
