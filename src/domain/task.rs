use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub related_quote_id: Option<Uuid>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            due_date: None,
            reminder_date: None,
            completed_at: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            assigned_to: String::new(),
            project_id: None,
            client_id: None,
            related_quote_id: None,
            tags: BTreeSet::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.map_or(false, |due| now > due)
    }

    /// Whole days until the due date, rounded toward negative infinity.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        self.due_date
            .map(|due| (due - now).num_seconds().div_euclid(SECONDS_PER_DAY))
    }

    pub fn is_due_soon(&self, now: DateTime<Utc>, days: i64) -> bool {
        if self.is_completed() {
            return false;
        }
        self.days_until_due(now)
            .map_or(false, |remaining| (0..=days).contains(&remaining))
    }

    pub fn has_reminder_due(&self, now: DateTime<Utc>) -> bool {
        self.reminder_date.map_or(false, |reminder| now >= reminder)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim().to_lowercase();
        self.tags.iter().any(|existing| existing.to_lowercase() == needle)
    }

    pub fn tags_joined(&self) -> String {
        self.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl Displayable for Task {
    fn display_label(&self) -> String {
        let due = self
            .due_date
            .map(|due| format!(" due {}", due.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        format!(
            "{} ({}, {}){}",
            self.title, self.priority, self.status, due
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub reminder_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub project_id: Option<Option<Uuid>>,
    pub client_id: Option<Option<Uuid>>,
    pub related_quote_id: Option<Option<Uuid>>,
    pub notes: Option<String>,
}

impl Entity for Task {
    const FILE_NAME: &'static str = "tasks.json";
    const KIND: &'static str = "Task";
    type Patch = TaskPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }

    fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(value) = patch.title {
            self.title = value;
        }
        if let Some(value) = patch.description {
            self.description = value;
        }
        if let Some(value) = patch.due_date {
            self.due_date = value;
        }
        if let Some(value) = patch.reminder_date {
            self.reminder_date = value;
        }
        if let Some(value) = patch.priority {
            self.priority = value;
        }
        if let Some(value) = patch.assigned_to {
            self.assigned_to = value;
        }
        if let Some(value) = patch.project_id {
            self.project_id = value;
        }
        if let Some(value) = patch.client_id {
            self.client_id = value;
        }
        if let Some(value) = patch.related_quote_id {
            self.related_quote_id = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

crate::domain::impl_status_text!(TaskPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

crate::domain::impl_status_text!(TaskStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn overdue_ignores_completed_tasks() {
        let mut task = Task::new("Print brackets", "");
        task.due_date = Some(noon() - Duration::hours(1));
        assert!(task.is_overdue(noon()));
        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(noon()));
    }

    #[test]
    fn days_until_due_floors_partial_days() {
        let mut task = Task::new("Post-process", "");
        task.due_date = Some(noon() + Duration::hours(47));
        assert_eq!(task.days_until_due(noon()), Some(1));
        task.due_date = Some(noon() - Duration::hours(1));
        assert_eq!(task.days_until_due(noon()), Some(-1));
        assert!(!task.is_due_soon(noon(), 3));
    }

    #[test]
    fn due_soon_window_is_inclusive() {
        let mut task = Task::new("Ship order", "");
        task.due_date = Some(noon() + Duration::days(3) + Duration::minutes(5));
        assert!(task.is_due_soon(noon(), 3));
        task.due_date = Some(noon() + Duration::days(4));
        assert!(!task.is_due_soon(noon(), 3));
    }

    #[test]
    fn status_text_accepts_spaced_variants() {
        assert_eq!("In Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("someday".parse::<TaskStatus>().is_err());
    }
}
