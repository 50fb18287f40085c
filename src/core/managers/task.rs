use std::{collections::BTreeMap, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::csv_io;
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{common::parse_timestamp, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::storage::StorageBackend;

const CSV_HEADERS: &[&str] = &[
    "title",
    "description",
    "status",
    "priority",
    "due_date",
    "reminder_date",
    "assigned_to",
    "tags",
    "notes",
];

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.priority.map_or(true, |priority| task.priority == priority)
            && self
                .assigned_to
                .as_deref()
                .map_or(true, |who| task.assigned_to.eq_ignore_ascii_case(who.trim()))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskStatistics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue: usize,
    pub by_priority: BTreeMap<String, usize>,
    /// Percentage of all tasks that are completed.
    pub completion_rate: f64,
}

pub struct TaskManager {
    repo: Repository<Task>,
}

impl TaskManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    pub fn create_task(&mut self, task: Task) -> Result<&Task> {
        if task.title.trim().is_empty() {
            return Err(QuoteError::InvalidInput("task title is required".into()));
        }
        self.repo.insert(task)
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.repo.get(id)
    }

    pub fn list(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.repo.filter(|task| filter.matches(task))
    }

    pub fn update(&mut self, id: Uuid, patch: TaskPatch) -> Result<&Task> {
        self.repo.update(id, patch)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Task> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Task> {
        self.repo.search(query)
    }

    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.repo.filter(|task| task.is_overdue(now))
    }

    pub fn due_soon(&self, now: DateTime<Utc>, days: i64) -> Vec<&Task> {
        self.repo.filter(|task| task.is_due_soon(now, days))
    }

    pub fn with_reminders(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.repo
            .filter(|task| !task.is_completed() && task.has_reminder_due(now))
    }

    pub fn complete(&mut self, id: Uuid) -> Result<&Task> {
        let now = Utc::now();
        self.repo.modify(id, |task| {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
            Ok(())
        })?;
        self.fetch(id)
    }

    pub fn cancel(&mut self, id: Uuid) -> Result<&Task> {
        self.set_status(id, TaskStatus::Cancelled)
    }

    /// Completing goes through [`TaskManager::complete`]; any other status clears
    /// the completion stamp.
    pub fn set_status(&mut self, id: Uuid, status: TaskStatus) -> Result<&Task> {
        if status == TaskStatus::Completed {
            return self.complete(id);
        }
        self.repo.modify(id, |task| {
            task.status = status;
            task.completed_at = None;
            Ok(())
        })?;
        self.fetch(id)
    }

    pub fn set_priority(&mut self, id: Uuid, priority: TaskPriority) -> Result<&Task> {
        self.update(
            id,
            TaskPatch {
                priority: Some(priority),
                ..TaskPatch::default()
            },
        )
    }

    pub fn assign(&mut self, id: Uuid, assignee: &str) -> Result<&Task> {
        self.update(
            id,
            TaskPatch {
                assigned_to: Some(assignee.trim().to_string()),
                ..TaskPatch::default()
            },
        )
    }

    pub fn add_tag(&mut self, id: Uuid, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(QuoteError::InvalidInput("tag is empty".into()));
        }
        self.repo.modify(id, |task| {
            if task.has_tag(tag) {
                return Err(QuoteError::InvalidInput(format!("tag `{}` already exists", tag)));
            }
            task.tags.insert(tag.to_string());
            Ok(())
        })
    }

    pub fn remove_tag(&mut self, id: Uuid, tag: &str) -> Result<()> {
        let needle = tag.trim().to_lowercase();
        self.repo.modify(id, |task| {
            let before = task.tags.len();
            task.tags.retain(|existing| existing.to_lowercase() != needle);
            if task.tags.len() == before {
                return Err(QuoteError::InvalidInput(format!(
                    "tag `{}` doesn't exist",
                    tag.trim()
                )));
            }
            Ok(())
        })
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&Task> {
        self.repo.filter(|task| task.has_tag(tag))
    }

    pub fn by_project(&self, project_id: Uuid) -> Vec<&Task> {
        self.repo.filter(|task| task.project_id == Some(project_id))
    }

    pub fn by_client(&self, client_id: Uuid) -> Vec<&Task> {
        self.repo.filter(|task| task.client_id == Some(client_id))
    }

    /// Accepts ISO-8601 timestamps or plain dates; an empty value clears the due date.
    pub fn set_due_date(&mut self, id: Uuid, raw: &str) -> Result<&Task> {
        let due = parse_optional_timestamp(raw)?;
        self.update(
            id,
            TaskPatch {
                due_date: Some(due),
                ..TaskPatch::default()
            },
        )
    }

    pub fn set_reminder(&mut self, id: Uuid, raw: &str) -> Result<&Task> {
        let reminder = parse_optional_timestamp(raw)?;
        self.update(
            id,
            TaskPatch {
                reminder_date: Some(reminder),
                ..TaskPatch::default()
            },
        )
    }

    /// Open tasks due within `days`, soonest first.
    pub fn upcoming(&self, now: DateTime<Utc>, days: i64) -> Vec<&Task> {
        let mut tasks = self.due_soon(now, days);
        tasks.sort_by_key(|task| task.due_date);
        tasks
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> TaskStatistics {
        let tasks = self.repo.all();
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let mut by_priority = BTreeMap::new();
        for task in tasks {
            *by_priority.entry(task.priority.to_string()).or_insert(0) += 1;
        }
        let completed = count(TaskStatus::Completed);
        TaskStatistics {
            total: tasks.len(),
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed,
            cancelled: count(TaskStatus::Cancelled),
            overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
            by_priority,
            completion_rate: if tasks.is_empty() {
                0.0
            } else {
                completed as f64 / tasks.len() as f64 * 100.0
            },
        }
    }

    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let stamp = |value: Option<DateTime<Utc>>| value.map(|at| at.to_rfc3339()).unwrap_or_default();
        let rows: Vec<Vec<String>> = self
            .repo
            .all()
            .iter()
            .map(|t| {
                vec![
                    t.title.clone(),
                    t.description.clone(),
                    t.status.to_string(),
                    t.priority.to_string(),
                    stamp(t.due_date),
                    stamp(t.reminder_date),
                    t.assigned_to.clone(),
                    t.tags_joined(),
                    t.notes.clone(),
                ]
            })
            .collect();
        csv_io::write_rows(path, CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }

    /// Every row with a title becomes a new task.
    pub fn import_csv(&mut self, path: &Path) -> Result<usize> {
        let mut imported = Vec::new();
        for row in csv_io::read_rows(path)? {
            let title = csv_io::field(&row, "title");
            if title.is_empty() {
                continue;
            }
            let mut task = Task::new(title, csv_io::field(&row, "description"));
            task.status = csv_io::field(&row, "status").parse().unwrap_or_default();
            task.priority = csv_io::field(&row, "priority").parse().unwrap_or_default();
            task.due_date = parse_timestamp(csv_io::field(&row, "due_date"));
            task.reminder_date = parse_timestamp(csv_io::field(&row, "reminder_date"));
            task.assigned_to = csv_io::field(&row, "assigned_to").to_string();
            task.tags = csv_io::field(&row, "tags")
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect();
            task.notes = csv_io::field(&row, "notes").to_string();
            imported.push(task);
        }
        self.repo.insert_many(imported)
    }

    fn fetch(&self, id: Uuid) -> Result<&Task> {
        self.repo.get(id).ok_or_else(|| QuoteError::not_found("Task", id))
    }
}

fn parse_optional_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| QuoteError::InvalidInput(format!("`{}` is not a valid date", raw)))
}
