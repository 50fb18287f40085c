use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::TimelineEvent;
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{Project, ProjectPatch, ProjectStatus, Quote};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectStatistics {
    pub quote_count: usize,
    pub quoted_value: f64,
    pub budget: f64,
    pub actual_cost: f64,
    pub remaining_budget: f64,
    pub budget_utilization: f64,
    pub days_until_deadline: Option<i64>,
    pub is_overdue: bool,
}

pub struct ProjectManager {
    repo: Repository<Project>,
}

impl ProjectManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    pub fn create_project(&mut self, project: Project) -> Result<&Project> {
        if project.name.trim().is_empty() {
            return Err(QuoteError::InvalidInput("project name is required".into()));
        }
        self.repo.insert(project)
    }

    pub fn get(&self, id: Uuid) -> Option<&Project> {
        self.repo.get(id)
    }

    pub fn list(&self, status: Option<ProjectStatus>) -> Vec<&Project> {
        self.repo
            .filter(|project| status.map_or(true, |wanted| project.status == wanted))
    }

    pub fn update(&mut self, id: Uuid, patch: ProjectPatch) -> Result<&Project> {
        self.repo.update(id, patch)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Project> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Project> {
        self.repo.search(query)
    }

    pub fn add_quote(&mut self, id: Uuid, quote_id: Uuid) -> Result<()> {
        self.repo.modify(id, |project| {
            if project.quotes.contains(&quote_id) {
                return Err(QuoteError::InvalidInput(format!(
                    "quote {} is already in project",
                    quote_id
                )));
            }
            project.quotes.push(quote_id);
            Ok(())
        })
    }

    pub fn remove_quote(&mut self, id: Uuid, quote_id: Uuid) -> Result<()> {
        self.repo.modify(id, |project| {
            let before = project.quotes.len();
            project.quotes.retain(|existing| *existing != quote_id);
            if project.quotes.len() == before {
                return Err(QuoteError::InvalidInput(format!(
                    "quote {} is not in project",
                    quote_id
                )));
            }
            Ok(())
        })
    }

    /// Resolves the project's quote ids against `quotes`; ids with no quote are skipped.
    pub fn project_quotes<'q>(&self, id: Uuid, quotes: &'q [Quote]) -> Result<Vec<&'q Quote>> {
        let project = self
            .repo
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Project", id))?;
        Ok(project
            .quotes
            .iter()
            .filter_map(|quote_id| quotes.iter().find(|quote| quote.id == *quote_id))
            .collect())
    }

    pub fn project_statistics(
        &self,
        id: Uuid,
        quotes: &[Quote],
        today: NaiveDate,
    ) -> Result<ProjectStatistics> {
        let linked = self.project_quotes(id, quotes)?;
        let project = self
            .repo
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Project", id))?;
        Ok(ProjectStatistics {
            quote_count: project.quotes.len(),
            quoted_value: linked.iter().map(|quote| quote.final_price).sum(),
            budget: project.budget,
            actual_cost: project.actual_cost,
            remaining_budget: project.remaining_budget(),
            budget_utilization: project.budget_utilization(),
            days_until_deadline: project.deadline.map(|due| (due - today).num_days()),
            is_overdue: project.is_overdue(today),
        })
    }

    pub fn overdue_projects(&self, today: NaiveDate) -> Vec<&Project> {
        self.repo.filter(|project| project.is_overdue(today))
    }

    pub fn by_client(&self, client: &str) -> Vec<&Project> {
        self.repo
            .filter(|project| project.client.eq_ignore_ascii_case(client.trim()))
    }

    pub fn archive(&mut self, id: Uuid) -> Result<&Project> {
        self.set_status(id, ProjectStatus::Archived)
    }

    pub fn complete(&mut self, id: Uuid) -> Result<&Project> {
        self.set_status(id, ProjectStatus::Completed)
    }

    pub fn active_count(&self) -> usize {
        self.list(Some(ProjectStatus::Active)).len()
    }

    pub fn timeline(&self, id: Uuid) -> Result<Vec<TimelineEvent>> {
        let project = self
            .repo
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Project", id))?;
        let mut events = vec![TimelineEvent::new(
            project.created_at,
            "created",
            format!("Project `{}` created", project.name),
        )];
        if project.updated_at != project.created_at {
            events.push(TimelineEvent::new(
                project.updated_at,
                "updated",
                "Project updated",
            ));
        }
        if project.status != ProjectStatus::Active {
            events.push(TimelineEvent::new(
                project.updated_at,
                project.status.as_str(),
                format!("Project marked {}", project.status),
            ));
        }
        Ok(events)
    }

    fn set_status(&mut self, id: Uuid, status: ProjectStatus) -> Result<&Project> {
        self.update(
            id,
            ProjectPatch {
                status: Some(status),
                ..ProjectPatch::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{CostBreakdown, CostInputs};
    use crate::storage::JsonStorage;
    use tempfile::TempDir;

    fn manager() -> (ProjectManager, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("storage");
        (ProjectManager::new(Arc::new(storage)), temp)
    }

    fn quote(price: f64) -> Quote {
        let inputs = CostInputs::new(10.0, 1.0, "PLA", 0.0);
        let costs = CostBreakdown {
            material_cost: price,
            print_time_cost: 0.0,
            electricity_cost: 0.0,
            subtotal: price,
            margin_amount: 0.0,
            final_price: price,
        };
        Quote::new("Part", &inputs, &costs)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn quote_links_reject_duplicates_and_skip_orphans() {
        let (mut projects, _guard) = manager();
        let id = projects
            .create_project(Project::new("Cosplay", "helmet parts"))
            .expect("create")
            .id;
        let quotes = vec![quote(10.0), quote(15.5)];
        projects.add_quote(id, quotes[0].id).expect("link");
        projects.add_quote(id, quotes[1].id).expect("link");
        let orphan = Uuid::new_v4();
        projects.add_quote(id, orphan).expect("link orphan");
        let err = projects.add_quote(id, quotes[0].id).expect_err("duplicate");
        assert!(err.to_string().contains("already in project"));

        let linked = projects.project_quotes(id, &quotes).expect("quotes");
        assert_eq!(linked.len(), 2);
        let stats = projects
            .project_statistics(id, &quotes, date(2024, 1, 1))
            .expect("stats");
        assert_eq!(stats.quote_count, 3);
        assert_eq!(stats.quoted_value, 25.5);

        projects.remove_quote(id, orphan).expect("unlink");
        assert!(projects
            .remove_quote(id, orphan)
            .expect_err("missing")
            .to_string()
            .contains("not in project"));
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let (mut projects, _guard) = manager();
        let mut project = Project::new("Signage", "");
        project.budget = 80.0;
        project.deadline = Some(date(2024, 3, 1));
        let id = projects.create_project(project).expect("create").id;
        let quotes = vec![quote(12.0)];
        projects.add_quote(id, quotes[0].id).expect("link");
        let today = date(2024, 2, 1);
        let first = projects
            .project_statistics(id, &quotes, today)
            .expect("stats");
        let second = projects
            .project_statistics(id, &quotes, today)
            .expect("stats");
        assert_eq!(first, second);
        assert_eq!(first.days_until_deadline, Some(29));
    }

    #[test]
    fn overdue_only_counts_active_projects() {
        let (mut projects, _guard) = manager();
        let mut late = Project::new("Late", "");
        late.deadline = Some(date(2024, 3, 1));
        let late = projects.create_project(late).expect("create").id;
        let mut done = Project::new("Done", "");
        done.deadline = Some(date(2024, 3, 1));
        let done = projects.create_project(done).expect("create").id;
        projects.complete(done).expect("complete");

        let overdue = projects.overdue_projects(date(2024, 3, 2));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late);
        assert_eq!(projects.active_count(), 1);
    }

    #[test]
    fn timeline_reflects_status() {
        let (mut projects, _guard) = manager();
        let id = projects
            .create_project(Project::new("Shelf", "wall brackets"))
            .expect("create")
            .id;
        assert_eq!(projects.timeline(id).expect("timeline").len(), 1);
        projects.archive(id).expect("archive");
        let events = projects.timeline(id).expect("timeline");
        assert_eq!(events.first().map(|e| e.event.as_str()), Some("created"));
        assert_eq!(events.last().map(|e| e.event.as_str()), Some("archived"));
    }
}
