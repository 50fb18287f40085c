//! Per-entity managers. Each owns the repository for its document and adds the
//! queries and derived figures its entity needs. Managers are built once from a
//! shared storage backend and handed to whoever needs them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::StorageBackend;

pub mod budget;
pub mod client;
pub(crate) mod csv_io;
pub mod material;
pub mod printer;
pub mod project;
pub mod quote;
pub mod report;
pub mod task;
pub mod template;

pub use budget::{
    BudgetManager, BudgetStatistics, BudgetUtilization, CategoryTotals, MonthlySummary,
    TransactionFilter,
};
pub use client::{ClientManager, ClientStatistics};
pub use material::{MaterialManager, MaterialStatistics, StockUpdate};
pub use printer::{PrinterCost, PrinterManager, PrinterStatistics};
pub use project::{ProjectManager, ProjectStatistics};
pub use quote::{
    FilterOptions, QuoteFilter, QuoteManager, QuoteSortKey, QuoteStatistics, ValueRange,
};
pub use report::{QuoteReports, ReportPeriod};
pub use task::{TaskFilter, TaskManager, TaskStatistics};
pub use template::{QuoteTemplate, TemplateOverrides, TemplateStore};

/// One entry of an entity history, oldest first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineEvent {
    pub date: DateTime<Utc>,
    pub event: String,
    pub description: String,
}

impl TimelineEvent {
    pub(crate) fn new(date: DateTime<Utc>, event: &str, description: impl Into<String>) -> Self {
        Self {
            date,
            event: event.to_string(),
            description: description.into(),
        }
    }
}

/// Every manager, opened against the same storage backend.
pub struct Managers {
    pub quotes: QuoteManager,
    pub materials: MaterialManager,
    pub printers: PrinterManager,
    pub clients: ClientManager,
    pub projects: ProjectManager,
    pub tasks: TaskManager,
    pub budgets: BudgetManager,
}

impl Managers {
    pub fn open(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            quotes: QuoteManager::new(storage.clone()),
            materials: MaterialManager::new(storage.clone()),
            printers: PrinterManager::new(storage.clone()),
            clients: ClientManager::new(storage.clone()),
            projects: ProjectManager::new(storage.clone()),
            tasks: TaskManager::new(storage.clone()),
            budgets: BudgetManager::new(storage),
        }
    }

    /// Re-reads every document, e.g. after a backup restore.
    pub fn reload(&mut self) {
        self.quotes.reload();
        self.materials.reload();
        self.printers.reload();
        self.clients.reload();
        self.projects.reload();
        self.tasks.reload();
        self.budgets.reload();
    }
}
