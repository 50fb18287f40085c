//! Budgets and the transactions booked against them. The two collections live in
//! separate documents; a transaction may name a budget that no longer exists.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{csv_io, TimelineEvent};
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{
    Budget, BudgetCategory, BudgetPatch, BudgetPeriod, BudgetStatus, Transaction, TransactionKind,
};
use crate::storage::StorageBackend;

const BUDGET_CSV_HEADERS: &[&str] = &[
    "name",
    "period",
    "amount",
    "spent_amount",
    "status",
    "category",
    "start_date",
    "end_date",
];
const TRANSACTION_CSV_HEADERS: &[&str] =
    &["description", "amount", "type", "category", "date", "budget_id"];

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CategoryTotals {
    pub count: usize,
    pub total_amount: f64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetStatistics {
    pub total_budgets: usize,
    pub active_budgets: usize,
    pub completed_budgets: usize,
    pub total_amount: f64,
    pub total_spent: f64,
    pub utilization_rate: f64,
    pub over_budget_count: usize,
    /// Near the alert threshold but not yet over.
    pub near_limit_count: usize,
    pub categories: BTreeMap<BudgetCategory, CategoryTotals>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BudgetUtilization {
    pub spent_amount: f64,
    pub reserved_amount: f64,
    pub remaining_amount: f64,
    pub utilization_percentage: f64,
    pub is_over_budget: bool,
    pub is_near_limit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub budget_id: Option<Uuid>,
    pub category: Option<BudgetCategory>,
    pub kind: Option<TransactionKind>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub transactions: Vec<Transaction>,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_balance: f64,
}

pub struct BudgetManager {
    budgets: Repository<Budget>,
    transactions: Repository<Transaction>,
}

impl BudgetManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            budgets: Repository::open(storage.clone()),
            transactions: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.budgets.reload();
        self.transactions.reload();
    }

    pub fn create_budget(&mut self, budget: Budget) -> Result<&Budget> {
        if budget.name.trim().is_empty() {
            return Err(QuoteError::InvalidInput("budget name is required".into()));
        }
        if !budget.amount.is_finite() || budget.amount < 0.0 {
            return Err(QuoteError::InvalidInput(
                "budget amount must be a non-negative number".into(),
            ));
        }
        self.budgets.insert(budget)
    }

    pub fn get(&self, id: Uuid) -> Option<&Budget> {
        self.budgets.get(id)
    }

    pub fn list(&self, status: Option<BudgetStatus>, category: Option<BudgetCategory>) -> Vec<&Budget> {
        self.budgets.filter(|budget| {
            status.map_or(true, |wanted| budget.status == wanted)
                && category.map_or(true, |wanted| budget.category == wanted)
        })
    }

    pub fn update(&mut self, id: Uuid, patch: BudgetPatch) -> Result<&Budget> {
        self.budgets.update(id, patch)
    }

    /// Removes the budget. Its transactions stay, still pointing at the old id.
    pub fn delete(&mut self, id: Uuid) -> Result<Budget> {
        self.budgets.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Budget> {
        self.budgets.search(query)
    }

    pub fn statistics(&self) -> BudgetStatistics {
        let budgets = self.budgets.all();
        let mut categories: BTreeMap<BudgetCategory, CategoryTotals> = BTreeMap::new();
        for budget in budgets {
            let totals = categories.entry(budget.category).or_default();
            totals.count += 1;
            totals.total_amount += budget.amount;
            totals.total_spent += budget.spent_amount;
        }
        let total_amount: f64 = budgets.iter().map(|b| b.amount).sum();
        let total_spent: f64 = budgets.iter().map(|b| b.spent_amount).sum();
        let count = |status: BudgetStatus| budgets.iter().filter(|b| b.status == status).count();
        BudgetStatistics {
            total_budgets: budgets.len(),
            active_budgets: count(BudgetStatus::Active),
            completed_budgets: count(BudgetStatus::Completed),
            total_amount,
            total_spent,
            utilization_rate: if total_amount > 0.0 {
                total_spent / total_amount * 100.0
            } else {
                0.0
            },
            over_budget_count: self.over_budget().len(),
            near_limit_count: self.near_limit().len(),
            categories,
        }
    }

    /// Records a transaction. A positive amount is an expense; when `budget_id`
    /// names a known budget its spent amount grows by `amount`.
    pub fn add_transaction(
        &mut self,
        amount: f64,
        description: &str,
        budget_id: Option<Uuid>,
        category: Option<BudgetCategory>,
    ) -> Result<&Transaction> {
        if !amount.is_finite() {
            return Err(QuoteError::InvalidInput("amount must be a number".into()));
        }
        let mut transaction = Transaction::new(amount, description.trim(), budget_id);
        transaction.category = category.unwrap_or_default();
        let transaction_id = transaction.id;

        if let Some(id) = budget_id.filter(|id| self.budgets.get(*id).is_some()) {
            self.budgets.modify(id, |budget| {
                budget.spent_amount += amount;
                budget.transactions.push(transaction_id);
                Ok(())
            })?;
            if self.budgets.get(id).map_or(false, Budget::is_over_budget) {
                tracing::warn!(budget = %id, "budget exceeded");
            }
        } else if let Some(id) = budget_id {
            tracing::debug!(budget = %id, "transaction references unknown budget");
        }
        self.transactions.insert(transaction)
    }

    /// Matching transactions, newest first.
    pub fn transactions(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        let mut found = self.transactions.filter(|txn| {
            filter.budget_id.map_or(true, |id| txn.budget_id == Some(id))
                && filter.category.map_or(true, |category| txn.category == category)
                && filter.kind.map_or(true, |kind| txn.kind == kind)
        });
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }

    /// Sets `amount` aside without spending it and books a zero-amount marker
    /// transaction.
    pub fn reserve_amount(&mut self, id: Uuid, amount: f64, description: &str) -> Result<()> {
        check_amount(amount)?;
        let category = self.budgets.modify(id, |budget| {
            if budget.remaining() < amount {
                return Err(QuoteError::InvalidInput(format!(
                    "insufficient funds: {:.2} remaining, {:.2} requested",
                    budget.remaining(),
                    amount
                )));
            }
            budget.reserved_amount += amount;
            Ok(budget.category)
        })?;
        self.add_transaction(
            0.0,
            &format!("Reserve: {}", description.trim()),
            Some(id),
            Some(category),
        )?;
        Ok(())
    }

    pub fn release_reserved(&mut self, id: Uuid, amount: f64) -> Result<()> {
        check_amount(amount)?;
        self.budgets.modify(id, |budget| {
            if budget.reserved_amount < amount {
                return Err(QuoteError::InvalidInput(format!(
                    "insufficient reserved amount: {:.2} reserved",
                    budget.reserved_amount
                )));
            }
            budget.reserved_amount -= amount;
            Ok(())
        })
    }

    pub fn over_budget(&self) -> Vec<&Budget> {
        self.budgets.filter(Budget::is_over_budget)
    }

    pub fn near_limit(&self) -> Vec<&Budget> {
        self.budgets
            .filter(|budget| budget.is_near_limit() && !budget.is_over_budget())
    }

    pub fn utilization(&self, id: Uuid) -> Result<BudgetUtilization> {
        let budget = self
            .budgets
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Budget", id))?;
        Ok(BudgetUtilization {
            spent_amount: budget.spent_amount,
            reserved_amount: budget.reserved_amount,
            remaining_amount: budget.remaining(),
            utilization_percentage: budget.utilization(),
            is_over_budget: budget.is_over_budget(),
            is_near_limit: budget.is_near_limit(),
        })
    }

    pub fn by_category(&self, category: BudgetCategory) -> Vec<&Budget> {
        self.list(None, Some(category))
    }

    pub fn by_period(&self, period: BudgetPeriod) -> Vec<&Budget> {
        self.budgets.filter(|budget| budget.period == period)
    }

    pub fn complete(&mut self, id: Uuid) -> Result<&Budget> {
        self.update(
            id,
            BudgetPatch {
                status: Some(BudgetStatus::Completed),
                ..BudgetPatch::default()
            },
        )
    }

    /// Income is reported as a positive total even though it is stored with a
    /// negative sign.
    pub fn monthly_summary(&self, year: i32, month: u32) -> MonthlySummary {
        let transactions: Vec<Transaction> = self
            .transactions
            .filter(|txn| txn.date.year() == year && txn.date.month() == month)
            .into_iter()
            .cloned()
            .collect();
        let total_income: f64 = transactions
            .iter()
            .filter(|txn| txn.kind == TransactionKind::Income)
            .map(|txn| txn.amount.abs())
            .sum();
        let total_expenses: f64 = transactions
            .iter()
            .filter(|txn| txn.kind == TransactionKind::Expense)
            .map(|txn| txn.amount)
            .sum();
        MonthlySummary {
            year,
            month,
            transactions,
            total_income,
            total_expenses,
            net_balance: total_income - total_expenses,
        }
    }

    /// Creation, every linked transaction in date order, then the last update.
    pub fn timeline(&self, id: Uuid) -> Result<Vec<TimelineEvent>> {
        let budget = self
            .budgets
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Budget", id))?;
        let mut linked = self.transactions.filter(|txn| txn.budget_id == Some(id));
        linked.sort_by_key(|txn| txn.date);

        let mut events = vec![TimelineEvent::new(
            budget.created_at,
            "created",
            format!("Budget created with {:.2}", budget.amount),
        )];
        events.extend(linked.into_iter().map(|txn| {
            TimelineEvent::new(
                txn.date,
                txn.kind.as_str(),
                format!("{} ({:.2})", txn.description, txn.amount),
            )
        }));
        if budget.updated_at != budget.created_at {
            events.push(TimelineEvent::new(
                budget.updated_at,
                "updated",
                "Budget updated",
            ));
        }
        Ok(events)
    }

    pub fn export_budgets_csv(&self, path: &Path) -> Result<usize> {
        let rows: Vec<Vec<String>> = self
            .budgets
            .all()
            .iter()
            .map(|b| {
                vec![
                    b.name.clone(),
                    b.period.to_string(),
                    b.amount.to_string(),
                    b.spent_amount.to_string(),
                    b.status.to_string(),
                    b.category.to_string(),
                    b.start_date.to_rfc3339(),
                    b.end_date.to_rfc3339(),
                ]
            })
            .collect();
        csv_io::write_rows(path, BUDGET_CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }

    pub fn export_transactions_csv(&self, path: &Path) -> Result<usize> {
        let rows: Vec<Vec<String>> = self
            .transactions
            .all()
            .iter()
            .map(|t| {
                vec![
                    t.description.clone(),
                    t.amount.to_string(),
                    t.kind.to_string(),
                    t.category.to_string(),
                    t.date.to_rfc3339(),
                    t.budget_id.map(|id| id.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        csv_io::write_rows(path, TRANSACTION_CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn spending_since(&self, since: DateTime<Utc>) -> f64 {
        self.transactions
            .filter(|txn| txn.date >= since && txn.kind == TransactionKind::Expense)
            .into_iter()
            .map(|txn| txn.amount)
            .sum()
    }
}

fn check_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(QuoteError::InvalidInput(
            "amount must be greater than zero".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::TempDir;

    fn manager_in(dir: &Path) -> BudgetManager {
        let storage = JsonStorage::new(Some(dir.to_path_buf()), None).expect("storage");
        BudgetManager::new(Arc::new(storage))
    }

    #[test]
    fn expenses_grow_spending_and_link_transactions() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let id = budgets
            .create_budget(Budget::new("Filament", 100.0, BudgetPeriod::Monthly))
            .expect("create")
            .id;
        let txn = budgets
            .add_transaction(85.0, "spool order", Some(id), Some(BudgetCategory::Materials))
            .expect("txn")
            .id;

        let reopened = manager_in(temp.path());
        let budget = reopened.get(id).expect("budget");
        assert_eq!(budget.spent_amount, 85.0);
        assert_eq!(budget.transactions, vec![txn]);
        assert_eq!(reopened.near_limit().len(), 1);
        assert!(reopened.over_budget().is_empty());
        assert_eq!(reopened.statistics().near_limit_count, 1);
    }

    #[test]
    fn unknown_budget_id_is_kept_on_transaction() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let ghost = Uuid::new_v4();
        let txn = budgets
            .add_transaction(12.0, "orphan", Some(ghost), None)
            .expect("txn");
        assert_eq!(txn.budget_id, Some(ghost));
        assert_eq!(txn.category, BudgetCategory::General);
    }

    #[test]
    fn reservations_respect_remaining_funds() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let id = budgets
            .create_budget(Budget::new("Parts", 50.0, BudgetPeriod::Quarterly))
            .expect("create")
            .id;
        budgets.reserve_amount(id, 30.0, "nozzles").expect("reserve");
        let err = budgets.reserve_amount(id, 25.0, "more").expect_err("too much");
        assert!(err.to_string().contains("insufficient funds"));

        let marker = budgets.transactions(&TransactionFilter {
            budget_id: Some(id),
            ..TransactionFilter::default()
        });
        assert_eq!(marker.len(), 1);
        assert_eq!(marker[0].amount, 0.0);
        assert_eq!(marker[0].description, "Reserve: nozzles");

        budgets.release_reserved(id, 10.0).expect("release");
        let usage = budgets.utilization(id).expect("utilization");
        assert_eq!(usage.reserved_amount, 20.0);
        assert_eq!(usage.remaining_amount, 30.0);
        assert!(budgets.release_reserved(id, 25.0).is_err());
    }

    #[test]
    fn monthly_summary_nets_income_against_expenses() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        budgets.add_transaction(40.0, "resin", None, None).expect("expense");
        budgets.add_transaction(-100.0, "client payment", None, None).expect("income");
        let now = Utc::now();
        let summary = budgets.monthly_summary(now.year(), now.month());
        assert_eq!(summary.transactions.len(), 2);
        assert_eq!(summary.total_income, 100.0);
        assert_eq!(summary.total_expenses, 40.0);
        assert_eq!(summary.net_balance, 60.0);
        assert!(budgets.monthly_summary(1999, 1).transactions.is_empty());
    }

    #[test]
    fn timeline_lists_creation_then_transactions() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let id = budgets
            .create_budget(Budget::new("Ops", 500.0, BudgetPeriod::Yearly))
            .expect("create")
            .id;
        budgets.add_transaction(20.0, "glue", Some(id), None).expect("txn");
        let events = budgets.timeline(id).expect("timeline");
        assert_eq!(events[0].event, "created");
        assert_eq!(events[1].event, "expense");
        assert!(events[1].description.starts_with("glue"));
        assert_eq!(events.last().map(|e| e.event.as_str()), Some("updated"));
    }

    #[test]
    fn csv_exports_write_one_row_per_record() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let id = budgets
            .create_budget(Budget::new("Export", 10.0, BudgetPeriod::Monthly))
            .expect("create")
            .id;
        budgets.add_transaction(1.0, "a", Some(id), None).expect("txn");
        budgets.add_transaction(2.0, "b", None, None).expect("txn");
        assert_eq!(
            budgets.export_budgets_csv(&temp.path().join("b.csv")).expect("export"),
            1
        );
        assert_eq!(
            budgets
                .export_transactions_csv(&temp.path().join("t.csv"))
                .expect("export"),
            2
        );
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let temp = TempDir::new().expect("temp dir");
        let mut budgets = manager_in(temp.path());
        let id = budgets
            .create_budget(Budget::new("Tools", 80.0, BudgetPeriod::Monthly))
            .expect("create")
            .id;
        budgets
            .add_transaction(60.0, "calipers", Some(id), Some(BudgetCategory::Maintenance))
            .expect("txn");
        assert_eq!(budgets.statistics(), budgets.statistics());
    }
}
