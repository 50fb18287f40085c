use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::repository::Entity;
use crate::domain::common::Displayable;

fn default_alert_threshold() -> f64 {
    0.8
}

/// Spending envelope for one period and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub amount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: BudgetStatus,
    #[serde(default)]
    pub category: BudgetCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spent_amount: f64,
    #[serde(default)]
    pub reserved_amount: f64,
    /// Fraction of `amount` at which the budget counts as near its limit.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    #[serde(default)]
    pub transactions: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(name: impl Into<String>, amount: f64, period: BudgetPeriod) -> Self {
        Self::starting_at(name, amount, period, Utc::now())
    }

    pub fn starting_at(
        name: impl Into<String>,
        amount: f64,
        period: BudgetPeriod,
        start_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            period,
            amount,
            start_date,
            end_date: start_date + Duration::days(period.length_days()),
            status: BudgetStatus::Active,
            category: BudgetCategory::General,
            description: String::new(),
            spent_amount: 0.0,
            reserved_amount: 0.0,
            alert_threshold: default_alert_threshold(),
            transactions: Vec::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.amount - self.spent_amount - self.reserved_amount
    }

    pub fn utilization(&self) -> f64 {
        if self.amount <= 0.0 {
            0.0
        } else {
            self.spent_amount / self.amount * 100.0
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.spent_amount > self.amount
    }

    pub fn is_near_limit(&self) -> bool {
        self.utilization() >= self.alert_threshold * 100.0
    }
}

impl Displayable for Budget {
    fn display_label(&self) -> String {
        let flag = if self.is_over_budget() {
            " OVER"
        } else if self.is_near_limit() {
            " NEAR LIMIT"
        } else {
            ""
        };
        format!(
            "{} ({} {}) ${:.2} spent of ${:.2}, ${:.2} left{} [{}]",
            self.name,
            self.period,
            self.category,
            self.spent_amount,
            self.amount,
            self.remaining(),
            flag,
            self.status
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<BudgetStatus>,
    pub category: Option<BudgetCategory>,
    pub description: Option<String>,
    pub alert_threshold: Option<f64>,
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Entity for Budget {
    const FILE_NAME: &'static str = "budgets.json";
    const KIND: &'static str = "Budget";
    type Patch = BudgetPatch;

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
            self.category.as_str(),
        ]
    }

    fn apply_patch(&mut self, patch: BudgetPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.amount {
            self.amount = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.category {
            self.category = value;
        }
        if let Some(value) = patch.description {
            self.description = value;
        }
        if let Some(value) = patch.alert_threshold {
            self.alert_threshold = value;
        }
        if let Some(value) = patch.end_date {
            self.end_date = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

/// A single money movement, optionally charged against a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub budget_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category: BudgetCategory,
    #[serde(default)]
    pub kind: TransactionKind,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub related_quote_id: Option<Uuid>,
    #[serde(default)]
    pub related_project_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(amount: f64, description: impl Into<String>, budget_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            amount,
            description: description.into(),
            budget_id,
            date: now,
            category: BudgetCategory::General,
            kind: TransactionKind::for_amount(amount),
            status: TransactionStatus::Recorded,
            related_quote_id: None,
            related_project_id: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!(
            "{} {} ${:.2} {} ({})",
            self.date.format("%Y-%m-%d"),
            self.kind,
            self.amount,
            self.description,
            self.category
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub category: Option<BudgetCategory>,
    pub status: Option<TransactionStatus>,
    pub related_quote_id: Option<Option<Uuid>>,
    pub related_project_id: Option<Option<Uuid>>,
    pub notes: Option<String>,
}

impl Entity for Transaction {
    const FILE_NAME: &'static str = "transactions.json";
    const KIND: &'static str = "Transaction";
    type Patch = TransactionPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.category.as_str()]
    }

    fn apply_patch(&mut self, patch: TransactionPatch) {
        if let Some(value) = patch.description {
            self.description = value;
        }
        if let Some(value) = patch.category {
            self.category = value;
        }
        if let Some(value) = patch.status {
            self.status = value;
        }
        if let Some(value) = patch.related_quote_id {
            self.related_quote_id = value;
        }
        if let Some(value) = patch.related_project_id {
            self.related_project_id = value;
        }
        if let Some(value) = patch.notes {
            self.notes = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl BudgetPeriod {
    pub fn length_days(self) -> i64 {
        match self {
            BudgetPeriod::Monthly => 30,
            BudgetPeriod::Quarterly => 90,
            BudgetPeriod::Yearly => 365,
        }
    }
}

crate::domain::impl_status_text!(BudgetPeriod {
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    #[default]
    General,
    Materials,
    Labor,
    Maintenance,
    Marketing,
}

crate::domain::impl_status_text!(BudgetCategory {
    General => "general",
    Materials => "materials",
    Labor => "labor",
    Maintenance => "maintenance",
    Marketing => "marketing",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

crate::domain::impl_status_text!(BudgetStatus {
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    /// Positive amounts are spending; zero and negative amounts count as income.
    pub fn for_amount(amount: f64) -> Self {
        if amount > 0.0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }
}

crate::domain::impl_status_text!(TransactionKind {
    Expense => "expense",
    Income => "income",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Recorded,
    Voided,
}

crate::domain::impl_status_text!(TransactionStatus {
    Recorded => "recorded",
    Voided => "voided",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_sets_end_date() {
        let budget = Budget::new("Q2 filament", 300.0, BudgetPeriod::Quarterly);
        assert_eq!((budget.end_date - budget.start_date).num_days(), 90);
    }

    #[test]
    fn derived_figures_follow_spending() {
        let mut budget = Budget::new("Materials", 100.0, BudgetPeriod::Monthly);
        budget.spent_amount = 80.0;
        budget.reserved_amount = 15.0;
        assert_eq!(budget.remaining(), 5.0);
        assert_eq!(budget.utilization(), 80.0);
        assert!(budget.is_near_limit());
        assert!(!budget.is_over_budget());
        budget.spent_amount = 100.5;
        assert!(budget.is_over_budget());
    }

    #[test]
    fn zero_amount_budget_reports_zero_utilization() {
        let mut budget = Budget::new("Empty", 0.0, BudgetPeriod::Yearly);
        budget.spent_amount = 10.0;
        assert_eq!(budget.utilization(), 0.0);
        assert!(budget.is_over_budget());
    }

    #[test]
    fn transaction_kind_follows_sign() {
        assert_eq!(Transaction::new(12.0, "PLA", None).kind, TransactionKind::Expense);
        assert_eq!(Transaction::new(-40.0, "Sale", None).kind, TransactionKind::Income);
        assert_eq!(Transaction::new(0.0, "Reserve", None).kind, TransactionKind::Income);
    }
}
