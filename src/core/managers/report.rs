//! Read-only reports over the saved quotes. Every report is computed from the
//! slice it is given; nothing here touches storage except [`QuoteReports::write_json`].
//!
//! Cost means the quote subtotal (material, machine time and electricity) and
//! profit is the final price minus that subtotal.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::errors::Result;
use crate::domain::{Project, Quote};
use crate::storage::json_backend::replace_file;

const MONTH_KEY_FORMAT: &str = "%Y-%m";
const TOP_CLIENTS: usize = 20;
const NO_CLIENT: &str = "(no client)";

/// Inclusive creation-date window. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReportPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportPeriod {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedPiece {
    pub id: Uuid,
    pub piece_name: String,
    pub final_price: f64,
}

impl From<&Quote> for PricedPiece {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            piece_name: quote.piece_name.clone(),
            final_price: quote.final_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub total_quotes: usize,
    pub total_revenue: f64,
    pub average_quote_value: f64,
    pub total_material_cost: f64,
    pub total_machine_cost: f64,
    pub total_electricity_cost: f64,
    pub most_expensive: PricedPiece,
    pub least_expensive: PricedPiece,
}

/// Running totals for a group of quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QuoteTotals {
    pub quotes: usize,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub print_hours: f64,
    pub filament_g: f64,
}

impl QuoteTotals {
    fn add(&mut self, quote: &Quote) {
        let cost = quote.subtotal();
        self.quotes += 1;
        self.revenue += quote.final_price;
        self.cost += cost;
        self.profit += quote.final_price - cost;
        self.print_hours += quote.total_hours;
        self.filament_g += quote.weight_g;
    }

    fn of<'a>(quotes: impl IntoIterator<Item = &'a Quote>) -> Self {
        let mut totals = Self::default();
        for quote in quotes {
            totals.add(quote);
        }
        totals
    }

    /// Profit as a percentage of revenue; zero without revenue.
    pub fn margin_percent(&self) -> f64 {
        if self.revenue > 0.0 {
            self.profit / self.revenue * 100.0
        } else {
            0.0
        }
    }

    fn average(&self, total: f64) -> f64 {
        if self.quotes == 0 {
            0.0
        } else {
            total / self.quotes as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteLine {
    pub id: Uuid,
    pub piece_name: String,
    pub final_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthDetail {
    pub totals: QuoteTotals,
    pub quotes: Vec<QuoteLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReport {
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    /// Keyed by `YYYY-MM`.
    pub months: BTreeMap<String, MonthDetail>,
    pub total_quotes: usize,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FilamentUsage {
    pub quotes: usize,
    pub grams: f64,
    pub material_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialUsageReport {
    pub generated_at: DateTime<Utc>,
    pub total_filament_g: f64,
    pub average_filament_g: f64,
    pub by_filament: BTreeMap<String, FilamentUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitabilityReport {
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub totals: QuoteTotals,
    pub profit_margin_percent: f64,
    pub average_profit: f64,
    pub average_print_hours: f64,
    pub average_filament_g: f64,
    pub by_filament: BTreeMap<String, QuoteTotals>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTrend {
    pub month: String,
    pub totals: QuoteTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientActivity {
    pub client: String,
    pub quotes: usize,
    pub total_spent: f64,
    pub average_order_value: f64,
    pub first_order: DateTime<Utc>,
    pub last_order: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientAnalysis {
    pub generated_at: DateTime<Utc>,
    /// Biggest spenders first, at most twenty.
    pub clients: Vec<ClientActivity>,
    pub total_clients: usize,
    pub total_quotes: usize,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Positive,
    Negative,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIndicators {
    pub generated_at: DateTime<Utc>,
    pub total_quotes: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_margin_percent: f64,
    pub quotes_last_7_days: usize,
    pub quotes_last_30_days: usize,
    pub quotes_previous_30_days: usize,
    /// Last 30 days against the 30 before; zero when the earlier window is empty.
    pub growth_rate_percent: f64,
    pub trend: Trend,
}

pub struct QuoteReports;

impl QuoteReports {
    /// Totals plus the most and least expensive quote. `None` when the period is empty.
    pub fn summary(
        quotes: &[Quote],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> Option<SummaryReport> {
        let selected = in_period(quotes, period);
        let most = selected
            .iter()
            .copied()
            .max_by(|a, b| a.final_price.total_cmp(&b.final_price))?;
        let least = selected
            .iter()
            .copied()
            .min_by(|a, b| a.final_price.total_cmp(&b.final_price))?;
        let totals = QuoteTotals::of(selected.iter().copied());
        Some(SummaryReport {
            generated_at: now,
            period,
            total_quotes: totals.quotes,
            total_revenue: totals.revenue,
            average_quote_value: totals.average(totals.revenue),
            total_material_cost: selected.iter().map(|q| q.material_cost).sum(),
            total_machine_cost: selected.iter().map(|q| q.print_time_cost).sum(),
            total_electricity_cost: selected.iter().map(|q| q.electricity_cost).sum(),
            most_expensive: most.into(),
            least_expensive: least.into(),
        })
    }

    /// Quotes grouped by creation month, each month listing its quotes.
    pub fn detailed(
        quotes: &[Quote],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> Option<DetailedReport> {
        let selected = in_period(quotes, period);
        if selected.is_empty() {
            return None;
        }
        let mut months: BTreeMap<String, MonthDetail> = BTreeMap::new();
        for quote in &selected {
            let detail = months.entry(month_key(quote.created_at)).or_default();
            detail.totals.add(quote);
            detail.quotes.push(QuoteLine {
                id: quote.id,
                piece_name: quote.piece_name.clone(),
                final_price: quote.final_price,
                created_at: quote.created_at,
            });
        }
        Some(DetailedReport {
            generated_at: now,
            period,
            months,
            total_quotes: selected.len(),
            total_revenue: selected.iter().map(|q| q.final_price).sum(),
        })
    }

    pub fn material_usage(quotes: &[Quote], now: DateTime<Utc>) -> Option<MaterialUsageReport> {
        if quotes.is_empty() {
            return None;
        }
        let mut by_filament: BTreeMap<String, FilamentUsage> = BTreeMap::new();
        for quote in quotes {
            let usage = by_filament.entry(filament_label(quote)).or_default();
            usage.quotes += 1;
            usage.grams += quote.weight_g;
            usage.material_cost += quote.material_cost;
        }
        let total_filament_g: f64 = quotes.iter().map(|q| q.weight_g).sum();
        Some(MaterialUsageReport {
            generated_at: now,
            total_filament_g,
            average_filament_g: total_filament_g / quotes.len() as f64,
            by_filament,
        })
    }

    pub fn profitability(
        quotes: &[Quote],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> Option<ProfitabilityReport> {
        let selected = in_period(quotes, period);
        if selected.is_empty() {
            return None;
        }
        let totals = QuoteTotals::of(selected.iter().copied());
        let mut by_filament: BTreeMap<String, QuoteTotals> = BTreeMap::new();
        for quote in &selected {
            by_filament.entry(filament_label(quote)).or_default().add(quote);
        }
        Some(ProfitabilityReport {
            generated_at: now,
            period,
            profit_margin_percent: totals.margin_percent(),
            average_profit: totals.average(totals.profit),
            average_print_hours: totals.average(totals.print_hours),
            average_filament_g: totals.average(totals.filament_g),
            totals,
            by_filament,
        })
    }

    /// The latest `months` calendar months that have quotes, oldest first.
    pub fn monthly_trends(quotes: &[Quote], months: usize) -> Vec<MonthTrend> {
        let mut grouped: BTreeMap<String, QuoteTotals> = BTreeMap::new();
        for quote in quotes {
            grouped.entry(month_key(quote.created_at)).or_default().add(quote);
        }
        let skip = grouped.len().saturating_sub(months);
        grouped
            .into_iter()
            .skip(skip)
            .map(|(month, totals)| MonthTrend { month, totals })
            .collect()
    }

    /// Spending per client, attributing each quote through the projects that list it.
    /// Quotes outside any project with a client are grouped as "(no client)".
    pub fn client_analysis(
        quotes: &[Quote],
        projects: &[&Project],
        now: DateTime<Utc>,
    ) -> ClientAnalysis {
        let mut owner: HashMap<Uuid, &str> = HashMap::new();
        for project in projects {
            let client = project.client.trim();
            if client.is_empty() {
                continue;
            }
            for quote_id in &project.quotes {
                owner.entry(*quote_id).or_insert(client);
            }
        }

        let mut activity: BTreeMap<&str, ClientActivity> = BTreeMap::new();
        for quote in quotes {
            let client = owner.get(&quote.id).copied().unwrap_or(NO_CLIENT);
            let entry = activity.entry(client).or_insert_with(|| ClientActivity {
                client: client.to_string(),
                quotes: 0,
                total_spent: 0.0,
                average_order_value: 0.0,
                first_order: quote.created_at,
                last_order: quote.created_at,
            });
            entry.quotes += 1;
            entry.total_spent += quote.final_price;
            entry.first_order = entry.first_order.min(quote.created_at);
            entry.last_order = entry.last_order.max(quote.created_at);
        }

        let mut clients: Vec<ClientActivity> = activity
            .into_values()
            .map(|mut entry| {
                entry.average_order_value = entry.total_spent / entry.quotes as f64;
                entry
            })
            .collect();
        clients.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
        let total_clients = clients.len();
        let total_quotes = clients.iter().map(|c| c.quotes).sum();
        let total_revenue = clients.iter().map(|c| c.total_spent).sum();
        clients.truncate(TOP_CLIENTS);
        ClientAnalysis {
            generated_at: now,
            clients,
            total_clients,
            total_quotes,
            total_revenue,
        }
    }

    pub fn performance_indicators(
        quotes: &[Quote],
        now: DateTime<Utc>,
    ) -> Option<PerformanceIndicators> {
        if quotes.is_empty() {
            return None;
        }
        let totals = QuoteTotals::of(quotes);
        let week_ago = now - Duration::days(7);
        let month_ago = now - Duration::days(30);
        let two_months_ago = now - Duration::days(60);
        let count = |from: DateTime<Utc>, to: DateTime<Utc>| {
            quotes
                .iter()
                .filter(|q| q.created_at >= from && q.created_at < to)
                .count()
        };
        let recent = quotes.iter().filter(|q| q.created_at >= month_ago).count();
        let previous = count(two_months_ago, month_ago);
        let growth_rate_percent = if previous > 0 {
            (recent as f64 - previous as f64) / previous as f64 * 100.0
        } else {
            0.0
        };
        let trend = if growth_rate_percent > 0.0 {
            Trend::Positive
        } else if growth_rate_percent < 0.0 {
            Trend::Negative
        } else {
            Trend::Stable
        };
        Some(PerformanceIndicators {
            generated_at: now,
            total_quotes: totals.quotes,
            total_revenue: totals.revenue,
            total_profit: totals.profit,
            average_margin_percent: totals.margin_percent(),
            quotes_last_7_days: quotes.iter().filter(|q| q.created_at >= week_ago).count(),
            quotes_last_30_days: recent,
            quotes_previous_30_days: previous,
            growth_rate_percent,
            trend,
        })
    }

    /// Writes any report as pretty JSON, replacing `path`.
    pub fn write_json<R: Serialize>(report: &R, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        replace_file(path, &json)?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }
}

fn in_period(quotes: &[Quote], period: ReportPeriod) -> Vec<&Quote> {
    quotes
        .iter()
        .filter(|quote| period.contains(quote.created_at))
        .collect()
}

fn month_key(at: DateTime<Utc>) -> String {
    at.format(MONTH_KEY_FORMAT).to_string()
}

fn filament_label(quote: &Quote) -> String {
    match quote.filament_type.trim() {
        "" => "Unknown".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{CostBreakdown, CostInputs};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single().expect("date")
    }

    fn quote(name: &str, filament: &str, subtotal: f64, price: f64, created: DateTime<Utc>) -> Quote {
        let inputs = CostInputs::new(100.0, 2.0, filament, 20.0);
        let costs = CostBreakdown {
            material_cost: subtotal,
            print_time_cost: 0.0,
            electricity_cost: 0.0,
            subtotal,
            margin_amount: price - subtotal,
            final_price: price,
        };
        let mut quote = Quote::new(name, &inputs, &costs);
        quote.created_at = created;
        quote
    }

    fn sample() -> Vec<Quote> {
        vec![
            quote("Gear", "PLA", 8.0, 10.0, at(2024, 1, 5)),
            quote("Vase", "PETG", 20.0, 30.0, at(2024, 1, 20)),
            quote("Clip", "PLA", 1.0, 2.0, at(2024, 3, 2)),
        ]
    }

    #[test]
    fn summary_names_extremes_within_period() {
        let quotes = sample();
        let report = QuoteReports::summary(&quotes, ReportPeriod::default(), at(2024, 4, 1))
            .expect("report");
        assert_eq!(report.total_quotes, 3);
        assert_eq!(report.total_revenue, 42.0);
        assert_eq!(report.average_quote_value, 14.0);
        assert_eq!(report.most_expensive.piece_name, "Vase");
        assert_eq!(report.least_expensive.piece_name, "Clip");

        let january = ReportPeriod::new(Some(at(2024, 1, 1)), Some(at(2024, 1, 31)));
        let report = QuoteReports::summary(&quotes, january, at(2024, 4, 1)).expect("report");
        assert_eq!(report.total_quotes, 2);
        assert_eq!(report.least_expensive.piece_name, "Gear");

        let empty = ReportPeriod::new(Some(at(2030, 1, 1)), None);
        assert!(QuoteReports::summary(&quotes, empty, at(2024, 4, 1)).is_none());
    }

    #[test]
    fn detailed_report_groups_by_month() {
        let quotes = sample();
        let report = QuoteReports::detailed(&quotes, ReportPeriod::default(), at(2024, 4, 1))
            .expect("report");
        assert_eq!(report.months.keys().collect::<Vec<_>>(), vec!["2024-01", "2024-03"]);
        let january = &report.months["2024-01"];
        assert_eq!(january.totals.quotes, 2);
        assert_eq!(january.totals.revenue, 40.0);
        assert_eq!(january.quotes.len(), 2);
        assert_eq!(report.total_revenue, 42.0);
    }

    #[test]
    fn material_usage_splits_by_filament() {
        let quotes = sample();
        let report = QuoteReports::material_usage(&quotes, at(2024, 4, 1)).expect("report");
        assert_eq!(report.total_filament_g, 300.0);
        assert_eq!(report.average_filament_g, 100.0);
        assert_eq!(report.by_filament["PLA"].quotes, 2);
        assert_eq!(report.by_filament["PETG"].material_cost, 20.0);
        assert!(QuoteReports::material_usage(&[], at(2024, 4, 1)).is_none());
    }

    #[test]
    fn profitability_uses_subtotal_as_cost() {
        let quotes = sample();
        let report = QuoteReports::profitability(&quotes, ReportPeriod::default(), at(2024, 4, 1))
            .expect("report");
        assert_eq!(report.totals.cost, 29.0);
        assert_eq!(report.totals.profit, 13.0);
        assert!((report.profit_margin_percent - 13.0 / 42.0 * 100.0).abs() < 1e-9);
        assert_eq!(report.by_filament["PLA"].profit, 3.0);
        assert_eq!(report.average_print_hours, 2.0);
    }

    #[test]
    fn trends_keep_the_latest_months() {
        let quotes = sample();
        let trends = QuoteReports::monthly_trends(&quotes, 1);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].month, "2024-03");
        assert_eq!(QuoteReports::monthly_trends(&quotes, 12).len(), 2);
    }

    #[test]
    fn clients_come_from_project_links() {
        let quotes = sample();
        let mut acme = Project::new("Acme parts", "");
        acme.client = "Acme".into();
        acme.quotes = vec![quotes[0].id, quotes[1].id];
        let internal = Project::new("Internal", "");
        let analysis =
            QuoteReports::client_analysis(&quotes, &[&acme, &internal], at(2024, 4, 1));
        assert_eq!(analysis.total_clients, 2);
        assert_eq!(analysis.clients[0].client, "Acme");
        assert_eq!(analysis.clients[0].average_order_value, 20.0);
        assert_eq!(analysis.clients[0].first_order, at(2024, 1, 5));
        assert_eq!(analysis.clients[1].client, NO_CLIENT);
        assert_eq!(analysis.total_revenue, 42.0);
    }

    #[test]
    fn indicators_compare_the_last_two_months() {
        let now = at(2024, 6, 30);
        let quotes = vec![
            quote("a", "PLA", 1.0, 2.0, now - Duration::days(2)),
            quote("b", "PLA", 1.0, 2.0, now - Duration::days(10)),
            quote("c", "PLA", 1.0, 2.0, now - Duration::days(20)),
            quote("d", "PLA", 1.0, 2.0, now - Duration::days(45)),
            quote("e", "PLA", 1.0, 2.0, now - Duration::days(50)),
        ];
        let kpi = QuoteReports::performance_indicators(&quotes, now).expect("kpi");
        assert_eq!(kpi.quotes_last_7_days, 1);
        assert_eq!(kpi.quotes_last_30_days, 3);
        assert_eq!(kpi.quotes_previous_30_days, 2);
        assert_eq!(kpi.growth_rate_percent, 50.0);
        assert_eq!(kpi.trend, Trend::Positive);
        assert_eq!(kpi.average_margin_percent, 50.0);
        assert!(QuoteReports::performance_indicators(&[], now).is_none());
    }

    #[test]
    fn reports_serialize_to_disk() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("summary.json");
        let quotes = sample();
        let report = QuoteReports::summary(&quotes, ReportPeriod::default(), at(2024, 4, 1))
            .expect("report");
        QuoteReports::write_json(&report, &path).expect("write");
        let raw = std::fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["most_expensive"]["piece_name"], "Vase");
        assert_eq!(value["total_quotes"], 3);
    }
}
