use std::{cmp::Ordering, collections::HashMap, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::{
    calculator::{CostBreakdown, CostInputs},
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{Quote, QuotePatch, QuoteStatus};
use crate::storage::StorageBackend;

const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    /// Case-insensitive substring of the piece name.
    pub piece_name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
}

impl QuoteFilter {
    fn matches(&self, quote: &Quote) -> bool {
        let name_ok = self.piece_name.as_deref().map_or(true, |needle| {
            quote
                .piece_name
                .to_lowercase()
                .contains(&needle.trim().to_lowercase())
        });
        name_ok
            && self.start.map_or(true, |start| quote.created_at >= start)
            && self.end.map_or(true, |end| quote.created_at <= end)
            && self.min_price.map_or(true, |min| quote.final_price >= min)
            && self.max_price.map_or(true, |max| quote.final_price <= max)
            && self.min_hours.map_or(true, |min| quote.total_hours >= min)
            && self.max_hours.map_or(true, |max| quote.total_hours <= max)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuoteStatistics {
    pub total_quotes: usize,
    pub total_revenue: f64,
    pub average_price: f64,
    pub most_used_filament: Option<String>,
}

/// Field a quote listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSortKey {
    PieceName,
    PrintTime,
    Filament,
    FinalPrice,
    CreatedAt,
}

impl QuoteSortKey {
    fn compare(self, a: &Quote, b: &Quote) -> Ordering {
        match self {
            QuoteSortKey::PieceName => a
                .piece_name
                .to_lowercase()
                .cmp(&b.piece_name.to_lowercase()),
            QuoteSortKey::PrintTime => a.total_hours.total_cmp(&b.total_hours),
            QuoteSortKey::Filament => a
                .filament_type
                .to_lowercase()
                .cmp(&b.filament_type.to_lowercase()),
            QuoteSortKey::FinalPrice => a.final_price.total_cmp(&b.final_price),
            QuoteSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

impl FromStr for QuoteSortKey {
    type Err = QuoteError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "name" | "piece_name" => Ok(QuoteSortKey::PieceName),
            "time" | "hours" | "print_time" => Ok(QuoteSortKey::PrintTime),
            "filament" | "filament_type" => Ok(QuoteSortKey::Filament),
            "price" | "final_price" => Ok(QuoteSortKey::FinalPrice),
            "date" | "created" | "created_at" => Ok(QuoteSortKey::CreatedAt),
            other => Err(QuoteError::InvalidInput(format!(
                "cannot sort quotes by `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

/// Bounds of the saved quotes, used to seed filter inputs. `None` without quotes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FilterOptions {
    pub date_range: ValueRange<DateTime<Utc>>,
    pub price_range: ValueRange<f64>,
    pub time_range: ValueRange<f64>,
}

pub struct QuoteManager {
    repo: Repository<Quote>,
}

impl QuoteManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    /// Stores a computed price as a new quote. A blank name becomes `Untitled`.
    pub fn save_quote(
        &mut self,
        piece_name: &str,
        inputs: &CostInputs,
        costs: &CostBreakdown,
    ) -> Result<&Quote> {
        let name = match piece_name.trim() {
            "" => UNTITLED,
            trimmed => trimmed,
        };
        let quote = Quote::new(name, inputs, costs);
        tracing::info!(piece = name, price = quote.final_price, "quote saved");
        self.repo.insert(quote)
    }

    pub fn all(&self) -> &[Quote] {
        self.repo.all()
    }

    pub fn get(&self, id: Uuid) -> Option<&Quote> {
        self.repo.get(id)
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<&Quote> {
        let mut quotes: Vec<&Quote> = self.repo.all().iter().collect();
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        quotes.truncate(limit);
        quotes
    }

    pub fn update(&mut self, id: Uuid, patch: QuotePatch) -> Result<&Quote> {
        self.repo.update(id, patch)
    }

    pub fn set_status(&mut self, id: Uuid, status: QuoteStatus) -> Result<&Quote> {
        self.update(
            id,
            QuotePatch {
                status: Some(status),
                ..QuotePatch::default()
            },
        )
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Quote> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Quote> {
        self.repo.search(query)
    }

    pub fn filter(&self, filter: &QuoteFilter) -> Vec<&Quote> {
        self.repo.filter(|quote| filter.matches(quote))
    }

    /// Every quote ordered by `key`. Equal keys keep their saved order.
    pub fn sorted(&self, key: QuoteSortKey, descending: bool) -> Vec<&Quote> {
        let mut quotes: Vec<&Quote> = self.repo.all().iter().collect();
        quotes.sort_by(|a, b| {
            let order = key.compare(a, b);
            if descending {
                order.reverse()
            } else {
                order
            }
        });
        quotes
    }

    pub fn filter_options(&self) -> Option<FilterOptions> {
        let quotes = self.repo.all();
        let first = quotes.first()?;
        let mut options = FilterOptions {
            date_range: ValueRange {
                min: first.created_at,
                max: first.created_at,
            },
            price_range: ValueRange {
                min: first.final_price,
                max: first.final_price,
            },
            time_range: ValueRange {
                min: first.total_hours,
                max: first.total_hours,
            },
        };
        for quote in &quotes[1..] {
            options.date_range.min = options.date_range.min.min(quote.created_at);
            options.date_range.max = options.date_range.max.max(quote.created_at);
            options.price_range.min = options.price_range.min.min(quote.final_price);
            options.price_range.max = options.price_range.max.max(quote.final_price);
            options.time_range.min = options.time_range.min.min(quote.total_hours);
            options.time_range.max = options.time_range.max.max(quote.total_hours);
        }
        Some(options)
    }

    /// Adds previously exported quotes, keeping their ids. Ids already present are skipped.
    pub fn import(&mut self, quotes: Vec<Quote>) -> Result<usize> {
        let fresh: Vec<Quote> = quotes
            .into_iter()
            .filter(|quote| self.repo.get(quote.id).is_none())
            .collect();
        self.repo.insert_many(fresh)
    }

    pub fn statistics(&self) -> QuoteStatistics {
        let quotes = self.repo.all();
        let total_revenue: f64 = quotes.iter().map(|quote| quote.final_price).sum();
        let average_price = if quotes.is_empty() {
            0.0
        } else {
            total_revenue / quotes.len() as f64
        };
        let mut usage: HashMap<&str, usize> = HashMap::new();
        for quote in quotes {
            *usage.entry(quote.filament_type.as_str()).or_default() += 1;
        }
        // Ties resolve alphabetically so the answer is stable.
        let most_used_filament = usage
            .into_iter()
            .max_by(|(name_a, count_a), (name_b, count_b)| {
                count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
            })
            .map(|(name, _)| name.to_string());
        QuoteStatistics {
            total_quotes: quotes.len(),
            total_revenue,
            average_price,
            most_used_filament,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{calculate, CostRates};
    use crate::storage::JsonStorage;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn manager() -> (QuoteManager, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("storage");
        (QuoteManager::new(Arc::new(storage)), temp)
    }

    fn priced(weight: f64, hours: f64, filament: &str) -> (CostInputs, CostBreakdown) {
        let rates = CostRates {
            machine_cost_per_hour: 0.5,
            electricity_kwh_price: 0.15,
            printer_power_watts: 150.0,
        };
        let prices = BTreeMap::from([("PLA".to_string(), 25.0), ("PETG".to_string(), 30.0)]);
        let inputs = CostInputs::new(weight, hours, filament, 20.0);
        let costs = calculate(&inputs, &rates, &prices).expect("calculate");
        (inputs, costs)
    }

    #[test]
    fn blank_name_is_saved_as_untitled() {
        let (mut quotes, _guard) = manager();
        let (inputs, costs) = priced(100.0, 2.0, "PLA");
        let saved = quotes.save_quote("  ", &inputs, &costs).expect("save");
        assert_eq!(saved.piece_name, "Untitled");
        assert!((saved.final_price - 4.254).abs() < 1e-9);
    }

    #[test]
    fn statistics_and_filters() {
        let (mut quotes, _guard) = manager();
        for (name, weight, hours, filament) in [
            ("Gear", 100.0, 2.0, "PLA"),
            ("Vase", 300.0, 8.0, "PETG"),
            ("Clip", 10.0, 0.5, "PLA"),
        ] {
            let (inputs, costs) = priced(weight, hours, filament);
            quotes.save_quote(name, &inputs, &costs).expect("save");
        }
        let stats = quotes.statistics();
        assert_eq!(stats.total_quotes, 3);
        assert_eq!(stats.most_used_filament.as_deref(), Some("PLA"));
        assert!((stats.average_price * 3.0 - stats.total_revenue).abs() < 1e-9);

        let long_jobs = quotes.filter(&QuoteFilter {
            min_hours: Some(1.0),
            ..QuoteFilter::default()
        });
        assert_eq!(long_jobs.len(), 2);
        assert_eq!(quotes.search("petg").len(), 1);
        assert_eq!(quotes.recent(2).len(), 2);
    }

    #[test]
    fn sorting_and_filter_ranges() {
        let (mut quotes, _guard) = manager();
        assert!(quotes.filter_options().is_none());
        for (name, weight, hours, filament) in [
            ("gear", 100.0, 2.0, "PLA"),
            ("Vase", 300.0, 8.0, "PETG"),
            ("Clip", 10.0, 0.5, "PLA"),
        ] {
            let (inputs, costs) = priced(weight, hours, filament);
            quotes.save_quote(name, &inputs, &costs).expect("save");
        }
        let names = |list: Vec<&Quote>| {
            list.iter()
                .map(|quote| quote.piece_name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(
            names(quotes.sorted(QuoteSortKey::PieceName, false)),
            vec!["Clip", "gear", "Vase"]
        );
        assert_eq!(
            names(quotes.sorted(QuoteSortKey::FinalPrice, true)),
            vec!["Vase", "gear", "Clip"]
        );
        assert_eq!(
            names(quotes.sorted(QuoteSortKey::Filament, false))[0],
            "Vase"
        );

        let options = quotes.filter_options().expect("options");
        assert_eq!(options.time_range, ValueRange { min: 0.5, max: 8.0 });
        assert!(options.price_range.min < options.price_range.max);
        assert!(options.date_range.min <= options.date_range.max);

        assert_eq!("price".parse::<QuoteSortKey>().ok(), Some(QuoteSortKey::FinalPrice));
        assert!("colour".parse::<QuoteSortKey>().is_err());
    }

    #[test]
    fn empty_statistics_are_zero() {
        let (quotes, _guard) = manager();
        let stats = quotes.statistics();
        assert_eq!(stats.total_quotes, 0);
        assert_eq!(stats.average_price, 0.0);
        assert!(stats.most_used_filament.is_none());
    }

    #[test]
    fn status_change_persists() {
        let (mut quotes, guard) = manager();
        let (inputs, costs) = priced(50.0, 1.0, "PLA");
        let id = quotes.save_quote("Hook", &inputs, &costs).expect("save").id;
        quotes.set_status(id, QuoteStatus::Accepted).expect("status");
        let storage = JsonStorage::new(Some(guard.path().to_path_buf()), None).expect("storage");
        let reopened = QuoteManager::new(Arc::new(storage));
        assert_eq!(reopened.get(id).map(|q| q.status), Some(QuoteStatus::Accepted));
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let (mut quotes, _guard) = manager();
        for (name, filament) in [("Hook", "PLA"), ("Lid", "PETG")] {
            let (inputs, costs) = priced(120.0, 3.0, filament);
            quotes.save_quote(name, &inputs, &costs).expect("save");
        }
        assert_eq!(quotes.statistics(), quotes.statistics());
    }
}
