//! Cost-saving hints, discounted variants and side-by-side comparison of quotes.
//! Pure functions over a quote and the current settings.

use std::str::FromStr;

use serde::Serialize;

use crate::config::Settings;
use crate::core::errors::{QuoteError, Result};
use crate::domain::Quote;

const MACHINE_RATE_FACTOR: f64 = 1.5;
const LONG_PRINT_HOURS: f64 = 24.0;
const HEAVY_PRINT_GRAMS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Material,
    MachineTime,
    PrintTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    /// Estimated money saved; zero for advice without a figure.
    pub savings: f64,
}

/// How hard material and machine-time costs are cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl OptimizationLevel {
    pub fn factor(self) -> f64 {
        match self {
            OptimizationLevel::Conservative => 0.95,
            OptimizationLevel::Moderate => 0.90,
            OptimizationLevel::Aggressive => 0.80,
        }
    }
}

impl FromStr for OptimizationLevel {
    type Err = QuoteError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "conservative" => Ok(OptimizationLevel::Conservative),
            "moderate" => Ok(OptimizationLevel::Moderate),
            "aggressive" => Ok(OptimizationLevel::Aggressive),
            other => Err(QuoteError::InvalidInput(format!(
                "unknown optimization level `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDifference {
    pub field: &'static str,
    pub first: f64,
    pub second: f64,
    pub difference: f64,
    /// Change relative to the first value; zero when the first value is zero.
    pub percentage_change: f64,
}

/// Share of the final price taken by each cost, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostShares {
    pub material: f64,
    pub print_time: f64,
    pub electricity: f64,
    pub subtotal: f64,
    pub profit_amount: f64,
}

pub struct CostOptimizer;

impl CostOptimizer {
    pub fn suggest_savings(quote: &Quote, settings: &Settings) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        if quote.weight_g > 0.0 {
            let current_per_gram = quote.material_cost / quote.weight_g;
            let cheapest = settings
                .filaments
                .iter()
                .min_by(|(_, a), (_, b)| a.price_per_kg.total_cmp(&b.price_per_kg));
            if let Some((name, spec)) = cheapest {
                let cheapest_per_gram = spec.price_per_kg / 1000.0;
                if cheapest_per_gram < current_per_gram {
                    let savings = (current_per_gram - cheapest_per_gram) * quote.weight_g;
                    suggestions.push(Suggestion {
                        kind: SuggestionKind::Material,
                        title: "Cheaper filament".into(),
                        description: format!("Printing in {} would cut the material cost", name),
                        savings,
                    });
                }
            }
        }

        if quote.total_hours > 0.0 {
            let current_rate = quote.print_time_cost / quote.total_hours;
            let machine_rate = settings.machine_cost_per_hour;
            if current_rate > machine_rate * MACHINE_RATE_FACTOR {
                suggestions.push(Suggestion {
                    kind: SuggestionKind::MachineTime,
                    title: "High machine rate".into(),
                    description: format!(
                        "Machine time is billed at {:.2}/h against the configured {:.2}/h",
                        current_rate, machine_rate
                    ),
                    savings: (current_rate - machine_rate) * quote.total_hours,
                });
            }
        }

        if quote.total_hours > LONG_PRINT_HOURS {
            suggestions.push(Suggestion {
                kind: SuggestionKind::PrintTime,
                title: "Long print".into(),
                description: "Over a day of printing; faster profiles or a lighter design would help"
                    .into(),
                savings: 0.0,
            });
        }
        if quote.weight_g > HEAVY_PRINT_GRAMS {
            suggestions.push(Suggestion {
                kind: SuggestionKind::Material,
                title: "Heavy print".into(),
                description: "Over a kilogram of filament; consider lower infill or a hollow design"
                    .into(),
                savings: 0.0,
            });
        }
        suggestions
    }

    /// A copy of `quote` with material and machine-time costs cut by `level`,
    /// electricity unchanged and the final price rebuilt from its margin.
    pub fn optimized_quote(quote: &Quote, level: OptimizationLevel) -> Quote {
        let mut optimized = quote.clone();
        optimized.material_cost *= level.factor();
        optimized.print_time_cost *= level.factor();
        optimized.final_price = optimized.subtotal() * (1.0 + quote.profit_margin_percent / 100.0);
        optimized
    }

    /// Numeric fields that differ between two quotes, in a fixed order.
    pub fn compare_quotes(first: &Quote, second: &Quote) -> Vec<FieldDifference> {
        let fields: [(&'static str, fn(&Quote) -> f64); 7] = [
            ("total_hours", |q| q.total_hours),
            ("weight_g", |q| q.weight_g),
            ("material_cost", |q| q.material_cost),
            ("print_time_cost", |q| q.print_time_cost),
            ("electricity_cost", |q| q.electricity_cost),
            ("subtotal", Quote::subtotal),
            ("final_price", |q| q.final_price),
        ];
        fields
            .into_iter()
            .filter_map(|(field, value_of)| {
                let (a, b) = (value_of(first), value_of(second));
                if a == b {
                    return None;
                }
                let difference = b - a;
                let percentage_change = if a != 0.0 { difference / a * 100.0 } else { 0.0 };
                Some(FieldDifference {
                    field,
                    first: a,
                    second: b,
                    difference,
                    percentage_change,
                })
            })
            .collect()
    }

    pub fn cost_shares(quote: &Quote) -> CostShares {
        let share = |amount: f64| {
            if quote.final_price > 0.0 {
                amount / quote.final_price * 100.0
            } else {
                0.0
            }
        };
        CostShares {
            material: share(quote.material_cost),
            print_time: share(quote.print_time_cost),
            electricity: share(quote.electricity_cost),
            subtotal: share(quote.subtotal()),
            profit_amount: quote.final_price - quote.subtotal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::{calculate, CostInputs};

    fn priced(weight: f64, hours: f64, filament: &str, settings: &Settings) -> Quote {
        let inputs = CostInputs::new(weight, hours, filament, 20.0);
        let costs = calculate(&inputs, &settings.rates(), &settings.filament_prices())
            .expect("calculate");
        Quote::new("Part", &inputs, &costs)
    }

    #[test]
    fn cheaper_filament_is_suggested() {
        let settings = Settings::default();
        let quote = priced(100.0, 2.0, "TPU", &settings);
        let suggestions = CostOptimizer::suggest_savings(&quote, &settings);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::Material);
        assert!(suggestions[0].description.contains("PLA"));
        // TPU 40/kg against PLA 25/kg over 100 g
        assert!((suggestions[0].savings - 1.5).abs() < 1e-9);

        let cheapest = priced(100.0, 2.0, "PLA", &settings);
        assert!(CostOptimizer::suggest_savings(&cheapest, &settings).is_empty());
    }

    #[test]
    fn long_heavy_and_overbilled_jobs_are_flagged() {
        let settings = Settings::default();
        let mut quote = priced(1500.0, 30.0, "PLA", &settings);
        quote.print_time_cost = 30.0 * 2.0;
        let kinds: Vec<_> = CostOptimizer::suggest_savings(&quote, &settings)
            .into_iter()
            .map(|s| (s.kind, s.savings))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (SuggestionKind::MachineTime, 45.0),
                (SuggestionKind::PrintTime, 0.0),
                (SuggestionKind::Material, 0.0),
            ]
        );
    }

    #[test]
    fn optimized_quote_cuts_costs_and_keeps_margin() {
        let settings = Settings::default();
        let quote = priced(100.0, 2.0, "PLA", &settings);
        let optimized = CostOptimizer::optimized_quote(&quote, OptimizationLevel::Aggressive);
        assert!((optimized.material_cost - 2.0).abs() < 1e-9);
        assert!((optimized.print_time_cost - 0.8).abs() < 1e-9);
        assert_eq!(optimized.electricity_cost, quote.electricity_cost);
        assert!((optimized.final_price - (2.8 + 0.045) * 1.2).abs() < 1e-9);
        assert_eq!(optimized.id, quote.id);
        assert_eq!("Moderate".parse::<OptimizationLevel>().ok(), Some(OptimizationLevel::Moderate));
        assert!("extreme".parse::<OptimizationLevel>().is_err());
    }

    #[test]
    fn comparison_lists_only_changed_fields() {
        let settings = Settings::default();
        let first = priced(100.0, 2.0, "PLA", &settings);
        let second = priced(200.0, 2.0, "PLA", &settings);
        let differences = CostOptimizer::compare_quotes(&first, &second);
        let fields: Vec<_> = differences.iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["weight_g", "material_cost", "subtotal", "final_price"]);
        assert_eq!(differences[0].percentage_change, 100.0);
        assert!(CostOptimizer::compare_quotes(&first, &first).is_empty());
    }

    #[test]
    fn shares_are_relative_to_final_price() {
        let settings = Settings::default();
        let quote = priced(100.0, 2.0, "PLA", &settings);
        let shares = CostOptimizer::cost_shares(&quote);
        assert!((shares.subtotal - 100.0 / 1.2).abs() < 1e-9);
        assert!((shares.profit_amount - 3.545 * 0.2).abs() < 1e-9);
    }
}
