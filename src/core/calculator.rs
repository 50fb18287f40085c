//! Price breakdown for a single print job.
//!
//! ```text
//! material_cost    = weight_g / 1000 * price_per_kg
//! print_time_cost  = total_hours * machine_cost_per_hour
//! electricity_cost = printer_power_watts / 1000 * total_hours * electricity_kwh_price
//! subtotal         = material + print_time + electricity
//! final_price      = subtotal + subtotal * margin / 100
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QuoteError, Result};

/// Machine and energy rates taken from settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub machine_cost_per_hour: f64,
    pub electricity_kwh_price: f64,
    pub printer_power_watts: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostInputs {
    pub weight_g: f64,
    pub total_hours: f64,
    pub filament_type: String,
    pub profit_margin_percent: f64,
}

impl CostInputs {
    pub fn new(
        weight_g: f64,
        total_hours: f64,
        filament_type: impl Into<String>,
        profit_margin_percent: f64,
    ) -> Self {
        Self {
            weight_g,
            total_hours,
            filament_type: filament_type.into(),
            profit_margin_percent,
        }
    }

    /// Builds inputs from an hours and minutes split.
    pub fn from_parts(
        weight_g: f64,
        hours: f64,
        minutes: f64,
        filament_type: impl Into<String>,
        profit_margin_percent: f64,
    ) -> Self {
        Self::new(
            weight_g,
            hours + minutes / 60.0,
            filament_type,
            profit_margin_percent,
        )
    }

    /// Parses raw form fields. Blank hours, minutes, or margin count as zero.
    pub fn parse(
        weight: &str,
        hours: &str,
        minutes: &str,
        filament_type: &str,
        margin: &str,
    ) -> Result<Self> {
        if weight.trim().is_empty() || filament_type.trim().is_empty() {
            return Err(QuoteError::IncompleteInput(
                "weight and filament type are required".into(),
            ));
        }
        let weight_g = parse_number("weight", weight)?;
        let hours = parse_optional("hours", hours)?;
        let minutes = parse_optional("minutes", minutes)?;
        let margin = parse_optional("margin", margin)?;
        Ok(Self::from_parts(
            weight_g,
            hours,
            minutes,
            filament_type.trim(),
            margin,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material_cost: f64,
    pub print_time_cost: f64,
    pub electricity_cost: f64,
    pub subtotal: f64,
    pub margin_amount: f64,
    pub final_price: f64,
}

/// Computes the price breakdown. Inputs are checked before any arithmetic; nothing
/// is persisted here.
pub fn calculate(
    inputs: &CostInputs,
    rates: &CostRates,
    filament_prices: &BTreeMap<String, f64>,
) -> Result<CostBreakdown> {
    if !(inputs.weight_g.is_finite() && inputs.weight_g > 0.0) {
        return Err(QuoteError::IncompleteInput(
            "weight must be greater than zero".into(),
        ));
    }
    if !(inputs.total_hours.is_finite() && inputs.total_hours > 0.0) {
        return Err(QuoteError::IncompleteInput(
            "print time must be greater than zero".into(),
        ));
    }
    if inputs.filament_type.trim().is_empty() {
        return Err(QuoteError::IncompleteInput("select a filament type".into()));
    }
    if !inputs.profit_margin_percent.is_finite() {
        return Err(QuoteError::Calculation("margin is not a number".into()));
    }
    let price_per_kg = filament_price(filament_prices, &inputs.filament_type)
        .ok_or_else(|| QuoteError::UnknownFilament(inputs.filament_type.clone()))?;

    let material_cost = (inputs.weight_g / 1000.0) * price_per_kg;
    let print_time_cost = inputs.total_hours * rates.machine_cost_per_hour;
    let electricity_cost =
        (rates.printer_power_watts / 1000.0) * inputs.total_hours * rates.electricity_kwh_price;
    let subtotal = material_cost + print_time_cost + electricity_cost;
    let margin_amount = subtotal * (inputs.profit_margin_percent / 100.0);
    let final_price = subtotal + margin_amount;

    Ok(CostBreakdown {
        material_cost,
        print_time_cost,
        electricity_cost,
        subtotal,
        margin_amount,
        final_price,
    })
}

/// Exact key first, then a case-insensitive match.
fn filament_price(prices: &BTreeMap<String, f64>, filament: &str) -> Option<f64> {
    let filament = filament.trim();
    prices.get(filament).copied().or_else(|| {
        prices
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(filament))
            .map(|(_, price)| *price)
    })
}

/// Reads a finite number, accepting a decimal comma ("2,5").
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn parse_number(field: &str, raw: &str) -> Result<f64> {
    parse_decimal(raw).ok_or_else(|| {
        QuoteError::Calculation(format!("{} `{}` is not a number", field, raw.trim()))
    })
}

fn parse_optional(field: &str, raw: &str) -> Result<f64> {
    if raw.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_number(field, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> CostRates {
        CostRates {
            machine_cost_per_hour: 0.50,
            electricity_kwh_price: 0.15,
            printer_power_watts: 150.0,
        }
    }

    fn prices() -> BTreeMap<String, f64> {
        BTreeMap::from([("PLA".to_string(), 25.0), ("PETG".to_string(), 30.0)])
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn reference_job_breakdown() {
        let inputs = CostInputs::new(100.0, 2.0, "PLA", 20.0);
        let cost = calculate(&inputs, &rates(), &prices()).expect("calculate");
        assert!(close(cost.material_cost, 2.50));
        assert!(close(cost.print_time_cost, 1.00));
        assert!(close(cost.electricity_cost, 0.045));
        assert!(close(cost.subtotal, 3.545));
        assert!(close(cost.margin_amount, 0.709));
        assert!(close(cost.final_price, 4.254));
    }

    #[test]
    fn final_price_equals_subtotal_times_margin_factor() {
        for (weight, hours, margin) in [(12.5, 0.25, 0.0), (640.0, 31.5, 45.0), (3.0, 1.0, 150.0)] {
            let inputs = CostInputs::new(weight, hours, "PETG", margin);
            let cost = calculate(&inputs, &rates(), &prices()).expect("calculate");
            let expected = (cost.material_cost + cost.print_time_cost + cost.electricity_cost)
                * (1.0 + margin / 100.0);
            assert!(close(cost.final_price, expected));
        }
    }

    #[test]
    fn zero_weight_or_time_is_rejected() {
        let zero_weight = CostInputs::new(0.0, 2.0, "PLA", 20.0);
        assert!(matches!(
            calculate(&zero_weight, &rates(), &prices()),
            Err(QuoteError::IncompleteInput(_))
        ));
        let zero_time = CostInputs::new(10.0, 0.0, "PLA", 20.0);
        assert!(matches!(
            calculate(&zero_time, &rates(), &prices()),
            Err(QuoteError::IncompleteInput(_))
        ));
        let no_filament = CostInputs::new(10.0, 1.0, " ", 20.0);
        assert!(matches!(
            calculate(&no_filament, &rates(), &prices()),
            Err(QuoteError::IncompleteInput(_))
        ));
    }

    #[test]
    fn negative_margin_lowers_price_below_subtotal() {
        let inputs = CostInputs::new(100.0, 2.0, "PLA", -10.0);
        let cost = calculate(&inputs, &rates(), &prices()).expect("calculate");
        assert!(cost.final_price < cost.subtotal);
    }

    #[test]
    fn unknown_filament_is_reported() {
        let inputs = CostInputs::new(100.0, 2.0, "Unobtanium", 20.0);
        let err = calculate(&inputs, &rates(), &prices()).expect_err("unknown");
        assert!(matches!(err, QuoteError::UnknownFilament(ref name) if name == "Unobtanium"));
        let lower = CostInputs::new(100.0, 2.0, "pla", 20.0);
        assert!(calculate(&lower, &rates(), &prices()).is_ok());
    }

    #[test]
    fn parse_combines_hours_and_minutes() {
        let inputs = CostInputs::parse("150", "1", "30", "PLA", "25").expect("parse");
        assert!(close(inputs.total_hours, 1.5));
        let minutes_only = CostInputs::parse("150", "", "45", "PLA", "").expect("parse");
        assert!(close(minutes_only.total_hours, 0.75));
        assert_eq!(minutes_only.profit_margin_percent, 0.0);
    }

    #[test]
    fn parse_rejects_text_and_missing_fields() {
        assert!(matches!(
            CostInputs::parse("abc", "1", "0", "PLA", "20"),
            Err(QuoteError::Calculation(_))
        ));
        assert!(matches!(
            CostInputs::parse("", "1", "0", "PLA", "20"),
            Err(QuoteError::IncompleteInput(_))
        ));
        assert!(matches!(
            CostInputs::parse("10", "1", "0", "", "20"),
            Err(QuoteError::IncompleteInput(_))
        ));
    }

    #[test]
    fn decimals_accept_commas_but_not_infinity() {
        assert_eq!(parse_decimal(" 2,5 "), Some(2.5));
        assert_eq!(parse_decimal("10"), Some(10.0));
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("1,2,3"), None);
    }
}
