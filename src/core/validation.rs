//! Range checks for form input. Nothing in the storage layer calls these; callers
//! opt in before persisting.

use crate::config::Settings;
use crate::core::errors::{QuoteError, Result};
use crate::domain::Quote;

const MAX_PIECE_NAME_CHARS: usize = 100;
const MAX_PRINT_HOURS: f64 = 1000.0;
const MAX_FILAMENT_GRAMS: f64 = 10_000.0;
const MAX_COST: f64 = 1_000_000.0;
const MAX_MARGIN_PERCENT: f64 = 1000.0;
const MAX_PRINTER_WATTS: f64 = 10_000.0;
const MAX_MONEY_DECIMALS: usize = 8;

pub struct DataValidator;

impl DataValidator {
    pub fn validate_piece_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("piece name is required"));
        }
        if name.chars().count() > MAX_PIECE_NAME_CHARS {
            return Err(invalid("piece name is too long (maximum 100 characters)"));
        }
        Ok(())
    }

    pub fn validate_print_time(hours: f64) -> Result<()> {
        check_number(hours, "print time")?;
        if hours <= 0.0 {
            return Err(invalid("print time must be greater than zero"));
        }
        if hours > MAX_PRINT_HOURS {
            return Err(invalid("print time is too long (maximum 1000 hours)"));
        }
        Ok(())
    }

    pub fn validate_filament_used(grams: f64) -> Result<()> {
        check_number(grams, "filament amount")?;
        if grams <= 0.0 {
            return Err(invalid("filament amount must be greater than zero"));
        }
        if grams > MAX_FILAMENT_GRAMS {
            return Err(invalid("filament amount is too large (maximum 10000g)"));
        }
        Ok(())
    }

    pub fn validate_cost(cost: f64) -> Result<()> {
        check_number(cost, "cost")?;
        if cost < 0.0 {
            return Err(invalid("cost cannot be negative"));
        }
        if cost > MAX_COST {
            return Err(invalid("cost is too high (maximum $1,000,000)"));
        }
        Ok(())
    }

    pub fn validate_profit_margin(margin: f64) -> Result<()> {
        check_number(margin, "profit margin")?;
        if margin < 0.0 {
            return Err(invalid("profit margin cannot be negative"));
        }
        if margin > MAX_MARGIN_PERCENT {
            return Err(invalid("profit margin is too high (maximum 1000%)"));
        }
        Ok(())
    }

    /// Checks every rate and filament price, reporting all problems at once.
    pub fn validate_settings(settings: &Settings) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(err) = Self::validate_cost(settings.machine_cost_per_hour) {
            errors.push(format!("machine cost: {}", reason(&err)));
        }
        if let Err(err) = Self::validate_cost(settings.electricity_kwh_price) {
            errors.push(format!("electricity price: {}", reason(&err)));
        }
        let power = settings.printer_power_watts;
        if !power.is_finite() {
            errors.push("printer power must be a valid number".to_string());
        } else if power <= 0.0 {
            errors.push("printer power must be greater than zero".to_string());
        } else if power > MAX_PRINTER_WATTS {
            errors.push("printer power is too high (maximum 10000W)".to_string());
        }
        for (name, spec) in &settings.filaments {
            if let Err(err) = Self::validate_cost(spec.price_per_kg) {
                errors.push(format!("filament {}: {}", name, reason(&err)));
            }
        }
        join_errors(errors)
    }

    pub fn validate_quote(quote: &Quote) -> Result<()> {
        let mut errors = Vec::new();
        let checks = [
            Self::validate_piece_name(&quote.piece_name),
            Self::validate_print_time(quote.total_hours),
            Self::validate_filament_used(quote.weight_g),
            Self::validate_profit_margin(quote.profit_margin_percent),
        ];
        errors.extend(checks.iter().filter_map(|check| check.as_ref().err().map(reason)));
        for (field, value) in [
            ("material_cost", quote.material_cost),
            ("print_time_cost", quote.print_time_cost),
            ("electricity_cost", quote.electricity_cost),
            ("final_price", quote.final_price),
        ] {
            if let Err(err) = Self::validate_cost(value) {
                errors.push(format!("{}: {}", field, reason(&err)));
            }
        }
        join_errors(errors)
    }

    /// Keeps letters, digits, whitespace, `-`, `.` and `_`, then trims.
    pub fn sanitize_input(text: &str) -> String {
        text.chars()
            .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            .collect::<String>()
            .trim()
            .to_string()
    }

    pub fn format_currency(value: f64) -> String {
        Self::format_currency_with(value, "$")
    }

    pub fn format_currency_with(value: f64, symbol: &str) -> String {
        Self::format_money(value, symbol, 2)
    }

    /// Non-finite values print as zero. Precision is capped at eight places.
    pub fn format_money(value: f64, prefix: &str, decimals: u8) -> String {
        let decimals = usize::from(decimals).min(MAX_MONEY_DECIMALS);
        let value = if value.is_finite() { value } else { 0.0 };
        format!("{}{:.*}", prefix, decimals, value)
    }

    /// `2.5` becomes `2h 30m`; whole hours drop the minutes and sub-hour values drop the hours.
    pub fn format_time(hours: f64) -> String {
        if !hours.is_finite() || hours <= 0.0 {
            return "0m".into();
        }
        let whole = hours.trunc() as u64;
        let minutes = ((hours - hours.trunc()) * 60.0) as u64;
        match (whole, minutes) {
            (0, m) => format!("{}m", m),
            (h, 0) => format!("{}h", h),
            (h, m) => format!("{}h {}m", h, m),
        }
    }
}

fn invalid(message: &str) -> QuoteError {
    QuoteError::Validation(message.to_string())
}

fn reason(err: &QuoteError) -> String {
    match err {
        QuoteError::Validation(message) => message.clone(),
        other => other.to_string(),
    }
}

fn check_number(value: f64, field: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(QuoteError::Validation(format!(
            "{} must be a valid number",
            field
        )))
    }
}

fn join_errors(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(QuoteError::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_name_bounds() {
        assert!(DataValidator::validate_piece_name("Bracket").is_ok());
        assert!(DataValidator::validate_piece_name("   ").is_err());
        assert!(DataValidator::validate_piece_name(&"x".repeat(101)).is_err());
        assert!(DataValidator::validate_piece_name(&"ñ".repeat(100)).is_ok());
    }

    #[test]
    fn numeric_ranges() {
        assert!(DataValidator::validate_print_time(1000.0).is_ok());
        assert!(DataValidator::validate_print_time(1000.5).is_err());
        assert!(DataValidator::validate_filament_used(0.0).is_err());
        assert!(DataValidator::validate_cost(0.0).is_ok());
        assert!(DataValidator::validate_cost(-0.01).is_err());
        assert!(DataValidator::validate_profit_margin(f64::NAN).is_err());
    }

    #[test]
    fn settings_errors_are_joined() {
        let mut settings = Settings::default();
        assert!(DataValidator::validate_settings(&settings).is_ok());
        settings.printer_power_watts = 0.0;
        settings.machine_cost_per_hour = -1.0;
        let err = DataValidator::validate_settings(&settings).expect_err("invalid");
        let message = err.to_string();
        assert!(message.contains("machine cost: cost cannot be negative"));
        assert!(message.contains("; printer power must be greater than zero"));
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(DataValidator::format_currency(4.254), "$4.25");
        assert_eq!(DataValidator::format_currency_with(f64::NAN, "$"), "$0.00");
        assert_eq!(DataValidator::format_money(4.254, "ARS ", 0), "ARS 4");
        assert_eq!(DataValidator::format_money(1.0, "$", 200), "$1.00000000");
        assert_eq!(DataValidator::format_time(2.5), "2h 30m");
        assert_eq!(DataValidator::format_time(3.0), "3h");
        assert_eq!(DataValidator::format_time(0.75), "45m");
        assert_eq!(
            DataValidator::sanitize_input("  Soporte <script>! ñandú "),
            "Soporte script ñandú"
        );
    }
}
