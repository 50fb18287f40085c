use crate::analytics::UsageEvent;
use crate::cli::core::{CommandResult, LastCalculation, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::{
    calculator::{calculate, parse_decimal, CostBreakdown, CostInputs},
    validation::DataValidator,
};

use super::{usage, CommandDefinition, ParsedArgs};

const USAGE: &str =
    "calc <weight_g> <hours> [minutes] <filament> [margin_%] [--save [piece name]|--save=<piece name>]";

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "calc",
        "Price a print job from weight, time, filament, and margin",
        USAGE,
        cmd_calc,
    )]
}

fn cmd_calc(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::with_switches(args, &["save"]);
    let fields = CalcFields::split(&parsed.positional).ok_or_else(|| usage(USAGE))?;
    let piece_name = match parsed.flag("save") {
        Some("") => Some(fields.extra.join(" ")),
        Some(name) if fields.extra.is_empty() => Some(name.to_string()),
        None if fields.extra.is_empty() => None,
        _ => return Err(usage(USAGE)),
    };
    let CalcFields {
        weight,
        hours,
        minutes,
        filament,
        margin,
        ..
    } = fields;

    let inputs = CostInputs::parse(weight, hours, minutes, filament, margin)?;
    let prices = context.settings.filament_prices();
    let breakdown = calculate(&inputs, &context.settings.rates(), &prices)?;
    context.analytics.track(UsageEvent::Calculation);
    if let Err(err) = context.preferences.record_recent_filament(&inputs.filament_type) {
        tracing::warn!(error = %err, "could not record recent filament");
    }

    print_breakdown(context, &inputs, &breakdown);
    if let Err(err) = DataValidator::validate_profit_margin(inputs.profit_margin_percent) {
        io::print_warning(err);
    }

    context.last_calculation = Some(LastCalculation {
        inputs,
        breakdown,
    });

    if let Some(name) = piece_name {
        super::quote::save_last(context, &name)?;
    }
    Ok(())
}

/// Positional `calc` fields. Minutes are optional, so a numeric third value is
/// read as minutes and anything else as the filament. The margin slot only takes
/// a number; words after the cost fields are left in `extra` for the piece name.
#[derive(Debug, PartialEq)]
struct CalcFields<'a> {
    weight: &'a str,
    hours: &'a str,
    minutes: &'a str,
    filament: &'a str,
    margin: &'a str,
    extra: Vec<&'a str>,
}

impl<'a> CalcFields<'a> {
    fn split(positional: &[&'a str]) -> Option<Self> {
        let is_number = |raw: &str| parse_decimal(raw).is_some();
        let (weight, hours, minutes, rest) = match positional {
            [weight, hours, third, rest @ ..] if is_number(*third) => (*weight, *hours, *third, rest),
            [weight, hours, rest @ ..] => (*weight, *hours, "", rest),
            _ => return None,
        };
        let (filament, rest) = rest.split_first()?;
        let (margin, extra) = match rest.split_first() {
            Some((margin, extra)) if is_number(*margin) => (*margin, extra),
            _ => ("", rest),
        };
        Some(Self {
            weight,
            hours,
            minutes,
            filament: *filament,
            margin,
            extra: extra.to_vec(),
        })
    }
}

pub(crate) fn print_breakdown(context: &ShellContext, inputs: &CostInputs, cost: &CostBreakdown) {
    let money = |value: f64| context.money(value);
    output_section(format!(
        "{}g of {} over {}",
        inputs.weight_g,
        inputs.filament_type,
        DataValidator::format_time(inputs.total_hours)
    ));
    io::print_info(format!("  Material     : {}", money(cost.material_cost)));
    io::print_info(format!("  Print time   : {}", money(cost.print_time_cost)));
    io::print_info(format!("  Electricity  : {}", money(cost.electricity_cost)));
    io::print_info(format!("  Subtotal     : {}", money(cost.subtotal)));
    io::print_info(format!(
        "  Margin ({}%) : {}",
        inputs.profit_margin_percent,
        money(cost.margin_amount)
    ));
    io::print_success(format!("Final price: {}", money(cost.final_price)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_and_margin_are_optional() {
        let full = CalcFields::split(&["100", "2", "30", "PLA", "20"]).expect("fields");
        assert_eq!((full.minutes, full.filament, full.margin), ("30", "PLA", "20"));
        assert!(full.extra.is_empty());

        let short = CalcFields::split(&["100", "2", "PLA"]).expect("fields");
        assert_eq!((short.minutes, short.filament, short.margin), ("", "PLA", ""));
        assert!(CalcFields::split(&["100", "2"]).is_none());
    }

    #[test]
    fn trailing_words_are_kept_for_the_piece_name() {
        let fields = CalcFields::split(&["100", "2", "PLA", "Phone", "stand"]).expect("fields");
        assert_eq!(fields.margin, "");
        assert_eq!(fields.extra, vec!["Phone", "stand"]);
    }
}
