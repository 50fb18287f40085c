use crate::analytics::UsageEvent;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::validation::DataValidator;

use super::{parse_number, subcommand, usage, CommandDefinition};

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "settings",
            "View and change cost rates, currency, and filament prices",
            "settings [show|get <key>|set <key> <value>|currency <USD|ARS>|filament <name> <price_per_kg>|remove-filament <name>|reset]",
            cmd_settings,
        )
        .with_actions(&["show", "get", "set", "currency", "filament", "remove-filament", "reset"]),
        CommandDefinition::new(
            "prefs",
            "View and change display preferences",
            "prefs [show|set <key> <value>|reset]",
            cmd_prefs,
        )
        .with_actions(&["show", "set", "reset"]),
    ]
}

fn cmd_settings(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "show");
    match action.as_str() {
        "show" => {
            show_settings(context);
            Ok(())
        }
        "get" => {
            let [key] = rest else {
                return Err(usage("settings get <key>"));
            };
            match context.settings.get(key) {
                Some(value) => io::print_info(format!("{} = {}", key, value)),
                None => io::print_warning(format!(
                    "Unknown setting `{}`. Known keys: {}",
                    key,
                    context.settings.settings().keys().join(", ")
                )),
            }
            Ok(())
        }
        "set" => {
            let [key, value @ ..] = rest else {
                return Err(usage("settings set <key> <value>"));
            };
            if value.is_empty() {
                return Err(usage("settings set <key> <value>"));
            }
            context.settings.set(key, &value.join(" "))?;
            changed(context, &format!("{} updated.", key));
            Ok(())
        }
        "currency" => {
            let [code] = rest else {
                return Err(usage("settings currency <USD|ARS>"));
            };
            context.settings.update_currency(code)?;
            let current = context.settings.settings();
            let message = format!(
                "Currency set to {} ({}).",
                current.currency_name, current.currency_symbol
            );
            changed(context, &message);
            Ok(())
        }
        "filament" => {
            let [name @ .., price] = rest else {
                return Err(usage("settings filament <name> <price_per_kg>"));
            };
            if name.is_empty() {
                return Err(usage("settings filament <name> <price_per_kg>"));
            }
            let name = name.join(" ");
            let price = parse_number(price, "price per kg")?;
            DataValidator::validate_cost(price)?;
            context.settings.set_filament_price(&name, price)?;
            changed(context, &format!("{} now costs {:.2} per kg.", name, price));
            Ok(())
        }
        "remove-filament" => {
            let name = rest.join(" ");
            if name.trim().is_empty() {
                return Err(usage("settings remove-filament <name>"));
            }
            context.settings.remove_filament(&name)?;
            changed(context, &format!("{} removed.", name.trim()));
            Ok(())
        }
        "reset" => {
            if !context.confirm("Restore default settings?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            context.settings.reset_to_defaults()?;
            changed(context, "Settings restored to defaults.");
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown settings action `{}`",
            other
        ))),
    }
}

fn changed(context: &mut ShellContext, message: &str) {
    context.analytics.track(UsageEvent::SettingsChange);
    io::print_success(message);
    if let Err(err) = DataValidator::validate_settings(context.settings.settings()) {
        io::print_warning(err);
    }
}

fn show_settings(context: &ShellContext) {
    let settings = context.settings.settings();
    let symbol = settings.currency_symbol.as_str();
    output_section("Settings");
    io::print_info(format!(
        "  Currency     : {} ({})",
        settings.currency_name, symbol
    ));
    io::print_info(format!(
        "  Machine cost : {} / hour",
        context.money(settings.machine_cost_per_hour)
    ));
    io::print_info(format!(
        "  Electricity  : {} / kWh",
        context.money(settings.electricity_kwh_price)
    ));
    io::print_info(format!("  Printer power: {} W", settings.printer_power_watts));
    io::print_info(format!("  Theme        : {}", settings.theme_mode));
    output_section("Filaments");
    for (name, spec) in &settings.filaments {
        io::print_info(format!(
            "  {:<16} {} / kg",
            name,
            context.money(spec.price_per_kg)
        ));
    }
    io::print_info(format!("Stored in {}", context.settings.path().display()));
}

fn cmd_prefs(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "show");
    match action.as_str() {
        "show" => {
            let prefs = context.preferences.preferences();
            output_section("Preferences");
            io::print_info(format!("  animations_enabled : {}", prefs.animations_enabled));
            io::print_info(format!("  transition_speed   : {}", prefs.transition_speed));
            io::print_info(format!("  startup_view       : {}", prefs.startup_view));
            io::print_info(format!("  auto_save_quotes   : {}", prefs.auto_save_quotes));
            io::print_info(format!("  currency_display   : {}", prefs.currency_display));
            io::print_info(format!("  decimal_places     : {}", prefs.decimal_places));
            io::print_info(format!(
                "  recent_filaments   : {}",
                prefs.recent_filaments.join(", ")
            ));
            Ok(())
        }
        "set" => {
            let [key, value @ ..] = rest else {
                return Err(usage("prefs set <key> <value>"));
            };
            context.preferences.set(key, &value.join(" "))?;
            io::print_success(format!("{} updated.", key));
            Ok(())
        }
        "reset" => {
            context.preferences.reset_to_default()?;
            io::print_success("Preferences restored to defaults.");
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown prefs action `{}`",
            other
        ))),
    }
}
