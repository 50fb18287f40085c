use crate::analytics::UsageEvent;
use crate::cli::core::{CommandError, CommandResult, LastCalculation, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::{
    managers::{QuoteTemplate, TemplateOverrides, TemplateStore},
    validation::DataValidator,
};

use super::{
    calc::print_breakdown, parse_number, subcommand, usage, CommandDefinition, ParsedArgs,
};

const USAGE: &str = "template [list|show <name>|save <name> [piece name]|delete <name>|apply <name> [--name <piece>] [--weight <g>] [--hours <h>] [--filament <type>] [--margin <%>] [--save]|defaults]";

const APPLY_USAGE: &str = "template apply <name> [--name <piece>] [--weight <g>] [--hours <h>] [--filament <type>] [--margin <%>] [--save]";

const ACTIONS: &[&str] = &["list", "show", "save", "delete", "apply", "defaults"];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "template",
        "Keep job presets and price new quotes from them",
        USAGE,
        cmd_template,
    )
    .with_actions(ACTIONS)]
}

fn cmd_template(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    let store = TemplateStore::open(context.storage.base_dir())?;
    match action.as_str() {
        "list" => {
            output_section("Templates");
            let listings = store.list()?;
            io::print_rows(
                listings.iter().map(|listing| match &listing.template {
                    Some(template) => format!(
                        "{:<16} {} ({}g {} over {})",
                        listing.name,
                        template.piece_name,
                        template.weight_g,
                        template.filament_type,
                        DataValidator::format_time(template.total_hours)
                    ),
                    None => format!("{:<16} (unreadable)", listing.name),
                }),
                "No templates yet; `template defaults` adds three presets.",
            );
            Ok(())
        }
        "show" => {
            let [name] = rest else {
                return Err(usage("template show <name>"));
            };
            let template = store.load(name)?;
            output_section(format!("Template: {}", template.name));
            io::print_field("Piece", &template.piece_name);
            io::print_field("Weight", format!("{} g", template.weight_g));
            io::print_field("Print time", DataValidator::format_time(template.total_hours));
            io::print_field("Filament", &template.filament_type);
            io::print_field("Margin", format!("{}%", template.profit_margin_percent));
            io::print_field("Created", template.created_at.format("%Y-%m-%d %H:%M"));
            Ok(())
        }
        "save" => {
            let Some((name, piece)) = rest.split_first() else {
                return Err(usage("template save <name> [piece name]"));
            };
            let Some(last) = context.last_calculation.as_ref() else {
                return Err(CommandError::InvalidArguments(
                    "nothing to save; run `calc` first".into(),
                ));
            };
            let piece = match DataValidator::sanitize_input(&piece.join(" ")) {
                blank if blank.is_empty() => name.to_string(),
                piece => piece,
            };
            let template = QuoteTemplate::new(*name, piece, &last.inputs);
            let path = store.save(&template)?;
            io::print_success(format!("Template `{}` saved to {}.", name, path.display()));
            Ok(())
        }
        "delete" => {
            let [name] = rest else {
                return Err(usage("template delete <name>"));
            };
            if !context.confirm("Delete this template?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            store.delete(name)?;
            io::print_success(format!("Template `{}` deleted.", name));
            Ok(())
        }
        "apply" => {
            let parsed = ParsedArgs::with_switches(rest, &["save"]);
            let [name] = parsed.positional.as_slice() else {
                return Err(usage(APPLY_USAGE));
            };
            let number = |flag: &str| -> Result<Option<f64>, CommandError> {
                parsed.flag(flag).map(|raw| parse_number(raw, flag)).transpose()
            };
            let overrides = TemplateOverrides {
                piece_name: parsed.flag("name").map(DataValidator::sanitize_input),
                weight_g: number("weight")?,
                total_hours: number("hours")?,
                filament_type: parsed.flag("filament").map(str::to_string),
                profit_margin_percent: number("margin")?,
            };
            let applied = store.apply(name, &overrides, context.settings.settings())?;
            context.analytics.track(UsageEvent::Calculation);
            print_breakdown(context, &applied.inputs, &applied.costs);
            context.last_calculation = Some(LastCalculation {
                inputs: applied.inputs,
                breakdown: applied.costs,
            });
            if parsed.has("save") {
                super::quote::save_last(context, &applied.piece_name)?;
            }
            Ok(())
        }
        "defaults" => {
            let created = store.create_defaults()?;
            if created.is_empty() {
                io::print_info("Default templates are already present.");
            } else {
                io::print_success(format!("Added {}.", created.join(", ")));
            }
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown template action `{}`",
            other
        ))),
    }
}
