use std::path::Path;

use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::domain::{Printer, PrinterStatus, PrinterTechnology};

use super::{
    parse_count, parse_number, print_listing, resolve, short_id, subcommand, usage,
    CommandDefinition, ParsedArgs,
};

const USAGE: &str = "printer [list [--status <s>] [--tech <t>]|add <name> <model> [manufacturer] [--rate <per_hour>] [--watts <w>] [--tech <FDM|SLA|SLS>] [--maintenance <hours>] [--location <l>]|show <printer>|status <printer> <active|maintenance|retired>|hours <printer> <hours>|maintain <printer> [notes]|due|cost <printer> <hours>|usage <printer> [days]|technologies|search <text>|delete <printer>|stats|export <path>|import <path>]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "status", "hours", "maintain", "due", "cost", "usage",
    "technologies", "search", "delete", "stats", "export", "import",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "printer",
        "Track printers, print hours, and maintenance",
        USAGE,
        cmd_printer,
    )
    .with_actions(ACTIONS)]
}

fn cmd_printer(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let parsed = ParsedArgs::parse(rest);
            let status = parsed
                .flag("status")
                .map(str::parse::<PrinterStatus>)
                .transpose()?;
            let technology = parsed
                .flag("tech")
                .map(|raw| PrinterTechnology::from(raw.to_string()));
            let printers = context.managers.printers.list(status, technology.as_ref());
            print_printers("Printers", &printers);
            Ok(())
        }
        "add" => add_printer(context, rest),
        "show" => {
            let id = find(context, &rest.join(" "))?;
            if let Some(printer) = context.managers.printers.get(id) {
                print_printer(context, printer);
            }
            Ok(())
        }
        "status" => {
            let [reference, status] = rest else {
                return Err(usage("printer status <printer> <active|maintenance|retired>"));
            };
            let status: PrinterStatus = status.parse()?;
            let id = find(context, reference)?;
            let printer = context.managers.printers.set_status(id, status)?;
            io::print_success(format!("{} is now {}.", printer.name, printer.status));
            Ok(())
        }
        "hours" => {
            let [reference, hours] = rest else {
                return Err(usage("printer hours <printer> <hours>"));
            };
            let hours = parse_number(hours, "hours")?;
            let id = find(context, reference)?;
            let due = context.managers.printers.update_print_hours(id, hours)?;
            io::print_success(format!("Logged {} print hour(s).", hours));
            if due {
                io::print_warning("Maintenance is due for this printer.");
            }
            Ok(())
        }
        "maintain" => {
            let Some((reference, notes)) = rest.split_first() else {
                return Err(usage("printer maintain <printer> [notes]"));
            };
            let id = find(context, reference)?;
            let notes = notes.join(" ");
            let printer = context
                .managers
                .printers
                .record_maintenance(id, Some(notes.as_str()))?;
            io::print_success(format!("Maintenance recorded for {}.", printer.name));
            Ok(())
        }
        "due" => {
            let due = context.managers.printers.maintenance_due();
            print_printers("Maintenance due", &due);
            Ok(())
        }
        "cost" => {
            let [reference, hours] = rest else {
                return Err(usage("printer cost <printer> <hours>"));
            };
            let hours = parse_number(hours, "hours")?;
            let id = find(context, reference)?;
            let kwh_price = context.settings.settings().electricity_kwh_price;
            let cost = context
                .managers
                .printers
                .calculate_printer_cost(id, hours, kwh_price)?;
            io::print_info(format!(
                "Labor {} + electricity {} = {}",
                context.money(cost.labor_cost),
                context.money(cost.electricity_cost),
                context.money(cost.total_cost)
            ));
            Ok(())
        }
        "usage" => {
            let Some((reference, days)) = rest.split_first() else {
                return Err(usage("printer usage <printer> [days]"));
            };
            let days = match days.first() {
                Some(raw) => parse_count(raw, "days")?,
                None => 30,
            };
            let id = find(context, reference)?;
            let days = u32::try_from(days).unwrap_or(u32::MAX);
            let rate = context.managers.printers.utilization_rate(id, days)?;
            io::print_info(format!("Utilization over {} day(s): {:.1}%", days, rate));
            Ok(())
        }
        "technologies" => {
            output_section("Printers by technology");
            for (technology, printers) in context.managers.printers.by_technology() {
                let names: Vec<&str> = printers.iter().map(|p| p.name.as_str()).collect();
                io::print_info(format!("  {:<6} {}", technology, names.join(", ")));
            }
            Ok(())
        }
        "search" => {
            let found = context.managers.printers.search(&rest.join(" "));
            print_printers("Matching printers", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this printer?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.printers.delete(id)?;
            io::print_success(format!("Printer `{}` deleted.", removed.name));
            Ok(())
        }
        "stats" => {
            let stats = context.managers.printers.statistics();
            output_section("Printer statistics");
            io::print_info(format!(
                "  Printers     : {} ({} active, {} in maintenance, {} retired)",
                stats.total_printers,
                stats.active_printers,
                stats.in_maintenance,
                stats.retired_printers
            ));
            io::print_info(format!("  Print hours  : {:.1}", stats.total_print_hours));
            io::print_info(format!(
                "  Investment   : {}",
                context.money(stats.total_investment)
            ));
            if !stats.maintenance_due.is_empty() {
                io::print_warning(format!(
                    "Maintenance due: {}",
                    stats.maintenance_due.join(", ")
                ));
            }
            Ok(())
        }
        "export" => {
            let [path] = rest else {
                return Err(usage("printer export <path>"));
            };
            let count = context.managers.printers.export_csv(Path::new(path))?;
            io::print_success(format!("Exported {} printer(s) to {}.", count, path));
            Ok(())
        }
        "import" => {
            let [path] = rest else {
                return Err(usage("printer import <path>"));
            };
            let count = context.managers.printers.import_csv(Path::new(path))?;
            io::print_success(format!("Imported {} new printer(s).", count));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown printer action `{}`",
            other
        ))),
    }
}

fn add_printer(context: &mut ShellContext, rest: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(rest);
    let (name, model, manufacturer) = match parsed.positional.as_slice() {
        [name, model] => (*name, *model, ""),
        [name, model, manufacturer] => (*name, *model, *manufacturer),
        _ => return Err(usage("printer add <name> <model> [manufacturer] [--rate <per_hour>] [--watts <w>]")),
    };
    let mut printer = Printer::new(name.trim(), model.trim(), manufacturer.trim());
    if let Some(rate) = parsed.flag("rate") {
        printer.hourly_rate = parse_number(rate, "rate")?;
    }
    if let Some(watts) = parsed.flag("watts") {
        printer.power_consumption = parse_number(watts, "watts")?;
    }
    if let Some(hours) = parsed.flag("maintenance") {
        printer.maintenance_schedule = parse_number(hours, "maintenance")?;
    }
    if let Some(technology) = parsed.flag("tech") {
        printer.technology = PrinterTechnology::from(technology.to_string());
    }
    printer.location = parsed.flag("location").unwrap_or_default().to_string();

    let added = context.managers.printers.add_printer(printer)?;
    io::print_success(format!(
        "Printer `{}` added ({}).",
        added.name,
        short_id(added.id)
    ));
    Ok(())
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.printers.all(),
        reference,
        |printer: &Printer| printer.name.as_str(),
    )
}

fn print_printers(title: &str, printers: &[&Printer]) {
    print_listing(title, printers, "No printers found.");
}

fn print_printer(context: &ShellContext, printer: &Printer) {
    output_section(format!("Printer: {}", printer.name));
    io::print_info(format!("  Id           : {}", printer.id));
    io::print_info(format!(
        "  Model        : {} {}",
        printer.manufacturer, printer.model
    ));
    io::print_info(format!("  Technology   : {}", printer.technology));
    io::print_info(format!("  Status       : {}", printer.status));
    io::print_info(format!(
        "  Hourly rate  : {}",
        context.money(printer.hourly_rate)
    ));
    io::print_info(format!("  Power        : {} W", printer.power_consumption));
    io::print_info(format!(
        "  Print hours  : {:.1} (service every {})",
        printer.total_print_hours, printer.maintenance_schedule
    ));
    if let Some(last) = printer.last_maintenance {
        io::print_info(format!("  Serviced     : {}", last.format("%Y-%m-%d")));
    }
}
