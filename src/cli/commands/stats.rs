use chrono::Utc;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;

use super::{subcommand, CommandDefinition};

const ACTIONS: &[&str] = &["overview", "usage", "reset"];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "stats",
        "Show usage counters and a business overview",
        "stats [overview|usage|reset]",
        cmd_stats,
    )
    .with_actions(ACTIONS)]
}

fn cmd_stats(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, _) = subcommand(args, "overview");
    match action.as_str() {
        "overview" => {
            overview(context);
            Ok(())
        }
        "usage" => {
            let summary = context.analytics.summary();
            output_section("Usage");
            io::print_info(format!("  App starts   : {}", summary.app_starts));
            io::print_info(format!("  Calculations : {}", summary.calculations_made));
            io::print_info(format!("  Quotes saved : {}", summary.quotes_saved));
            io::print_info(format!("  Exports      : {}", summary.exports));
            io::print_info(format!("  Settings     : {}", summary.settings_changes));
            io::print_info(format!("  Minutes used : {}", summary.minutes_used));
            if let Some(last) = summary.last_used {
                io::print_info(format!("  Last used    : {}", last.format("%Y-%m-%d %H:%M")));
            }
            for (feature, count) in summary.top_features.iter().take(5) {
                io::print_info(format!("  {:<12} : {}", feature, count));
            }
            Ok(())
        }
        "reset" => {
            if !context.confirm("Clear all usage counters?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            context.analytics.reset()?;
            io::print_success("Usage counters cleared.");
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown stats action `{}`",
            other
        ))),
    }
}

fn overview(context: &ShellContext) {
    let managers = &context.managers;
    let quotes = managers.quotes.statistics();
    output_section("Overview");
    io::print_info(format!(
        "  Quotes       : {} totalling {}",
        quotes.total_quotes,
        context.money(quotes.total_revenue)
    ));
    io::print_info(format!(
        "  Clients      : {} ({} active)",
        managers.clients.count(),
        managers.clients.active_count()
    ));
    io::print_info(format!(
        "  Projects     : {} active",
        managers.projects.active_count()
    ));
    io::print_info(format!(
        "  Printers     : {} active, {} due for maintenance",
        managers.printers.active_count(),
        managers.printers.maintenance_due().len()
    ));
    io::print_info(format!(
        "  Materials    : {} low on stock",
        managers.materials.low_stock_materials().len()
    ));
    let tasks = managers.tasks.statistics(Utc::now());
    io::print_info(format!(
        "  Tasks        : {} open, {} overdue",
        tasks.pending + tasks.in_progress,
        tasks.overdue
    ));
    let month_start = Utc::now() - chrono::Duration::days(30);
    io::print_info(format!(
        "  Spent (30d)  : {}",
        context.money(managers.budgets.spending_since(month_start))
    ));
}
