use std::path::Path;

use chrono::{Datelike, Local};
use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::managers::TransactionFilter;
use crate::domain::{
    Budget, BudgetCategory, BudgetPeriod, BudgetStatus, Transaction, TransactionKind,
};

use super::{
    parse_number, print_listing, print_timeline, resolve, short_id, subcommand, usage,
    CommandDefinition, ParsedArgs,
};

const USAGE: &str = "budget [list [--status <s>] [--category <c>]|add <name> <amount> [monthly|quarterly|yearly] [--category <c>] [--alert <pct>]|show <budget>|spend <budget> <amount> [description]|income <amount> [description] [--budget <budget>]|reserve <budget> <amount> <description>|release <budget> <amount>|transactions [budget] [--kind <expense|income>]|month [year] [month]|alerts|period <period>|complete <budget>|timeline <budget>|search <text>|delete <budget>|stats|export <budgets.csv> [transactions.csv]]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "spend", "income", "reserve", "release", "transactions",
    "month", "alerts", "period", "category", "complete", "timeline", "search", "delete", "stats",
    "export",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "budget",
        "Plan spending and record transactions",
        USAGE,
        cmd_budget,
    )
    .with_actions(ACTIONS)]
}

fn cmd_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let parsed = ParsedArgs::parse(rest);
            let status = parsed
                .flag("status")
                .map(str::parse::<BudgetStatus>)
                .transpose()?;
            let category = parsed
                .flag("category")
                .map(str::parse::<BudgetCategory>)
                .transpose()?;
            let budgets = context.managers.budgets.list(status, category);
            print_budgets("Budgets", &budgets);
            Ok(())
        }
        "add" => add_budget(context, rest),
        "show" => {
            let id = find(context, &rest.join(" "))?;
            let utilization = context.managers.budgets.utilization(id)?;
            if let Some(budget) = context.managers.budgets.get(id) {
                output_section(format!("Budget: {}", budget.name));
                io::print_info(format!("  Id           : {}", budget.id));
                io::print_info(format!(
                    "  Period       : {} ({} to {})",
                    budget.period,
                    budget.start_date.format("%Y-%m-%d"),
                    budget.end_date.format("%Y-%m-%d")
                ));
                io::print_info(format!("  Category     : {}", budget.category));
                io::print_info(format!("  Status       : {}", budget.status));
                io::print_info(format!("  Amount       : {}", context.money(budget.amount)));
            }
            io::print_info(format!(
                "  Spent        : {} ({:.1}%)",
                context.money(utilization.spent_amount),
                utilization.utilization_percentage
            ));
            io::print_info(format!(
                "  Reserved     : {}",
                context.money(utilization.reserved_amount)
            ));
            io::print_info(format!(
                "  Remaining    : {}",
                context.money(utilization.remaining_amount)
            ));
            if utilization.is_over_budget {
                io::print_warning("This budget is over its limit.");
            } else if utilization.is_near_limit {
                io::print_warning("This budget is close to its limit.");
            }
            Ok(())
        }
        "spend" => {
            let [reference, amount, description @ ..] = rest else {
                return Err(usage("budget spend <budget> <amount> [description]"));
            };
            let amount = parse_number(amount, "amount")?;
            if amount <= 0.0 {
                return Err(CommandError::InvalidArguments(
                    "spending must be greater than zero".into(),
                ));
            }
            let id = find(context, reference)?;
            let category = context.managers.budgets.get(id).map(|budget| budget.category);
            context.managers.budgets.add_transaction(
                amount,
                &description.join(" "),
                Some(id),
                category,
            )?;
            io::print_success(format!("Recorded {} of spending.", context.money(amount)));
            if context
                .managers
                .budgets
                .get(id)
                .map_or(false, Budget::is_over_budget)
            {
                io::print_warning("This budget is now over its limit.");
            }
            Ok(())
        }
        "income" => {
            let parsed = ParsedArgs::parse(rest);
            let Some((amount, description)) = parsed.positional.split_first() else {
                return Err(usage("budget income <amount> [description] [--budget <budget>]"));
            };
            let amount = parse_number(amount, "amount")?.abs();
            let budget_id = match parsed.flag("budget") {
                Some(reference) => Some(find(context, reference)?),
                None => None,
            };
            context.managers.budgets.add_transaction(
                -amount,
                &description.join(" "),
                budget_id,
                None,
            )?;
            io::print_success(format!("Recorded {} of income.", context.money(amount)));
            Ok(())
        }
        "reserve" => {
            let [reference, amount, description @ ..] = rest else {
                return Err(usage("budget reserve <budget> <amount> <description>"));
            };
            let amount = parse_number(amount, "amount")?;
            let id = find(context, reference)?;
            context
                .managers
                .budgets
                .reserve_amount(id, amount, &description.join(" "))?;
            io::print_success(format!("Reserved {}.", context.money(amount)));
            Ok(())
        }
        "release" => {
            let [reference, amount] = rest else {
                return Err(usage("budget release <budget> <amount>"));
            };
            let amount = parse_number(amount, "amount")?;
            let id = find(context, reference)?;
            context.managers.budgets.release_reserved(id, amount)?;
            io::print_success(format!("Released {}.", context.money(amount)));
            Ok(())
        }
        "transactions" => {
            let parsed = ParsedArgs::parse(rest);
            let budget_id = match parsed.positional.as_slice() {
                [] => None,
                words => Some(find(context, &words.join(" "))?),
            };
            let filter = TransactionFilter {
                budget_id,
                category: None,
                kind: parsed
                    .flag("kind")
                    .map(str::parse::<TransactionKind>)
                    .transpose()?,
            };
            let transactions = context.managers.budgets.transactions(&filter);
            print_transactions("Transactions", &transactions);
            Ok(())
        }
        "month" => {
            let today = Local::now().date_naive();
            let (year, month) = match rest {
                [] => (today.year(), today.month()),
                [year, month] => (
                    year.parse::<i32>()
                        .map_err(|_| usage("budget month [year] [month]"))?,
                    month
                        .parse::<u32>()
                        .ok()
                        .filter(|month| (1..=12).contains(month))
                        .ok_or_else(|| usage("budget month [year] [month]"))?,
                ),
                _ => return Err(usage("budget month [year] [month]")),
            };
            let summary = context.managers.budgets.monthly_summary(year, month);
            output_section(format!("{}-{:02}", summary.year, summary.month));
            io::print_info(format!("  Income       : {}", context.money(summary.total_income)));
            io::print_info(format!(
                "  Expenses     : {}",
                context.money(summary.total_expenses)
            ));
            io::print_info(format!("  Net          : {}", context.money(summary.net_balance)));
            let listed: Vec<&Transaction> = summary.transactions.iter().collect();
            print_transactions("Transactions this month", &listed);
            Ok(())
        }
        "alerts" => {
            let over = context.managers.budgets.over_budget();
            print_budgets("Over budget", &over);
            let near = context.managers.budgets.near_limit();
            print_budgets("Near the limit", &near);
            Ok(())
        }
        "period" => {
            let [period] = rest else {
                return Err(usage("budget period <monthly|quarterly|yearly>"));
            };
            let period: BudgetPeriod = period.parse()?;
            let found = context.managers.budgets.by_period(period);
            print_budgets("Budgets by period", &found);
            Ok(())
        }
        "category" => {
            let [category] = rest else {
                return Err(usage("budget category <category>"));
            };
            let category: BudgetCategory = category.parse()?;
            let found = context.managers.budgets.by_category(category);
            print_budgets("Budgets by category", &found);
            Ok(())
        }
        "complete" => {
            let id = find(context, &rest.join(" "))?;
            let budget = context.managers.budgets.complete(id)?;
            io::print_success(format!("Budget `{}` completed.", budget.name));
            Ok(())
        }
        "timeline" => {
            let id = find(context, &rest.join(" "))?;
            let events = context.managers.budgets.timeline(id)?;
            print_timeline("Budget timeline", &events);
            Ok(())
        }
        "search" => {
            let found = context.managers.budgets.search(&rest.join(" "));
            print_budgets("Matching budgets", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this budget? Its transactions are kept.")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.budgets.delete(id)?;
            io::print_success(format!("Budget `{}` deleted.", removed.name));
            Ok(())
        }
        "stats" => {
            let stats = context.managers.budgets.statistics();
            output_section("Budget statistics");
            io::print_info(format!(
                "  Budgets      : {} ({} active, {} completed)",
                stats.total_budgets, stats.active_budgets, stats.completed_budgets
            ));
            io::print_info(format!(
                "  Spent        : {} of {} ({:.1}%)",
                context.money(stats.total_spent),
                context.money(stats.total_amount),
                stats.utilization_rate
            ));
            io::print_info(format!(
                "  Alerts       : {} over, {} near the limit",
                stats.over_budget_count, stats.near_limit_count
            ));
            for (category, totals) in &stats.categories {
                io::print_info(format!(
                    "  {:<12} : {} budget(s), {} of {}",
                    category.as_str(),
                    totals.count,
                    context.money(totals.total_spent),
                    context.money(totals.total_amount)
                ));
            }
            io::print_info(format!(
                "  Transactions : {}",
                context.managers.budgets.transaction_count()
            ));
            Ok(())
        }
        "export" => {
            let (budgets_path, transactions_path) = match rest {
                [budgets] => (*budgets, None),
                [budgets, transactions] => (*budgets, Some(*transactions)),
                _ => return Err(usage("budget export <budgets.csv> [transactions.csv]")),
            };
            let count = context
                .managers
                .budgets
                .export_budgets_csv(Path::new(budgets_path))?;
            io::print_success(format!("Exported {} budget(s) to {}.", count, budgets_path));
            if let Some(path) = transactions_path {
                let count = context
                    .managers
                    .budgets
                    .export_transactions_csv(Path::new(path))?;
                io::print_success(format!("Exported {} transaction(s) to {}.", count, path));
            }
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown budget action `{}`",
            other
        ))),
    }
}

fn add_budget(context: &mut ShellContext, rest: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(rest);
    let (name, amount, period) = match parsed.positional.as_slice() {
        [name, amount] => (*name, *amount, BudgetPeriod::default()),
        [name, amount, period] => (*name, *amount, period.parse()?),
        _ => return Err(usage("budget add <name> <amount> [period]")),
    };
    let amount = parse_number(amount, "amount")?;
    let mut budget = Budget::new(name.trim(), amount, period);
    if let Some(category) = parsed.flag("category") {
        budget.category = category.parse()?;
    }
    if let Some(alert) = parsed.flag("alert") {
        budget.alert_threshold = parse_number(alert, "alert")? / 100.0;
    }
    let added = context.managers.budgets.create_budget(budget)?;
    io::print_success(format!(
        "Budget `{}` created ({}).",
        added.name,
        short_id(added.id)
    ));
    Ok(())
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.budgets.list(None, None),
        reference,
        |budget: &Budget| budget.name.as_str(),
    )
}

fn print_budgets(title: &str, budgets: &[&Budget]) {
    print_listing(title, budgets, "No budgets found.");
}

fn print_transactions(title: &str, transactions: &[&Transaction]) {
    print_listing(title, transactions, "No transactions found.");
}
