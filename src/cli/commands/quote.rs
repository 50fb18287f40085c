use std::path::Path;

use crate::analytics::UsageEvent;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::{
    managers::{QuoteFilter, QuoteSortKey},
    optimizer::{CostOptimizer, OptimizationLevel},
    validation::DataValidator,
};
use crate::domain::{common::parse_timestamp, Quote, QuoteStatus};
use crate::export::{self, ExportFormat};

use super::{
    parse_count, parse_number, print_listing, resolve, short_id, subcommand, usage,
    CommandDefinition, ParsedArgs,
};

const USAGE: &str = "quote [list [limit]|show <quote>|save [name]|search <text>|filter [--name <text>] [--from <date>] [--to <date>] [--min-price <n>] [--max-price <n>] [--min-hours <n>] [--max-hours <n>]|sort [name|time|filament|price|date] [--desc]|ranges|status <quote> <pending|accepted|rejected>|delete <quote>|stats|compare <quote> <quote>|suggest <quote>|optimize <quote> [conservative|moderate|aggressive]|export <path> [format]|import <path> [format]]";

const DEFAULT_LIST_LIMIT: usize = 20;

const ACTIONS: &[&str] = &[
    "list", "show", "save", "search", "filter", "sort", "ranges", "status", "delete", "stats",
    "compare", "suggest", "optimize", "export", "import",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "quote",
        "Browse, save, and export quotes",
        USAGE,
        cmd_quote,
    )
    .with_actions(ACTIONS)]
}

fn cmd_quote(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let limit = match rest.first() {
                Some(raw) => parse_count(raw, "limit")?,
                None => DEFAULT_LIST_LIMIT,
            };
            let quotes = context.managers.quotes.recent(limit);
            print_quotes("Recent quotes", &quotes);
            Ok(())
        }
        "show" => {
            let id = find(context, rest)?;
            if let Some(quote) = context.managers.quotes.get(id) {
                print_quote(context, quote);
            }
            Ok(())
        }
        "save" => save_last(context, &rest.join(" ")),
        "search" => {
            let found = context.managers.quotes.search(&rest.join(" "));
            print_quotes("Matching quotes", &found);
            Ok(())
        }
        "filter" => {
            let filter = build_filter(&ParsedArgs::parse(rest))?;
            let found = context.managers.quotes.filter(&filter);
            print_quotes("Filtered quotes", &found);
            Ok(())
        }
        "sort" => {
            let parsed = ParsedArgs::with_switches(rest, &["desc"]);
            let key = match parsed.positional.as_slice() {
                [] => QuoteSortKey::CreatedAt,
                [key] => key.parse()?,
                _ => return Err(usage("quote sort [name|time|filament|price|date] [--desc]")),
            };
            let sorted = context.managers.quotes.sorted(key, parsed.has("desc"));
            print_quotes("Sorted quotes", &sorted);
            Ok(())
        }
        "ranges" => {
            output_section("Quote ranges");
            let Some(options) = context.managers.quotes.filter_options() else {
                io::print_info("No quotes yet.");
                return Ok(());
            };
            io::print_field(
                "Dates",
                format!(
                    "{} to {}",
                    options.date_range.min.format("%Y-%m-%d"),
                    options.date_range.max.format("%Y-%m-%d")
                ),
            );
            io::print_field(
                "Prices",
                format!(
                    "{} to {}",
                    context.money(options.price_range.min),
                    context.money(options.price_range.max)
                ),
            );
            io::print_field(
                "Print time",
                format!(
                    "{} to {}",
                    DataValidator::format_time(options.time_range.min),
                    DataValidator::format_time(options.time_range.max)
                ),
            );
            Ok(())
        }
        "compare" => {
            let [first, second] = rest else {
                return Err(usage("quote compare <quote> <quote>"));
            };
            let first = quote_by_ref(context, first)?;
            let second = quote_by_ref(context, second)?;
            output_section(format!("{} vs {}", first.piece_name, second.piece_name));
            let differences = CostOptimizer::compare_quotes(first, second);
            io::print_rows(
                differences.iter().map(|diff| {
                    format!(
                        "{:<17} {:>10.2} -> {:>10.2}  ({:+.2}, {:+.1}%)",
                        diff.field, diff.first, diff.second, diff.difference, diff.percentage_change
                    )
                }),
                "The quotes have the same figures.",
            );
            Ok(())
        }
        "suggest" => {
            let id = find(context, rest)?;
            let Some(quote) = context.managers.quotes.get(id) else {
                return Ok(());
            };
            let suggestions = CostOptimizer::suggest_savings(quote, context.settings.settings());
            output_section(format!("Savings for {}", quote.piece_name));
            io::print_rows(
                suggestions.iter().map(|hint| {
                    if hint.savings > 0.0 {
                        format!(
                            "{}: {} (saves {})",
                            hint.title,
                            hint.description,
                            context.money(hint.savings)
                        )
                    } else {
                        format!("{}: {}", hint.title, hint.description)
                    }
                }),
                "No savings found; the quote already uses the cheapest options.",
            );
            Ok(())
        }
        "optimize" => {
            let (level, reference) = match rest.split_last() {
                Some((last, head)) if !head.is_empty() => match last.parse::<OptimizationLevel>() {
                    Ok(level) => (level, head),
                    Err(_) => (OptimizationLevel::default(), rest),
                },
                _ => (OptimizationLevel::default(), rest),
            };
            let id = find(context, reference)?;
            let Some(quote) = context.managers.quotes.get(id) else {
                return Ok(());
            };
            let optimized = CostOptimizer::optimized_quote(quote, level);
            output_section(format!("Optimized {} ({:?})", quote.piece_name, level));
            io::print_field("Material", context.money(optimized.material_cost));
            io::print_field("Print time", context.money(optimized.print_time_cost));
            io::print_field("Electricity", context.money(optimized.electricity_cost));
            io::print_field(
                "Final price",
                format!(
                    "{} (was {})",
                    context.money(optimized.final_price),
                    context.money(quote.final_price)
                ),
            );
            Ok(())
        }
        "status" => {
            let [reference, status] = rest else {
                return Err(usage("quote status <quote> <status>"));
            };
            let status: QuoteStatus = status.parse()?;
            let id = find(context, &[*reference])?;
            let quote = context.managers.quotes.set_status(id, status)?;
            io::print_success(format!("{} is now {}.", quote.piece_name, quote.status));
            Ok(())
        }
        "delete" => {
            let id = find(context, rest)?;
            if !context.confirm("Delete this quote?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.quotes.delete(id)?;
            io::print_success(format!("Quote `{}` deleted.", removed.piece_name));
            Ok(())
        }
        "stats" => {
            let stats = context.managers.quotes.statistics();
            output_section("Quote statistics");
            io::print_info(format!("  Quotes       : {}", stats.total_quotes));
            io::print_info(format!(
                "  Revenue      : {}",
                context.money(stats.total_revenue)
            ));
            io::print_info(format!(
                "  Average      : {}",
                context.money(stats.average_price)
            ));
            io::print_info(format!(
                "  Top filament : {}",
                stats.most_used_filament.as_deref().unwrap_or("-")
            ));
            Ok(())
        }
        "export" => {
            let (path, format) = file_and_format(rest, "quote export <path> [format]")?;
            let count = export::export_quotes(
                Path::new(path),
                format,
                context.managers.quotes.all(),
                context.currency_symbol(),
            )?;
            context.analytics.track(UsageEvent::Export);
            io::print_success(format!(
                "Exported {} quote(s) as {} to {}.",
                count,
                format.label(),
                path
            ));
            Ok(())
        }
        "import" => {
            let (path, format) = file_and_format(rest, "quote import <path> [format]")?;
            let records = export::import_quotes(Path::new(path), format)?;
            let total = records.len();
            let quotes: Vec<Quote> = records.into_iter().map(|record| record.into_quote()).collect();
            let added = context.managers.quotes.import(quotes)?;
            io::print_success(format!(
                "Imported {} of {} quote(s); existing ids were kept.",
                added, total
            ));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown quote action `{}`",
            other
        ))),
    }
}

/// Saves the last calculation under `name`.
pub(crate) fn save_last(context: &mut ShellContext, name: &str) -> CommandResult {
    let Some(last) = context.last_calculation.clone() else {
        return Err(CommandError::InvalidArguments(
            "nothing to save; run `calc` first".into(),
        ));
    };
    let name = DataValidator::sanitize_input(name);
    let quote = context
        .managers
        .quotes
        .save_quote(&name, &last.inputs, &last.breakdown)?;
    io::print_success(format!(
        "Quote `{}` saved ({}).",
        quote.piece_name,
        short_id(quote.id)
    ));
    context.analytics.track(UsageEvent::QuoteSaved);
    Ok(())
}

fn find(context: &ShellContext, rest: &[&str]) -> Result<uuid::Uuid, CommandError> {
    let reference = rest.join(" ");
    if reference.trim().is_empty() {
        return Err(usage("quote <show|delete> <quote>"));
    }
    resolve(context.managers.quotes.all(), &reference, |quote: &Quote| {
        quote.piece_name.as_str()
    })
}

fn quote_by_ref<'a>(context: &'a ShellContext, reference: &str) -> Result<&'a Quote, CommandError> {
    let id = find(context, &[reference])?;
    context
        .managers
        .quotes
        .get(id)
        .ok_or_else(|| CommandError::InvalidArguments(format!("no quote matches `{}`", reference)))
}

fn file_and_format<'a>(
    rest: &[&'a str],
    text: &str,
) -> Result<(&'a str, ExportFormat), CommandError> {
    match rest {
        [path] => Ok((
            *path,
            ExportFormat::from_path(Path::new(path)).unwrap_or(ExportFormat::Csv),
        )),
        [path, format] => Ok((*path, format.parse()?)),
        _ => Err(usage(text)),
    }
}

fn build_filter(parsed: &ParsedArgs<'_>) -> Result<QuoteFilter, CommandError> {
    let number = |flag: &str| -> Result<Option<f64>, CommandError> {
        parsed.flag(flag).map(|raw| parse_number(raw, flag)).transpose()
    };
    let date = |flag: &str| -> Result<_, CommandError> {
        parsed
            .flag(flag)
            .map(|raw| {
                parse_timestamp(raw).ok_or_else(|| {
                    CommandError::InvalidArguments(format!("{} `{}` is not a date", flag, raw))
                })
            })
            .transpose()
    };
    Ok(QuoteFilter {
        piece_name: parsed.flag("name").map(str::to_string),
        start: date("from")?,
        end: date("to")?,
        min_price: number("min-price")?,
        max_price: number("max-price")?,
        min_hours: number("min-hours")?,
        max_hours: number("max-hours")?,
    })
}

fn print_quotes(title: &str, quotes: &[&Quote]) {
    print_listing(title, quotes, "No quotes found.");
}

fn print_quote(context: &ShellContext, quote: &Quote) {
    let money = |value: f64| context.money(value);
    output_section(format!("Quote: {}", quote.piece_name));
    io::print_info(format!("  Id           : {}", quote.id));
    io::print_info(format!("  Status       : {}", quote.status));
    io::print_info(format!(
        "  Job          : {}g {} over {}",
        quote.weight_g,
        quote.filament_type,
        DataValidator::format_time(quote.total_hours)
    ));
    io::print_info(format!("  Material     : {}", money(quote.material_cost)));
    io::print_info(format!("  Print time   : {}", money(quote.print_time_cost)));
    io::print_info(format!("  Electricity  : {}", money(quote.electricity_cost)));
    io::print_info(format!("  Margin       : {}%", quote.profit_margin_percent));
    io::print_info(format!("  Final price  : {}", money(quote.final_price)));
    io::print_info(format!(
        "  Created      : {}",
        quote.created_at.format("%Y-%m-%d %H:%M")
    ));
}
