use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::managers::{QuoteReports, ReportPeriod};
use crate::domain::common::{parse_date, parse_timestamp};

use super::{parse_count, subcommand, usage, CommandDefinition, ParsedArgs};

const USAGE: &str = "report [summary|detailed|materials|profit|trends|clients|kpi] [--from <date>] [--to <date>] [--months <n>] [--json <path>]";

const ACTIONS: &[&str] = &[
    "summary", "detailed", "materials", "profit", "trends", "clients", "kpi",
];

const DEFAULT_TREND_MONTHS: usize = 12;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "report",
        "Summaries, monthly detail, material use, profitability and trends",
        USAGE,
        cmd_report,
    )
    .with_actions(ACTIONS)]
}

fn cmd_report(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "summary");
    let parsed = ParsedArgs::parse(rest);
    if !parsed.positional.is_empty() {
        return Err(usage(USAGE));
    }
    // A bare `--to` date covers that whole day.
    let end = date(&parsed, "to")?.map(|end| match parsed.flag("to").and_then(parse_date) {
        Some(_) => end + Duration::days(1) - Duration::seconds(1),
        None => end,
    });
    let period = ReportPeriod::new(date(&parsed, "from")?, end);
    let json = parsed.flag("json").filter(|path| !path.is_empty());
    let quotes = context.managers.quotes.all();
    let now = Utc::now();
    let money = |value: f64| context.money(value);

    match action.as_str() {
        "summary" => {
            let Some(report) = QuoteReports::summary(quotes, period, now) else {
                return no_data();
            };
            output_section("Quote summary");
            io::print_field("Quotes", report.total_quotes);
            io::print_field("Revenue", money(report.total_revenue));
            io::print_field("Average", money(report.average_quote_value));
            io::print_field("Material", money(report.total_material_cost));
            io::print_field("Machine time", money(report.total_machine_cost));
            io::print_field("Electricity", money(report.total_electricity_cost));
            io::print_field(
                "Most expensive",
                format!(
                    "{} ({})",
                    report.most_expensive.piece_name,
                    money(report.most_expensive.final_price)
                ),
            );
            io::print_field(
                "Cheapest",
                format!(
                    "{} ({})",
                    report.least_expensive.piece_name,
                    money(report.least_expensive.final_price)
                ),
            );
            write_json(json, &report)
        }
        "detailed" => {
            let Some(report) = QuoteReports::detailed(quotes, period, now) else {
                return no_data();
            };
            for (month, detail) in &report.months {
                output_section(month);
                io::print_field(
                    "Totals",
                    format!(
                        "{} quote(s), {} revenue, {} profit",
                        detail.totals.quotes,
                        money(detail.totals.revenue),
                        money(detail.totals.profit)
                    ),
                );
                io::print_rows(
                    detail.quotes.iter().map(|line| {
                        format!(
                            "{}  {:<24} {}",
                            line.created_at.format("%Y-%m-%d"),
                            line.piece_name,
                            money(line.final_price)
                        )
                    }),
                    "No quotes.",
                );
            }
            write_json(json, &report)
        }
        "materials" => {
            let Some(report) = QuoteReports::material_usage(quotes, now) else {
                return no_data();
            };
            output_section("Material usage");
            io::print_field("Filament", format!("{:.1} g", report.total_filament_g));
            io::print_field("Per quote", format!("{:.1} g", report.average_filament_g));
            io::print_rows(
                report.by_filament.iter().map(|(name, usage)| {
                    format!(
                        "{:<14} {:>4} quote(s) {:>9.1} g  {}",
                        name,
                        usage.quotes,
                        usage.grams,
                        money(usage.material_cost)
                    )
                }),
                "No filament used.",
            );
            write_json(json, &report)
        }
        "profit" => {
            let Some(report) = QuoteReports::profitability(quotes, period, now) else {
                return no_data();
            };
            output_section("Profitability");
            io::print_field("Revenue", money(report.totals.revenue));
            io::print_field("Cost", money(report.totals.cost));
            io::print_field("Profit", money(report.totals.profit));
            io::print_field("Margin", format!("{:.1}%", report.profit_margin_percent));
            io::print_field("Avg profit", money(report.average_profit));
            io::print_field("Avg hours", format!("{:.2}", report.average_print_hours));
            io::print_rows(
                report.by_filament.iter().map(|(name, totals)| {
                    format!(
                        "{:<14} {} profit on {} ({:.1}%)",
                        name,
                        money(totals.profit),
                        money(totals.revenue),
                        totals.margin_percent()
                    )
                }),
                "No quotes.",
            );
            write_json(json, &report)
        }
        "trends" => {
            let months = match parsed.flag("months") {
                Some(raw) => parse_count(raw, "months")?,
                None => DEFAULT_TREND_MONTHS,
            };
            let trends = QuoteReports::monthly_trends(quotes, months);
            output_section("Monthly trends");
            io::print_rows(
                trends.iter().map(|trend| {
                    format!(
                        "{}  {:>4} quote(s)  {:>12}  {:.1}% margin",
                        trend.month,
                        trend.totals.quotes,
                        money(trend.totals.revenue),
                        trend.totals.margin_percent()
                    )
                }),
                "No quotes yet.",
            );
            write_json(json, &trends)
        }
        "clients" => {
            let projects = context.managers.projects.list(None);
            let analysis = QuoteReports::client_analysis(quotes, &projects, now);
            output_section("Client analysis");
            io::print_field("Clients", analysis.total_clients);
            io::print_field("Revenue", money(analysis.total_revenue));
            io::print_rows(
                analysis.clients.iter().map(|client| {
                    format!(
                        "{:<24} {:>4} quote(s)  {}  avg {}",
                        client.client,
                        client.quotes,
                        money(client.total_spent),
                        money(client.average_order_value)
                    )
                }),
                "No quotes yet.",
            );
            write_json(json, &analysis)
        }
        "kpi" => {
            let Some(kpi) = QuoteReports::performance_indicators(quotes, now) else {
                return no_data();
            };
            output_section("Performance");
            io::print_field("Quotes", kpi.total_quotes);
            io::print_field("Revenue", money(kpi.total_revenue));
            io::print_field("Profit", money(kpi.total_profit));
            io::print_field("Avg margin", format!("{:.1}%", kpi.average_margin_percent));
            io::print_field("Last 7 days", kpi.quotes_last_7_days);
            io::print_field("Last 30 days", kpi.quotes_last_30_days);
            io::print_field("Previous 30", kpi.quotes_previous_30_days);
            io::print_field(
                "Growth",
                format!("{:+.1}% ({:?})", kpi.growth_rate_percent, kpi.trend),
            );
            write_json(json, &kpi)
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown report action `{}`",
            other
        ))),
    }
}

fn date(parsed: &ParsedArgs<'_>, flag: &str) -> Result<Option<DateTime<Utc>>, CommandError> {
    parsed
        .flag(flag)
        .map(|raw| {
            parse_timestamp(raw).ok_or_else(|| {
                CommandError::InvalidArguments(format!("{} `{}` is not a date", flag, raw))
            })
        })
        .transpose()
}

fn no_data() -> CommandResult {
    io::print_info("No quotes in that period.");
    Ok(())
}

fn write_json<R: Serialize>(path: Option<&str>, report: &R) -> CommandResult {
    if let Some(path) = path {
        QuoteReports::write_json(report, Path::new(path))?;
        io::print_success(format!("Report written to {}.", path));
    }
    Ok(())
}
