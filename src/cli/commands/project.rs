use chrono::Local;
use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::validation::DataValidator;
use crate::domain::{
    common::{parse_date, Displayable},
    Project, ProjectPatch, ProjectStatus, Quote,
};

use super::{
    parse_number, print_listing, print_timeline, resolve, short_id, subcommand, usage,
    CommandDefinition, ParsedArgs,
};

const USAGE: &str = "project [list [active|completed|archived]|add <name> [description] [--budget <n>] [--deadline <YYYY-MM-DD>] [--client <name>]|show <project>|add-quote <project> <quote>|remove-quote <project> <quote>|cost <project> <amount>|complete <project>|archive <project>|overdue|client <name>|timeline <project>|search <text>|delete <project>]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "add-quote", "remove-quote", "cost", "complete", "archive",
    "overdue", "client", "timeline", "search", "delete",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "project",
        "Group quotes into projects with budgets and deadlines",
        USAGE,
        cmd_project,
    )
    .with_actions(ACTIONS)]
}

fn cmd_project(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let status = rest
                .first()
                .map(|raw| raw.parse::<ProjectStatus>())
                .transpose()?;
            let projects = context.managers.projects.list(status);
            print_projects("Projects", &projects);
            io::print_info(format!(
                "{} active project(s)",
                context.managers.projects.active_count()
            ));
            Ok(())
        }
        "add" => add_project(context, rest),
        "show" => {
            let id = find(context, &rest.join(" "))?;
            show_project(context, id)
        }
        "add-quote" | "remove-quote" => {
            let [project, quote] = rest else {
                return Err(usage("project <add-quote|remove-quote> <project> <quote>"));
            };
            let project_id = find(context, project)?;
            let quote_id = resolve(context.managers.quotes.all(), quote, |quote: &Quote| {
                quote.piece_name.as_str()
            })?;
            if action == "add-quote" {
                context.managers.projects.add_quote(project_id, quote_id)?;
                io::print_success("Quote linked to project.");
            } else {
                context.managers.projects.remove_quote(project_id, quote_id)?;
                io::print_success("Quote removed from project.");
            }
            Ok(())
        }
        "cost" => {
            let [project, amount] = rest else {
                return Err(usage("project cost <project> <amount>"));
            };
            let amount = parse_number(amount, "amount")?;
            DataValidator::validate_cost(amount)?;
            let id = find(context, project)?;
            let patch = ProjectPatch {
                actual_cost: Some(amount),
                ..ProjectPatch::default()
            };
            let project = context.managers.projects.update(id, patch)?;
            io::print_success(format!(
                "{} has used {:.1}% of its budget.",
                project.name,
                project.budget_utilization()
            ));
            Ok(())
        }
        "complete" => {
            let id = find(context, &rest.join(" "))?;
            let project = context.managers.projects.complete(id)?;
            io::print_success(format!("Project `{}` completed.", project.name));
            Ok(())
        }
        "archive" => {
            let id = find(context, &rest.join(" "))?;
            let project = context.managers.projects.archive(id)?;
            io::print_success(format!("Project `{}` archived.", project.name));
            Ok(())
        }
        "overdue" => {
            let today = Local::now().date_naive();
            let overdue = context.managers.projects.overdue_projects(today);
            print_projects("Overdue projects", &overdue);
            Ok(())
        }
        "client" => {
            let found = context.managers.projects.by_client(&rest.join(" "));
            print_projects("Projects for client", &found);
            Ok(())
        }
        "timeline" => {
            let id = find(context, &rest.join(" "))?;
            let events = context.managers.projects.timeline(id)?;
            print_timeline("Project timeline", &events);
            Ok(())
        }
        "search" => {
            let found = context.managers.projects.search(&rest.join(" "));
            print_projects("Matching projects", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this project? Its quotes are kept.")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.projects.delete(id)?;
            io::print_success(format!("Project `{}` deleted.", removed.name));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown project action `{}`",
            other
        ))),
    }
}

fn add_project(context: &mut ShellContext, rest: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(rest);
    let Some((name, description)) = parsed.positional.split_first() else {
        return Err(usage("project add <name> [description]"));
    };
    let mut project = Project::new(name.trim(), description.join(" "));
    if let Some(budget) = parsed.flag("budget") {
        project.budget = parse_number(budget, "budget")?;
    }
    if let Some(raw) = parsed.flag("deadline") {
        project.deadline = Some(parse_date(raw).ok_or_else(|| {
            CommandError::InvalidArguments(format!("deadline `{}` is not YYYY-MM-DD", raw))
        })?);
    }
    project.client = parsed.flag("client").unwrap_or_default().to_string();
    let added = context.managers.projects.create_project(project)?;
    io::print_success(format!(
        "Project `{}` created ({}).",
        added.name,
        short_id(added.id)
    ));
    Ok(())
}

fn show_project(context: &ShellContext, id: Uuid) -> CommandResult {
    let today = Local::now().date_naive();
    let quotes = context.managers.quotes.all();
    let stats = context
        .managers
        .projects
        .project_statistics(id, quotes, today)?;
    let linked = context.managers.projects.project_quotes(id, quotes)?;
    if let Some(project) = context.managers.projects.get(id) {
        output_section(format!("Project: {}", project.name));
        io::print_info(format!("  Id           : {}", project.id));
        io::print_info(format!("  Status       : {}", project.status));
        if !project.client.is_empty() {
            io::print_info(format!("  Client       : {}", project.client));
        }
        if !project.description.is_empty() {
            io::print_info(format!("  Description  : {}", project.description));
        }
    }
    io::print_info(format!(
        "  Quotes       : {} worth {}",
        stats.quote_count,
        context.money(stats.quoted_value)
    ));
    io::print_info(format!(
        "  Budget       : {} spent of {} ({:.1}%), {} left",
        context.money(stats.actual_cost),
        context.money(stats.budget),
        stats.budget_utilization,
        context.money(stats.remaining_budget)
    ));
    if let Some(days) = stats.days_until_deadline {
        if stats.is_overdue {
            io::print_warning(format!("Deadline passed {} day(s) ago.", -days));
        } else {
            io::print_info(format!("  Deadline     : in {} day(s)", days));
        }
    }
    for quote in linked {
        io::print_info(format!("    {}  {}", short_id(quote.id), quote.display_label()));
    }
    Ok(())
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.projects.list(None),
        reference,
        |project: &Project| project.name.as_str(),
    )
}

fn print_projects(title: &str, projects: &[&Project]) {
    print_listing(title, projects, "No projects found.");
}
