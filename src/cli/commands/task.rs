use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::domain::{common::parse_timestamp, Client, Project, Task, TaskPriority, TaskStatus};
use crate::core::managers::TaskFilter;

use super::{
    parse_count, print_listing, resolve, short_id, subcommand, usage, CommandDefinition,
    ParsedArgs,
};

const USAGE: &str = "task [list [--status <s>] [--priority <p>] [--assignee <name>]|add <title> [description] [--due <date>] [--remind <date>] [--priority <low|medium|high|urgent>] [--assign <name>] [--project <project>] [--client <client>]|show <task>|done <task>|cancel <task>|status <task> <pending|in_progress|completed|cancelled>|priority <task> <p>|assign <task> <name>|due <task> <date|\"\">|remind <task> <date|\"\">|tag <task> <tag>|untag <task> <tag>|tagged <tag>|overdue|soon [days]|upcoming [days]|reminders|project <project>|client <client>|search <text>|delete <task>|stats|export <path>|import <path>]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "done", "cancel", "status", "priority", "assign", "due",
    "remind", "tag", "untag", "tagged", "overdue", "soon", "upcoming", "reminders", "project",
    "client", "search", "delete", "stats", "export", "import",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "task",
        "Track work items, due dates, and reminders",
        USAGE,
        cmd_task,
    )
    .with_actions(ACTIONS)]
}

fn cmd_task(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    let now = Utc::now();
    match action.as_str() {
        "list" => {
            let parsed = ParsedArgs::parse(rest);
            let filter = TaskFilter {
                status: parsed
                    .flag("status")
                    .map(str::parse::<TaskStatus>)
                    .transpose()?,
                priority: parsed
                    .flag("priority")
                    .map(str::parse::<TaskPriority>)
                    .transpose()?,
                assigned_to: parsed.flag("assignee").map(str::to_string),
            };
            let tasks = context.managers.tasks.list(&filter);
            print_tasks("Tasks", &tasks);
            Ok(())
        }
        "add" => add_task(context, rest),
        "show" => {
            let id = find(context, &rest.join(" "))?;
            if let Some(task) = context.managers.tasks.get(id) {
                output_section(format!("Task: {}", task.title));
                io::print_info(format!("  Id           : {}", task.id));
                io::print_info(format!("  Status       : {}", task.status));
                io::print_info(format!("  Priority     : {}", task.priority));
                if !task.description.is_empty() {
                    io::print_info(format!("  Description  : {}", task.description));
                }
                if let Some(due) = task.due_date {
                    io::print_info(format!("  Due          : {}", due.format("%Y-%m-%d %H:%M")));
                }
                if let Some(reminder) = task.reminder_date {
                    io::print_info(format!(
                        "  Reminder     : {}",
                        reminder.format("%Y-%m-%d %H:%M")
                    ));
                }
                if !task.assigned_to.is_empty() {
                    io::print_info(format!("  Assigned to  : {}", task.assigned_to));
                }
                if !task.tags.is_empty() {
                    io::print_info(format!("  Tags         : {}", task.tags_joined()));
                }
                if task.is_overdue(now) {
                    io::print_warning("This task is overdue.");
                }
            }
            Ok(())
        }
        "done" => {
            let id = find(context, &rest.join(" "))?;
            let task = context.managers.tasks.complete(id)?;
            io::print_success(format!("Task `{}` completed.", task.title));
            Ok(())
        }
        "cancel" => {
            let id = find(context, &rest.join(" "))?;
            let task = context.managers.tasks.cancel(id)?;
            io::print_success(format!("Task `{}` cancelled.", task.title));
            Ok(())
        }
        "status" => {
            let [reference, status] = rest else {
                return Err(usage("task status <task> <status>"));
            };
            let status: TaskStatus = status.parse()?;
            let id = find(context, reference)?;
            let task = context.managers.tasks.set_status(id, status)?;
            io::print_success(format!("{} is now {}.", task.title, task.status));
            Ok(())
        }
        "priority" => {
            let [reference, priority] = rest else {
                return Err(usage("task priority <task> <low|medium|high|urgent>"));
            };
            let priority: TaskPriority = priority.parse()?;
            let id = find(context, reference)?;
            let task = context.managers.tasks.set_priority(id, priority)?;
            io::print_success(format!("{} is now {} priority.", task.title, task.priority));
            Ok(())
        }
        "assign" => {
            let Some((reference, assignee)) = rest.split_first() else {
                return Err(usage("task assign <task> <name>"));
            };
            let id = find(context, reference)?;
            let task = context.managers.tasks.assign(id, &assignee.join(" "))?;
            io::print_success(format!("{} assigned to {}.", task.title, task.assigned_to));
            Ok(())
        }
        "due" | "remind" => {
            let [reference, raw] = rest else {
                return Err(usage("task <due|remind> <task> <date|\"\">"));
            };
            let id = find(context, reference)?;
            let task = if action == "due" {
                context.managers.tasks.set_due_date(id, raw)?
            } else {
                context.managers.tasks.set_reminder(id, raw)?
            };
            io::print_success(format!("Task `{}` updated.", task.title));
            Ok(())
        }
        "tag" | "untag" => {
            let [reference, tag] = rest else {
                return Err(usage("task <tag|untag> <task> <tag>"));
            };
            let id = find(context, reference)?;
            if action == "tag" {
                context.managers.tasks.add_tag(id, tag)?;
            } else {
                context.managers.tasks.remove_tag(id, tag)?;
            }
            io::print_success("Tags updated.");
            Ok(())
        }
        "tagged" => {
            let found = context.managers.tasks.by_tag(&rest.join(" "));
            print_tasks("Tagged tasks", &found);
            Ok(())
        }
        "overdue" => {
            let found = context.managers.tasks.overdue(now);
            print_tasks("Overdue tasks", &found);
            Ok(())
        }
        "soon" | "upcoming" => {
            let days = match rest.first() {
                Some(raw) => parse_count(raw, "days")?,
                None => 7,
            };
            let days = i64::try_from(days).unwrap_or(i64::MAX);
            let found = if action == "soon" {
                context.managers.tasks.due_soon(now, days)
            } else {
                context.managers.tasks.upcoming(now, days)
            };
            print_tasks("Upcoming tasks", &found);
            Ok(())
        }
        "reminders" => {
            let found = context.managers.tasks.with_reminders(now);
            print_tasks("Reminders due", &found);
            Ok(())
        }
        "project" => {
            let project_id = resolve(
                context.managers.projects.list(None),
                &rest.join(" "),
                |project: &Project| project.name.as_str(),
            )?;
            let found = context.managers.tasks.by_project(project_id);
            print_tasks("Project tasks", &found);
            Ok(())
        }
        "client" => {
            let client_id = resolve(
                context.managers.clients.list(None),
                &rest.join(" "),
                |client: &Client| client.name.as_str(),
            )?;
            let found = context.managers.tasks.by_client(client_id);
            print_tasks("Client tasks", &found);
            Ok(())
        }
        "search" => {
            let found = context.managers.tasks.search(&rest.join(" "));
            print_tasks("Matching tasks", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this task?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.tasks.delete(id)?;
            io::print_success(format!("Task `{}` deleted.", removed.title));
            Ok(())
        }
        "stats" => {
            let stats = context.managers.tasks.statistics(now);
            output_section("Task statistics");
            io::print_info(format!(
                "  Tasks        : {} ({} pending, {} in progress, {} completed, {} cancelled)",
                stats.total, stats.pending, stats.in_progress, stats.completed, stats.cancelled
            ));
            io::print_info(format!("  Overdue      : {}", stats.overdue));
            for (priority, count) in &stats.by_priority {
                io::print_info(format!("  {:<12} : {}", priority, count));
            }
            io::print_info(format!("  Completion   : {:.1}%", stats.completion_rate));
            Ok(())
        }
        "export" => {
            let [path] = rest else {
                return Err(usage("task export <path>"));
            };
            let count = context.managers.tasks.export_csv(Path::new(path))?;
            io::print_success(format!("Exported {} task(s) to {}.", count, path));
            Ok(())
        }
        "import" => {
            let [path] = rest else {
                return Err(usage("task import <path>"));
            };
            let count = context.managers.tasks.import_csv(Path::new(path))?;
            io::print_success(format!("Imported {} task(s).", count));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown task action `{}`",
            other
        ))),
    }
}

fn add_task(context: &mut ShellContext, rest: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(rest);
    let Some((title, description)) = parsed.positional.split_first() else {
        return Err(usage("task add <title> [description]"));
    };
    let mut task = Task::new(title.trim(), description.join(" "));
    if let Some(raw) = parsed.flag("due") {
        task.due_date = Some(timestamp(raw, "due")?);
    }
    if let Some(raw) = parsed.flag("remind") {
        task.reminder_date = Some(timestamp(raw, "remind")?);
    }
    if let Some(raw) = parsed.flag("priority") {
        task.priority = raw.parse()?;
    }
    task.assigned_to = parsed.flag("assign").unwrap_or_default().to_string();
    if let Some(raw) = parsed.flag("project") {
        task.project_id = Some(resolve(
            context.managers.projects.list(None),
            raw,
            |project: &Project| project.name.as_str(),
        )?);
    }
    if let Some(raw) = parsed.flag("client") {
        task.client_id = Some(resolve(
            context.managers.clients.list(None),
            raw,
            |client: &Client| client.name.as_str(),
        )?);
    }
    let added = context.managers.tasks.create_task(task)?;
    io::print_success(format!(
        "Task `{}` created ({}).",
        added.title,
        short_id(added.id)
    ));
    Ok(())
}

fn timestamp(raw: &str, field: &str) -> Result<chrono::DateTime<Utc>, CommandError> {
    parse_timestamp(raw).ok_or_else(|| {
        CommandError::InvalidArguments(format!("{} `{}` is not a date", field, raw))
    })
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.tasks.list(&TaskFilter::default()),
        reference,
        |task: &Task| task.title.as_str(),
    )
}

fn print_tasks(title: &str, tasks: &[&Task]) {
    print_listing(title, tasks, "No tasks found.");
}
