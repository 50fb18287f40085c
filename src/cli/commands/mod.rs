use std::collections::HashMap;

use uuid::Uuid;

pub mod backup;
pub mod budget;
pub mod calc;
pub mod client;
pub mod material;
pub mod printer;
pub mod project;
pub mod quote;
pub mod report;
pub mod settings;
pub mod stats;
pub mod system;
pub mod task;
pub mod template;
pub mod user;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::{calculator::parse_decimal, managers::TimelineEvent, repository::Entity};
use crate::domain::common::Displayable;

pub(crate) fn all_definitions() -> Vec<CommandDefinition> {
    let mut commands = Vec::new();
    commands.extend(system::definitions());
    commands.extend(calc::definitions());
    commands.extend(quote::definitions());
    commands.extend(template::definitions());
    commands.extend(report::definitions());
    commands.extend(settings::definitions());
    commands.extend(material::definitions());
    commands.extend(printer::definitions());
    commands.extend(client::definitions());
    commands.extend(project::definitions());
    commands.extend(task::definitions());
    commands.extend(budget::definitions());
    commands.extend(backup::definitions());
    commands.extend(stats::definitions());
    commands.extend(user::definitions());
    commands
}

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// A top-level shell command. `actions` lists the words accepted in second
/// position; the first one is what runs when no action is given.
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub actions: &'static [&'static str],
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            actions: &[],
            handler,
        }
    }

    pub fn with_actions(self, actions: &'static [&'static str]) -> Self {
        Self { actions, ..self }
    }

    pub fn default_action(&self) -> Option<&'static str> {
        self.actions.first().copied()
    }
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDefinition>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        let mut order = Vec::new();
        for definition in definitions {
            order.push(definition.name);
            commands.insert(definition.name, definition);
        }
        Self { commands, order }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.order
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

/// Positional arguments plus `--flag value` pairs. A flag with no value maps to "".
/// `--flag=value` always carries its value. Flags listed as switches never take
/// the next token.
pub(crate) struct ParsedArgs<'a> {
    pub positional: Vec<&'a str>,
    flags: HashMap<String, &'a str>,
}

impl<'a> ParsedArgs<'a> {
    pub fn parse(args: &[&'a str]) -> Self {
        Self::with_switches(args, &[])
    }

    pub fn with_switches(args: &[&'a str], switches: &[&str]) -> Self {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        let mut iter = args.iter().copied().peekable();
        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--").filter(|flag| !flag.is_empty()) else {
                positional.push(arg);
                continue;
            };
            let (name, value) = match flag.split_once('=') {
                Some((name, value)) => (name.to_ascii_lowercase(), value),
                None => {
                    let name = flag.to_ascii_lowercase();
                    let value = if switches.contains(&name.as_str()) {
                        ""
                    } else {
                        iter.next_if(|next| !next.starts_with("--")).unwrap_or("")
                    };
                    (name, value)
                }
            };
            flags.insert(name, value);
        }
        Self { positional, flags }
    }

    pub fn flag(&self, name: &str) -> Option<&'a str> {
        self.flags.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }
}

/// Returns the first argument as a lowercase subcommand, or `default` when absent.
pub(crate) fn subcommand<'a>(args: &'a [&'a str], default: &str) -> (String, &'a [&'a str]) {
    match args.split_first() {
        Some((first, rest)) => (first.to_lowercase(), rest),
        None => (default.to_string(), args),
    }
}

pub(crate) fn usage(text: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {}", text))
}

pub(crate) fn parse_number(raw: &str, field: &str) -> Result<f64, CommandError> {
    parse_decimal(raw).ok_or_else(|| {
        CommandError::InvalidArguments(format!("{} `{}` is not a number", field, raw.trim()))
    })
}

pub(crate) fn parse_count(raw: &str, field: &str) -> Result<usize, CommandError> {
    raw.trim().parse::<usize>().map_err(|_| {
        CommandError::InvalidArguments(format!("{} `{}` is not a whole number", field, raw))
    })
}

pub(crate) fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// Finds one entity by full id, id prefix, or case-insensitive name.
pub(crate) fn resolve<'a, T, I, F>(
    items: I,
    raw: &str,
    name_of: F,
) -> Result<Uuid, CommandError>
where
    T: Entity + 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return Err(CommandError::InvalidArguments(format!(
            "{} reference is empty",
            T::KIND
        )));
    }
    let mut by_prefix = Vec::new();
    for item in items {
        if name_of(item).to_lowercase() == needle {
            return Ok(item.id());
        }
        if item.id().to_string().starts_with(&needle) {
            by_prefix.push(item.id());
        }
    }
    match by_prefix.as_slice() {
        [id] => Ok(*id),
        [] => Err(CommandError::InvalidArguments(format!(
            "no {} matches `{}`",
            T::KIND.to_lowercase(),
            raw
        ))),
        many => Err(CommandError::InvalidArguments(format!(
            "`{}` matches {} {} records; use a longer id",
            raw,
            many.len(),
            T::KIND.to_lowercase()
        ))),
    }
}

pub(crate) fn print_timeline(title: &str, events: &[TimelineEvent]) {
    output_section(title);
    io::print_rows(
        events.iter().map(|event| {
            format!(
                "{}  {:<20} {}",
                event.date.format("%Y-%m-%d %H:%M"),
                event.event,
                event.description
            )
        }),
        "No history yet.",
    );
}

/// One `short-id  label` row per entity under a section heading.
pub(crate) fn print_listing<T: Entity + Displayable>(title: &str, items: &[&T], empty: &str) {
    output_section(title);
    io::print_rows(
        items
            .iter()
            .map(|item| format!("{}  {}", short_id(item.id()), item.display_label())),
        empty,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Client;

    #[test]
    fn flags_are_split_from_positionals() {
        let parsed = ParsedArgs::with_switches(
            &["Bracket", "--due", "2030-01-01", "--urgent", "x"],
            &["urgent"],
        );
        assert_eq!(parsed.positional, vec!["Bracket", "x"]);
        assert_eq!(parsed.flag("due"), Some("2030-01-01"));
        assert!(parsed.has("urgent"));
        assert_eq!(parsed.flag("urgent"), Some(""));
    }

    #[test]
    fn switches_leave_the_next_token_alone() {
        let parsed = ParsedArgs::with_switches(&["--save", "100", "2", "PLA"], &["save"]);
        assert_eq!(parsed.positional, vec!["100", "2", "PLA"]);
        assert_eq!(parsed.flag("save"), Some(""));

        let parsed = ParsedArgs::with_switches(&["--save=Phone stand", "100"], &["save"]);
        assert_eq!(parsed.flag("save"), Some("Phone stand"));
        assert_eq!(parsed.positional, vec!["100"]);

        let parsed = ParsedArgs::parse(&["--rate=2,5", "--tech", "FDM"]);
        assert_eq!(parsed.flag("rate"), Some("2,5"));
        assert_eq!(parsed.flag("tech"), Some("FDM"));
        assert!(parsed.positional.is_empty());
    }

    #[test]
    fn resolve_accepts_names_and_id_prefixes() {
        let clients = vec![Client::new("Acme"), Client::new("Globex")];
        let by_name = resolve(&clients, "ACME", |c: &Client| c.name.as_str()).expect("name");
        assert_eq!(by_name, clients[0].id);
        let prefix = clients[1].id.to_string()[..8].to_string();
        let by_id = resolve(&clients, &prefix, |c: &Client| c.name.as_str()).expect("id");
        assert_eq!(by_id, clients[1].id);
        assert!(resolve(&clients, "Initech", |c: &Client| c.name.as_str()).is_err());
    }

    #[test]
    fn numbers_accept_decimal_commas() {
        assert_eq!(parse_number("2,5", "hours").expect("number"), 2.5);
        let err = parse_number(" abc ", "hours").expect_err("text");
        assert_eq!(err.to_string(), "hours `abc` is not a number");
    }
}
