use crate::cli::commands::{CommandDefinition, CommandRegistry};
use crate::cli::io;
use crate::cli::output::section as output_section;

pub fn print_overview(registry: &CommandRegistry) {
    output_section("Commands");
    let width = registry
        .names()
        .map(str::len)
        .max()
        .unwrap_or_default();
    for entry in registry.iter() {
        io::print_info(format!(
            "  {:<width$}  {}",
            entry.name,
            entry.description,
            width = width
        ));
    }
    io::print_info("Run `help <command>` for usage and actions.");
}

pub fn print_command(entry: &CommandDefinition) {
    output_section(entry.name);
    io::print_info(entry.description);
    io::print_field("Usage", entry.usage);
    if !entry.actions.is_empty() {
        io::print_field("Actions", entry.actions.join(", "));
    }
    if let Some(default) = entry.default_action() {
        io::print_field("Default", default);
    }
}
