use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::utils::build_info;

use super::CommandDefinition;

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "version",
            "Show the build and where data is kept",
            "version",
            cmd_version,
        ),
        CommandDefinition::new(
            "help",
            "List commands or explain one",
            "help [command]",
            cmd_help,
        ),
        CommandDefinition::new("exit", "Leave the shell", "exit", cmd_exit),
        CommandDefinition::new("quit", "Leave the shell", "quit", cmd_exit),
    ]
}

fn cmd_version(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output_section(format!("Print Quote {}", meta.version));
    io::print_field("Commit", format!("{} ({})", meta.git_hash, meta.git_status));
    io::print_field("Built", meta.timestamp);
    io::print_field("Target", format!("{} [{}]", meta.target, meta.profile));
    io::print_field("Compiler", meta.rustc);
    io::print_field("Data format", format!("v{}", build_info::DATA_FORMAT_VERSION));
    io::print_field("Data dir", context.storage.base_dir().display());
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        help::print_overview(&context.registry);
        return Ok(());
    };
    match context.command(&name.to_lowercase()) {
        Some(command) => help::print_command(command),
        None => context.suggest_command(name),
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
