use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;

use super::{subcommand, usage, CommandDefinition};

const ACTIONS: &[&str] = &["list", "create", "restore", "delete"];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "backup",
        "Snapshot and restore the whole data directory",
        "backup [list|create [note]|restore <name>|delete <name>]",
        cmd_backup,
    )
    .with_actions(ACTIONS)]
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let backups = context.storage.list_backups()?;
            output_section("Backups");
            if backups.is_empty() {
                io::print_info("No backups found.");
            }
            for info in backups {
                let note = info
                    .note
                    .map(|note| format!(" - {}", note))
                    .unwrap_or_default();
                io::print_info(format!(
                    "  {}  {} file(s){}",
                    info.name,
                    info.files.len(),
                    note
                ));
            }
            Ok(())
        }
        "create" => {
            let note = rest.join(" ");
            let note = Some(note.as_str()).filter(|note| !note.trim().is_empty());
            let info = context.storage.backup_all(note)?;
            io::print_success(format!(
                "Backup `{}` created with {} file(s).",
                info.name,
                info.files.len()
            ));
            Ok(())
        }
        "restore" => {
            let [name] = rest else {
                return Err(usage("backup restore <name>"));
            };
            if !context.confirm("Replace current data with this backup?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let restored = context.storage.restore_backup(name)?;
            context.reload_all();
            io::print_success(format!(
                "Restored {} file(s) from `{}`.",
                restored.len(),
                name
            ));
            Ok(())
        }
        "delete" => {
            let [name] = rest else {
                return Err(usage("backup delete <name>"));
            };
            if !context.confirm("Delete this backup?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            context.storage.delete_backup(name)?;
            io::print_success(format!("Backup `{}` deleted.", name));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown backup action `{}`",
            other
        ))),
    }
}
