use crate::auth::Role;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;

use super::{subcommand, usage, CommandDefinition};

const ACTIONS: &[&str] = &["whoami", "add", "login", "logout", "passwd", "role", "remove", "list"];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "user",
        "Manage local accounts and sign in",
        "user [whoami|add <name> <password> [admin|user|guest]|login <name> <password>|logout|passwd <old> <new>|role <name> <role> <admin_password>|remove <name> <admin_password>|list]",
        cmd_user,
    )
    .with_actions(ACTIONS)]
}

fn cmd_user(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "whoami");
    match action.as_str() {
        "whoami" => {
            match context.auth.validate_session() {
                Ok(session) => io::print_info(format!(
                    "Signed in as {} until {}.",
                    session.username,
                    session.expires_at.format("%Y-%m-%d %H:%M")
                )),
                Err(_) => io::print_info("Not signed in."),
            }
            Ok(())
        }
        "add" => {
            let (name, password, role) = match rest {
                [name, password] => (*name, *password, Role::default()),
                [name, password, role] => (*name, *password, role.parse()?),
                _ => return Err(usage("user add <name> <password> [role]")),
            };
            context.auth.create_user(name, password, role)?;
            io::print_success(format!("User `{}` created as {}.", name, role));
            Ok(())
        }
        "login" => {
            let [name, password] = rest else {
                return Err(usage("user login <name> <password>"));
            };
            let session = context.auth.authenticate(name, password)?;
            io::print_success(format!("Welcome, {}.", session.username));
            Ok(())
        }
        "logout" => {
            context.auth.logout();
            io::print_success("Signed out.");
            Ok(())
        }
        "passwd" => {
            let [old, new] = rest else {
                return Err(usage("user passwd <old> <new>"));
            };
            let Some(user) = context.auth.current_user().map(str::to_string) else {
                return Err(CommandError::Message("sign in first".into()));
            };
            context.auth.change_password(&user, old, new)?;
            io::print_success("Password changed.");
            Ok(())
        }
        "role" => {
            let [name, role, admin_password] = rest else {
                return Err(usage("user role <name> <role> <admin_password>"));
            };
            let role: Role = role.parse()?;
            context.auth.update_role(name, role, admin_password)?;
            io::print_success(format!("{} is now {}.", name, role));
            Ok(())
        }
        "remove" => {
            let [name, admin_password] = rest else {
                return Err(usage("user remove <name> <admin_password>"));
            };
            context.auth.delete_user(name, admin_password)?;
            io::print_success(format!("User `{}` removed.", name));
            Ok(())
        }
        "list" => {
            let users = context.auth.list_users()?;
            output_section("Users");
            for (name, record) in users {
                let last = record
                    .last_login
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".into());
                io::print_info(format!("  {:<16} {:<6} last login {}", name, record.role.as_str(), last));
            }
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown user action `{}`",
            other
        ))),
    }
}
