use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::domain::{Client, ClientPatch, ClientStatus};

use super::{
    parse_count, parse_number, print_listing, resolve, short_id, subcommand, usage,
    CommandDefinition, ParsedArgs,
};

const USAGE: &str = "client [list [active|inactive]|add <name> [email] [--phone <p>] [--company <c>] [--discount <pct>]|show <client>|spend <client> <amount>|note <client> <text>|contact <client>|discount <client> <amount>|status <client> <active|inactive>|top [n]|range <min> [max]|inactive [days]|search <text>|delete <client>|export <path>]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "spend", "note", "contact", "discount", "status", "top",
    "range", "inactive", "search", "delete", "export",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "client",
        "Manage clients and their order history",
        USAGE,
        cmd_client,
    )
    .with_actions(ACTIONS)]
}

fn cmd_client(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let status = rest
                .first()
                .map(|raw| raw.parse::<ClientStatus>())
                .transpose()?;
            let clients = context.managers.clients.list(status);
            print_clients("Clients", &clients);
            io::print_info(format!(
                "{} client(s), {} active, lifetime revenue {}",
                context.managers.clients.count(),
                context.managers.clients.active_count(),
                context.money(context.managers.clients.total_revenue())
            ));
            Ok(())
        }
        "add" => {
            let parsed = ParsedArgs::parse(rest);
            let (name, email) = match parsed.positional.as_slice() {
                [name] => (*name, ""),
                [name, email] => (*name, *email),
                _ => return Err(usage("client add <name> [email]")),
            };
            let mut client = Client::new(name.trim());
            client.email = email.trim().to_string();
            client.phone = parsed.flag("phone").unwrap_or_default().to_string();
            client.company = parsed.flag("company").unwrap_or_default().to_string();
            if let Some(discount) = parsed.flag("discount") {
                client.discount_rate = parse_number(discount, "discount")?;
            }
            let added = context.managers.clients.create_client(client)?;
            io::print_success(format!(
                "Client `{}` added ({}).",
                added.name,
                short_id(added.id)
            ));
            Ok(())
        }
        "show" => {
            let id = find(context, &rest.join(" "))?;
            let stats = context.managers.clients.client_statistics(id, Utc::now())?;
            if let Some(client) = context.managers.clients.get(id) {
                output_section(format!("Client: {}", client.name));
                io::print_info(format!("  Id           : {}", client.id));
                io::print_info(format!("  Email        : {}", client.email));
                io::print_info(format!("  Phone        : {}", client.phone));
                io::print_info(format!("  Company      : {}", client.company));
                io::print_info(format!("  Status       : {}", client.status));
                io::print_info(format!("  Discount     : {}%", stats.discount_rate));
                if !client.notes.is_empty() {
                    io::print_info(format!("  Notes        : {}", client.notes));
                }
            }
            io::print_info(format!(
                "  Spent        : {} over {} order(s), average {}",
                context.money(stats.total_spent),
                stats.quote_count,
                context.money(stats.average_order_value)
            ));
            match stats.days_since_contact {
                Some(days) => io::print_info(format!("  Last contact : {} day(s) ago", days)),
                None => io::print_info("  Last contact : never"),
            }
            Ok(())
        }
        "spend" => {
            let [reference, amount] = rest else {
                return Err(usage("client spend <client> <amount>"));
            };
            let amount = parse_number(amount, "amount")?;
            let id = find(context, reference)?;
            let client = context.managers.clients.record_spending(id, amount)?;
            let message = format!(
                "{} has spent {:.2} over {} order(s).",
                client.name, client.total_spent, client.quote_count
            );
            io::print_success(message);
            Ok(())
        }
        "note" => {
            let Some((reference, note)) = rest.split_first() else {
                return Err(usage("client note <client> <text>"));
            };
            let id = find(context, reference)?;
            context.managers.clients.add_note(id, &note.join(" "))?;
            io::print_success("Note added.");
            Ok(())
        }
        "contact" => {
            let id = find(context, &rest.join(" "))?;
            context.managers.clients.update_last_contact(id, Utc::now())?;
            io::print_success("Last contact updated.");
            Ok(())
        }
        "discount" => {
            let [reference, amount] = rest else {
                return Err(usage("client discount <client> <amount>"));
            };
            let amount = parse_number(amount, "amount")?;
            let id = find(context, reference)?;
            let price = context.managers.clients.apply_discount(id, amount)?;
            io::print_info(format!("Discounted price: {}", context.money(price)));
            Ok(())
        }
        "status" => {
            let [reference, status] = rest else {
                return Err(usage("client status <client> <active|inactive>"));
            };
            let status: ClientStatus = status.parse()?;
            let id = find(context, reference)?;
            let patch = ClientPatch {
                status: Some(status),
                ..ClientPatch::default()
            };
            let client = context.managers.clients.update(id, patch)?;
            io::print_success(format!("{} is now {}.", client.name, client.status));
            Ok(())
        }
        "top" => {
            let limit = match rest.first() {
                Some(raw) => parse_count(raw, "limit")?,
                None => 5,
            };
            let top = context.managers.clients.top_clients(limit);
            print_clients("Top clients", &top);
            Ok(())
        }
        "range" => {
            let (min, max) = match rest {
                [min] => (parse_number(min, "min")?, None),
                [min, max] => (parse_number(min, "min")?, Some(parse_number(max, "max")?)),
                _ => return Err(usage("client range <min> [max]")),
            };
            let found = context.managers.clients.by_spending_range(min, max);
            print_clients("Clients by spending", &found);
            Ok(())
        }
        "inactive" => {
            let days = match rest.first() {
                Some(raw) => parse_count(raw, "days")?,
                None => 90,
            };
            let days = i64::try_from(days).unwrap_or(i64::MAX);
            let found = context.managers.clients.inactive_clients(days, Utc::now());
            print_clients("Clients without recent contact", &found);
            Ok(())
        }
        "search" => {
            let found = context.managers.clients.search(&rest.join(" "));
            print_clients("Matching clients", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this client?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.clients.delete(id)?;
            io::print_success(format!("Client `{}` deleted.", removed.name));
            Ok(())
        }
        "export" => {
            let [path] = rest else {
                return Err(usage("client export <path>"));
            };
            let count = context.managers.clients.export_csv(Path::new(path))?;
            io::print_success(format!("Exported {} client(s) to {}.", count, path));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown client action `{}`",
            other
        ))),
    }
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.clients.list(None),
        reference,
        |client: &Client| client.name.as_str(),
    )
}

fn print_clients(title: &str, clients: &[&Client]) {
    print_listing(title, clients, "No clients found.");
}
