use std::path::Path;

use uuid::Uuid;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::core::validation::DataValidator;
use crate::domain::{Material, MaterialPatch, MaterialStatus, StockOperation};

use super::{
    parse_number, print_listing, resolve, short_id, subcommand, usage, CommandDefinition,
    ParsedArgs,
};

const USAGE: &str = "material [list [type] [--status <active|discontinued>]|add <name> <type> <price_per_kg> [stock_kg] [--color <c>] [--manufacturer <m>] [--supplier <s>] [--min-stock <kg>]|show <material>|stock <material> <add|remove|set> <kg>|status <material> <active|discontinued>|low|types|cost <material> <grams>|supplier <name>|search <text>|delete <material>|stats|export <path>|import <path>]";

const ACTIONS: &[&str] = &[
    "list", "add", "show", "stock", "status", "low", "types", "cost", "supplier",
    "search", "delete", "stats", "export", "import",
];

pub(crate) fn definitions() -> Vec<CommandDefinition> {
    vec![CommandDefinition::new(
        "material",
        "Manage the filament and resin inventory",
        USAGE,
        cmd_material,
    )
    .with_actions(ACTIONS)]
}

fn cmd_material(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (action, rest) = subcommand(args, "list");
    match action.as_str() {
        "list" => {
            let parsed = ParsedArgs::parse(rest);
            let status = parsed
                .flag("status")
                .map(str::parse::<MaterialStatus>)
                .transpose()?;
            let material_type = parsed.positional.first().copied();
            let materials = context.managers.materials.list(material_type, status);
            print_materials("Materials", &materials);
            Ok(())
        }
        "add" => add_material(context, rest),
        "show" => {
            let id = find(context, &rest.join(" "))?;
            if let Some(material) = context.managers.materials.get(id) {
                print_material(context, material);
            }
            Ok(())
        }
        "stock" => {
            let [reference, operation, quantity] = rest else {
                return Err(usage("material stock <material> <add|remove|set> <kg>"));
            };
            let operation: StockOperation = operation.parse()?;
            let quantity = parse_number(quantity, "quantity")?;
            let id = find(context, reference)?;
            let update = context
                .managers
                .materials
                .update_stock(id, quantity, operation)?;
            io::print_success(format!("Stock is now {:.2} kg.", update.quantity));
            if update.low_stock {
                io::print_warning("Stock is at or below the alert level.");
            }
            Ok(())
        }
        "status" => {
            let [reference, status] = rest else {
                return Err(usage("material status <material> <active|discontinued>"));
            };
            let status: MaterialStatus = status.parse()?;
            let id = find(context, reference)?;
            let patch = MaterialPatch {
                status: Some(status),
                ..MaterialPatch::default()
            };
            let material = context.managers.materials.update(id, patch)?;
            io::print_success(format!("{} is now {}.", material.name, material.status));
            Ok(())
        }
        "low" => {
            let low = context.managers.materials.low_stock_materials();
            print_materials("Low stock", &low);
            Ok(())
        }
        "types" => {
            output_section("Material types");
            for material_type in context.managers.materials.material_types() {
                io::print_info(format!("  {}", material_type));
            }
            Ok(())
        }
        "cost" => {
            let [reference, grams] = rest else {
                return Err(usage("material cost <material> <grams>"));
            };
            let grams = parse_number(grams, "weight")?;
            let id = find(context, reference)?;
            let cost = context.managers.materials.calculate_material_cost(id, grams)?;
            io::print_info(format!(
                "{}g costs {}",
                grams,
                context.money(cost)
            ));
            Ok(())
        }
        "supplier" => {
            let found = context.managers.materials.by_supplier(&rest.join(" "));
            print_materials("Materials by supplier", &found);
            Ok(())
        }
        "search" => {
            let found = context.managers.materials.search(&rest.join(" "));
            print_materials("Matching materials", &found);
            Ok(())
        }
        "delete" => {
            let id = find(context, &rest.join(" "))?;
            if !context.confirm("Delete this material?")? {
                io::print_info("Operation cancelled.");
                return Ok(());
            }
            let removed = context.managers.materials.delete(id)?;
            io::print_success(format!("Material `{}` deleted.", removed.name));
            Ok(())
        }
        "stats" => {
            let stats = context.managers.materials.statistics();
            output_section("Material statistics");
            io::print_info(format!(
                "  Materials    : {} ({} active, {} discontinued)",
                stats.total_materials, stats.active_materials, stats.discontinued_materials
            ));
            for (material_type, count) in &stats.by_type {
                io::print_info(format!("  {:<12} : {}", material_type, count));
            }
            io::print_info(format!(
                "  Stock value  : {}",
                context.money(stats.total_inventory_value)
            ));
            if !stats.low_stock.is_empty() {
                io::print_warning(format!("Low stock: {}", stats.low_stock.join(", ")));
            }
            Ok(())
        }
        "export" => {
            let [path] = rest else {
                return Err(usage("material export <path>"));
            };
            let count = context.managers.materials.export_csv(Path::new(path))?;
            io::print_success(format!("Exported {} material(s) to {}.", count, path));
            Ok(())
        }
        "import" => {
            let [path] = rest else {
                return Err(usage("material import <path>"));
            };
            let count = context.managers.materials.import_csv(Path::new(path))?;
            io::print_success(format!("Imported {} new material(s).", count));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown material action `{}`",
            other
        ))),
    }
}

fn add_material(context: &mut ShellContext, rest: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(rest);
    let (name, material_type, price, stock) = match parsed.positional.as_slice() {
        [name, material_type, price] => (*name, *material_type, *price, None),
        [name, material_type, price, stock] => (*name, *material_type, *price, Some(*stock)),
        _ => return Err(usage("material add <name> <type> <price_per_kg> [stock_kg]")),
    };
    let price = parse_number(price, "price per kg")?;
    DataValidator::validate_cost(price)?;

    let mut material = Material::new(name.trim(), material_type.trim(), price);
    if let Some(stock) = stock {
        material.stock_quantity = parse_number(stock, "stock")?.max(0.0);
    }
    if let Some(alert) = parsed.flag("min-stock") {
        material.min_stock_alert = parse_number(alert, "min-stock")?;
    }
    material.color = parsed.flag("color").unwrap_or_default().to_string();
    material.manufacturer = parsed.flag("manufacturer").unwrap_or_default().to_string();
    material.supplier = parsed.flag("supplier").unwrap_or_default().to_string();

    let added = context.managers.materials.add_material(material)?;
    io::print_success(format!(
        "Material `{}` added ({}).",
        added.name,
        short_id(added.id)
    ));
    Ok(())
}

fn find(context: &ShellContext, reference: &str) -> Result<Uuid, CommandError> {
    resolve(
        context.managers.materials.all(),
        reference,
        |material: &Material| material.name.as_str(),
    )
}

fn print_materials(title: &str, materials: &[&Material]) {
    print_listing(title, materials, "No materials found.");
}

fn print_material(context: &ShellContext, material: &Material) {
    output_section(format!("Material: {}", material.name));
    io::print_info(format!("  Id           : {}", material.id));
    io::print_info(format!("  Type         : {}", material.material_type));
    io::print_info(format!(
        "  Price        : {} / kg",
        context.money(material.price_per_kg)
    ));
    io::print_info(format!("  Density      : {} g/cm3", material.density));
    io::print_info(format!(
        "  Stock        : {:.2} kg (alert at {:.2})",
        material.stock_quantity, material.min_stock_alert
    ));
    io::print_info(format!("  Status       : {}", material.status));
    if !material.supplier.is_empty() {
        io::print_info(format!("  Supplier     : {}", material.supplier));
    }
    for (key, value) in &material.properties {
        io::print_info(format!("  {:<12} : {}", key, value));
    }
}
