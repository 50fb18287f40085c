mod common;

use std::fs;

use chrono::NaiveDate;
use common::{reopen, setup_test_env};
use print_quote_core::{
    core::{calculate, CostInputs, QuoteError},
    domain::{Budget, BudgetPeriod, Client, Material, Project, StockOperation},
};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn saved_quote_survives_reopen() {
    let (mut managers, storage, settings, _base) = setup_test_env();
    let inputs = CostInputs::new(100.0, 2.0, "PLA", 20.0);
    let cost = calculate(&inputs, &settings.rates(), &settings.filament_prices()).unwrap();
    assert!(close(cost.final_price, 4.254));

    let id = managers
        .quotes
        .save_quote("Phone stand", &inputs, &cost)
        .expect("save quote")
        .id;

    let reopened = reopen(&storage);
    let quote = reopened.quotes.get(id).expect("quote persisted");
    assert_eq!(quote.piece_name, "Phone stand");
    assert!(close(quote.final_price, 4.254));
    assert!(close(quote.material_cost, 2.5));
}

#[test]
fn project_links_quotes_and_reports_value() {
    let (mut managers, storage, settings, _base) = setup_test_env();
    let inputs = CostInputs::new(100.0, 2.0, "PLA", 20.0);
    let cost = calculate(&inputs, &settings.rates(), &settings.filament_prices()).unwrap();
    let quote_id = managers.quotes.save_quote("Gear", &inputs, &cost).unwrap().id;

    let mut project = Project::new("Robot arm", "Replacement parts");
    project.budget = 50.0;
    let project_id = managers.projects.create_project(project).unwrap().id;
    managers.projects.add_quote(project_id, quote_id).unwrap();
    assert!(managers.projects.add_quote(project_id, quote_id).is_err());

    let reopened = reopen(&storage);
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    let stats = reopened
        .projects
        .project_statistics(project_id, reopened.quotes.all(), today)
        .expect("statistics");
    assert_eq!(stats.quote_count, 1);
    assert!(close(stats.quoted_value, 4.254));
    assert!(!stats.is_overdue);
}

#[test]
fn duplicate_names_are_rejected() {
    let (mut managers, _storage, _settings, _base) = setup_test_env();
    managers.clients.create_client(Client::new("Acme")).unwrap();
    let err = managers
        .clients
        .create_client(Client::new("Acme"))
        .expect_err("duplicate client");
    assert!(matches!(err, QuoteError::AlreadyExists { .. }));
    assert_eq!(managers.clients.count(), 1);
}

#[test]
fn stock_and_budget_changes_are_persisted() {
    let (mut managers, storage, _settings, _base) = setup_test_env();
    let mut material = Material::new("PLA Black", "PLA", 25.0);
    material.stock_quantity = 5.0;
    let material_id = managers.materials.add_material(material).unwrap().id;
    managers
        .materials
        .update_stock(material_id, 4.5, StockOperation::Remove)
        .expect("remove stock");
    assert!(managers
        .materials
        .update_stock(material_id, 10.0, StockOperation::Remove)
        .is_err());

    let budget_id = managers
        .budgets
        .create_budget(Budget::new("Filament", 100.0, BudgetPeriod::Monthly))
        .unwrap()
        .id;
    managers
        .budgets
        .add_transaction(30.0, "Two spools", Some(budget_id), None)
        .unwrap();

    let reopened = reopen(&storage);
    let material = reopened.materials.get(material_id).unwrap();
    assert!(close(material.stock_quantity, 0.5));
    assert!(material.is_low_stock());
    assert!(close(reopened.budgets.get(budget_id).unwrap().spent_amount, 30.0));
}

#[test]
fn backup_restore_brings_back_previous_state() {
    let (mut managers, storage, _settings, _base) = setup_test_env();
    managers.clients.create_client(Client::new("Before")).unwrap();
    let backup = storage.backup_all(Some("before import")).expect("backup");
    assert!(backup.files.contains(&"clients.json".to_string()));

    managers.clients.create_client(Client::new("After")).unwrap();
    assert_eq!(managers.clients.count(), 2);

    storage.restore_backup(&backup.name).expect("restore");
    managers.reload();
    assert_eq!(managers.clients.count(), 1);
    assert!(managers.clients.get_by_name("Before").is_some());
}

#[test]
fn corrupt_document_loads_as_empty() {
    let (mut managers, storage, _settings, base) = setup_test_env();
    managers.clients.create_client(Client::new("Acme")).unwrap();
    fs::write(base.join("clients.json"), "{ not json").unwrap();

    let reopened = reopen(&storage);
    assert_eq!(reopened.clients.count(), 0);
}
