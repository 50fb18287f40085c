use std::{
    collections::BTreeMap,
    path::Path,
    sync::Arc,
};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::csv_io;
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{Printer, PrinterPatch, PrinterStatus, PrinterTechnology};
use crate::storage::StorageBackend;

const CSV_HEADERS: &[&str] = &[
    "name",
    "model",
    "manufacturer",
    "status",
    "technology",
    "purchase_price",
    "hourly_rate",
    "power_consumption",
    "build_volume",
    "maintenance_schedule",
    "total_print_hours",
    "location",
    "notes",
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PrinterCost {
    pub labor_cost: f64,
    pub electricity_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrinterStatistics {
    pub total_printers: usize,
    pub active_printers: usize,
    pub in_maintenance: usize,
    pub retired_printers: usize,
    pub by_technology: BTreeMap<String, usize>,
    pub total_print_hours: f64,
    pub total_investment: f64,
    pub maintenance_due: Vec<String>,
}

pub struct PrinterManager {
    repo: Repository<Printer>,
}

impl PrinterManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    pub fn add_printer(&mut self, printer: Printer) -> Result<&Printer> {
        if printer.name.trim().is_empty() {
            return Err(QuoteError::InvalidInput("printer name is required".into()));
        }
        self.repo.insert(printer)
    }

    pub fn get(&self, id: Uuid) -> Option<&Printer> {
        self.repo.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Printer> {
        self.repo.find_by_key(name)
    }

    pub fn all(&self) -> &[Printer] {
        self.repo.all()
    }

    pub fn list(
        &self,
        status: Option<PrinterStatus>,
        technology: Option<&PrinterTechnology>,
    ) -> Vec<&Printer> {
        self.repo.filter(|printer| {
            status.map_or(true, |wanted| printer.status == wanted)
                && technology.map_or(true, |wanted| &printer.technology == wanted)
        })
    }

    pub fn update(&mut self, id: Uuid, patch: PrinterPatch) -> Result<&Printer> {
        self.repo.update(id, patch)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Printer> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Printer> {
        self.repo.search(query)
    }

    pub fn set_status(&mut self, id: Uuid, status: PrinterStatus) -> Result<&Printer> {
        self.update(
            id,
            PrinterPatch {
                status: Some(status),
                ..PrinterPatch::default()
            },
        )
    }

    /// Adds `hours` of printing and reports whether maintenance is now due.
    pub fn update_print_hours(&mut self, id: Uuid, hours: f64) -> Result<bool> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(QuoteError::InvalidInput(
                "print hours must be a non-negative number".into(),
            ));
        }
        let due = self.repo.modify(id, |printer| {
            printer.total_print_hours += hours;
            Ok(printer.is_due_for_maintenance())
        })?;
        if due {
            tracing::warn!(printer = %id, "printer is due for maintenance");
        }
        Ok(due)
    }

    /// Stamps the maintenance time and puts the printer back in service.
    pub fn record_maintenance(&mut self, id: Uuid, notes: Option<&str>) -> Result<&Printer> {
        let now = Utc::now();
        self.repo.modify(id, |printer| {
            printer.last_maintenance = Some(now);
            printer.status = PrinterStatus::Active;
            if let Some(note) = notes.map(str::trim).filter(|note| !note.is_empty()) {
                let line = format!("[{}] maintenance: {}", now.format("%Y-%m-%d"), note);
                if printer.notes.is_empty() {
                    printer.notes = line;
                } else {
                    printer.notes = format!("{}\n{}", printer.notes, line);
                }
            }
            Ok(())
        })?;
        self.repo.get(id).ok_or_else(|| QuoteError::not_found("Printer", id))
    }

    pub fn maintenance_due(&self) -> Vec<&Printer> {
        self.repo.filter(Printer::is_due_for_maintenance)
    }

    pub fn by_technology(&self) -> BTreeMap<String, Vec<&Printer>> {
        let mut grouped: BTreeMap<String, Vec<&Printer>> = BTreeMap::new();
        for printer in self.repo.all() {
            grouped
                .entry(printer.technology.label().to_string())
                .or_default()
                .push(printer);
        }
        grouped
    }

    pub fn calculate_printer_cost(&self, id: Uuid, hours: f64, kwh_price: f64) -> Result<PrinterCost> {
        let printer = self
            .repo
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Printer", id))?;
        let labor_cost = printer.labor_cost(hours);
        let electricity_cost = printer.electricity_cost(hours, kwh_price);
        Ok(PrinterCost {
            labor_cost,
            electricity_cost,
            total_cost: labor_cost + electricity_cost,
        })
    }

    pub fn active_count(&self) -> usize {
        self.repo
            .filter(|printer| printer.status == PrinterStatus::Active)
            .len()
    }

    pub fn utilization_rate(&self, id: Uuid, days: u32) -> Result<f64> {
        self.repo
            .get(id)
            .map(|printer| printer.utilization_rate(days))
            .ok_or_else(|| QuoteError::not_found("Printer", id))
    }

    pub fn statistics(&self) -> PrinterStatistics {
        let printers = self.repo.all();
        let count = |status: PrinterStatus| printers.iter().filter(|p| p.status == status).count();
        let mut by_technology = BTreeMap::new();
        for printer in printers {
            *by_technology
                .entry(printer.technology.label().to_string())
                .or_insert(0) += 1;
        }
        PrinterStatistics {
            total_printers: printers.len(),
            active_printers: count(PrinterStatus::Active),
            in_maintenance: count(PrinterStatus::Maintenance),
            retired_printers: count(PrinterStatus::Retired),
            by_technology,
            total_print_hours: printers.iter().map(|p| p.total_print_hours).sum(),
            total_investment: printers.iter().map(|p| p.purchase_price).sum(),
            maintenance_due: printers
                .iter()
                .filter(|p| p.is_due_for_maintenance())
                .map(|p| p.name.clone())
                .collect(),
        }
    }

    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let rows: Vec<Vec<String>> = self
            .repo
            .all()
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.model.clone(),
                    p.manufacturer.clone(),
                    p.status.to_string(),
                    p.technology.to_string(),
                    p.purchase_price.to_string(),
                    p.hourly_rate.to_string(),
                    p.power_consumption.to_string(),
                    p.build_volume.clone(),
                    p.maintenance_schedule.to_string(),
                    p.total_print_hours.to_string(),
                    p.location.clone(),
                    p.notes.clone(),
                ]
            })
            .collect();
        csv_io::write_rows(path, CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }

    pub fn import_csv(&mut self, path: &Path) -> Result<usize> {
        let mut imported = Vec::new();
        for row in csv_io::read_rows(path)? {
            let name = csv_io::field(&row, "name");
            if name.is_empty() || self.repo.find_by_key(name).is_some() {
                continue;
            }
            let mut printer = Printer::new(
                name,
                csv_io::field(&row, "model"),
                csv_io::field(&row, "manufacturer"),
            );
            printer.status = csv_io::field(&row, "status").parse().unwrap_or_default();
            let technology = csv_io::field(&row, "technology");
            if !technology.is_empty() {
                printer.technology = PrinterTechnology::from(technology.to_string());
            }
            printer.purchase_price = csv_io::number(&row, "purchase_price").unwrap_or(0.0);
            printer.hourly_rate = csv_io::number(&row, "hourly_rate").unwrap_or(0.0);
            printer.power_consumption = csv_io::number(&row, "power_consumption").unwrap_or(0.0);
            printer.build_volume = csv_io::field(&row, "build_volume").to_string();
            printer.maintenance_schedule = csv_io::number(&row, "maintenance_schedule").unwrap_or(0.0);
            printer.total_print_hours = csv_io::number(&row, "total_print_hours").unwrap_or(0.0);
            printer.location = csv_io::field(&row, "location").to_string();
            printer.notes = csv_io::field(&row, "notes").to_string();
            imported.push(printer);
        }
        self.repo.insert_many(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::TempDir;

    fn manager() -> (PrinterManager, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("storage");
        (PrinterManager::new(Arc::new(storage)), temp)
    }

    fn printer(name: &str) -> Printer {
        let mut printer = Printer::new(name, "MK4", "Prusa Research");
        printer.hourly_rate = 2.0;
        printer.power_consumption = 200.0;
        printer.maintenance_schedule = 100.0;
        printer
    }

    #[test]
    fn print_hours_trigger_maintenance_and_recording_clears_status() {
        let (mut printers, _guard) = manager();
        let id = printers.add_printer(printer("Workhorse")).expect("add").id;
        assert!(!printers.update_print_hours(id, 60.0).expect("hours"));
        printers.set_status(id, PrinterStatus::Maintenance).expect("status");
        assert!(printers.update_print_hours(id, 40.0).expect("hours"));
        assert_eq!(printers.maintenance_due().len(), 1);
        assert_eq!(printers.statistics().maintenance_due, vec!["Workhorse"]);

        let serviced = printers.record_maintenance(id, Some("new nozzle")).expect("record");
        assert_eq!(serviced.status, PrinterStatus::Active);
        assert!(serviced.last_maintenance.is_some());
        assert!(serviced.notes.contains("maintenance: new nozzle"));
    }

    #[test]
    fn printer_cost_splits_labor_and_power() {
        let (mut printers, _guard) = manager();
        let id = printers.add_printer(printer("Costed")).expect("add").id;
        let cost = printers.calculate_printer_cost(id, 5.0, 0.2).expect("cost");
        assert!((cost.labor_cost - 10.0).abs() < 1e-9);
        assert!((cost.electricity_cost - 0.2).abs() < 1e-9);
        assert!((cost.total_cost - 10.2).abs() < 1e-9);
    }

    #[test]
    fn grouping_and_counts() {
        let (mut printers, _guard) = manager();
        printers.add_printer(printer("One")).expect("add");
        let mut resin = printer("Two");
        resin.technology = PrinterTechnology::Sla;
        resin.status = PrinterStatus::Retired;
        printers.add_printer(resin).expect("add");
        assert_eq!(printers.active_count(), 1);
        assert_eq!(printers.by_technology().get("SLA").map(Vec::len), Some(1));
        assert_eq!(printers.list(None, Some(&PrinterTechnology::Fdm)).len(), 1);
        assert!(printers.add_printer(printer("one")).is_err());
    }

    #[test]
    fn csv_roundtrip_keeps_technology() {
        let (mut printers, guard) = manager();
        let mut custom = printer("Custom");
        custom.technology = PrinterTechnology::Other("DLP".into());
        printers.add_printer(custom).expect("add");
        let path = guard.path().join("printers.csv");
        printers.export_csv(&path).expect("export");

        let (mut target, _other) = manager();
        assert_eq!(target.import_csv(&path).expect("import"), 1);
        assert_eq!(
            target.get_by_name("custom").map(|p| p.technology.clone()),
            Some(PrinterTechnology::Other("DLP".into()))
        );
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let (mut printers, _guard) = manager();
        let id = printers.add_printer(printer("Steady")).expect("add").id;
        printers.add_printer(printer("Spare")).expect("add");
        printers.update_print_hours(id, 120.0).expect("hours");
        assert_eq!(printers.statistics(), printers.statistics());
    }
}
