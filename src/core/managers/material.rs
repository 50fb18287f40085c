use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    sync::Arc,
};

use serde::Serialize;
use uuid::Uuid;

use super::csv_io;
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{Material, MaterialPatch, MaterialStatus, StockOperation};
use crate::storage::StorageBackend;

const CSV_HEADERS: &[&str] = &[
    "name",
    "material_type",
    "price_per_kg",
    "density",
    "color",
    "manufacturer",
    "supplier",
    "status",
    "stock_quantity",
    "min_stock_alert",
    "notes",
];

/// Result of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockUpdate {
    pub quantity: f64,
    pub low_stock: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MaterialStatistics {
    pub total_materials: usize,
    pub active_materials: usize,
    pub discontinued_materials: usize,
    pub by_type: BTreeMap<String, usize>,
    pub total_inventory_value: f64,
    pub low_stock: Vec<String>,
}

pub struct MaterialManager {
    repo: Repository<Material>,
}

impl MaterialManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    pub fn add_material(&mut self, material: Material) -> Result<&Material> {
        if material.name.trim().is_empty() {
            return Err(QuoteError::InvalidInput("material name is required".into()));
        }
        self.repo.insert(material)
    }

    pub fn get(&self, id: Uuid) -> Option<&Material> {
        self.repo.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Material> {
        self.repo.find_by_key(name)
    }

    pub fn all(&self) -> &[Material] {
        self.repo.all()
    }

    /// Materials of the given type (case-insensitive) and status; `None` matches any.
    pub fn list(&self, material_type: Option<&str>, status: Option<MaterialStatus>) -> Vec<&Material> {
        self.repo.filter(|material| {
            material_type.map_or(true, |wanted| material.material_type.eq_ignore_ascii_case(wanted.trim()))
                && status.map_or(true, |wanted| material.status == wanted)
        })
    }

    pub fn update(&mut self, id: Uuid, patch: MaterialPatch) -> Result<&Material> {
        self.repo.update(id, patch)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Material> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Material> {
        self.repo.search(query)
    }

    pub fn update_stock(&mut self, id: Uuid, quantity: f64, operation: StockOperation) -> Result<StockUpdate> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(QuoteError::InvalidInput(
                "stock quantity must be a non-negative number".into(),
            ));
        }
        let update = self.repo.modify(id, |material| {
            let next = match operation {
                StockOperation::Add => material.stock_quantity + quantity,
                StockOperation::Set => quantity,
                StockOperation::Remove => {
                    if material.stock_quantity < quantity {
                        return Err(QuoteError::InvalidInput(format!(
                            "insufficient stock: {:.2} available, {:.2} requested",
                            material.stock_quantity, quantity
                        )));
                    }
                    material.stock_quantity - quantity
                }
            };
            material.stock_quantity = next;
            Ok(StockUpdate {
                quantity: next,
                low_stock: material.is_low_stock(),
            })
        })?;
        if update.low_stock {
            tracing::warn!(material = %id, quantity = update.quantity, "material stock is low");
        }
        Ok(update)
    }

    pub fn low_stock_materials(&self) -> Vec<&Material> {
        self.repo.filter(|material| material.is_low_stock())
    }

    /// Distinct material types, sorted.
    pub fn material_types(&self) -> Vec<String> {
        self.repo
            .all()
            .iter()
            .map(|material| material.material_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn calculate_material_cost(&self, id: Uuid, weight_g: f64) -> Result<f64> {
        self.repo
            .get(id)
            .map(|material| material.cost_for_weight(weight_g))
            .ok_or_else(|| QuoteError::not_found("Material", id))
    }

    pub fn by_supplier(&self, supplier: &str) -> Vec<&Material> {
        self.repo
            .filter(|material| material.supplier.eq_ignore_ascii_case(supplier.trim()))
    }

    pub fn statistics(&self) -> MaterialStatistics {
        let materials = self.repo.all();
        let mut by_type = BTreeMap::new();
        for material in materials {
            *by_type.entry(material.material_type.clone()).or_insert(0) += 1;
        }
        let count = |status: MaterialStatus| materials.iter().filter(|m| m.status == status).count();
        MaterialStatistics {
            total_materials: materials.len(),
            active_materials: count(MaterialStatus::Active),
            discontinued_materials: count(MaterialStatus::Discontinued),
            by_type,
            total_inventory_value: materials.iter().map(Material::inventory_value).sum(),
            low_stock: materials
                .iter()
                .filter(|material| material.is_low_stock())
                .map(|material| material.name.clone())
                .collect(),
        }
    }

    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let rows: Vec<Vec<String>> = self
            .repo
            .all()
            .iter()
            .map(|m| {
                vec![
                    m.name.clone(),
                    m.material_type.clone(),
                    m.price_per_kg.to_string(),
                    m.density.to_string(),
                    m.color.clone(),
                    m.manufacturer.clone(),
                    m.supplier.clone(),
                    m.status.to_string(),
                    m.stock_quantity.to_string(),
                    m.min_stock_alert.to_string(),
                    m.notes.clone(),
                ]
            })
            .collect();
        csv_io::write_rows(path, CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }

    /// Imports rows whose name is not already present. Returns how many were added.
    pub fn import_csv(&mut self, path: &Path) -> Result<usize> {
        let mut imported = Vec::new();
        for row in csv_io::read_rows(path)? {
            let name = csv_io::field(&row, "name");
            if name.is_empty() || self.repo.find_by_key(name).is_some() {
                continue;
            }
            let mut material = Material::new(
                name,
                csv_io::field(&row, "material_type"),
                csv_io::number(&row, "price_per_kg").unwrap_or(0.0),
            );
            if let Some(density) = csv_io::number(&row, "density") {
                material.density = density;
            }
            material.color = csv_io::field(&row, "color").to_string();
            material.manufacturer = csv_io::field(&row, "manufacturer").to_string();
            material.supplier = csv_io::field(&row, "supplier").to_string();
            material.status = csv_io::field(&row, "status").parse().unwrap_or_default();
            material.stock_quantity = csv_io::number(&row, "stock_quantity").unwrap_or(0.0);
            if let Some(alert) = csv_io::number(&row, "min_stock_alert") {
                material.min_stock_alert = alert;
            }
            material.notes = csv_io::field(&row, "notes").to_string();
            imported.push(material);
        }
        let added = self.repo.insert_many(imported)?;
        tracing::info!(path = %path.display(), added, "materials imported");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::TempDir;

    fn manager_in(dir: &Path) -> MaterialManager {
        let storage = JsonStorage::new(Some(dir.to_path_buf()), None).expect("storage");
        MaterialManager::new(Arc::new(storage))
    }

    #[test]
    fn repeated_stock_additions_accumulate() {
        let temp = TempDir::new().expect("temp dir");
        let mut materials = manager_in(temp.path());
        let id = materials
            .add_material(Material::new("PLA Premium", "PLA", 25.0))
            .expect("add")
            .id;
        materials.update_stock(id, 10.5, StockOperation::Add).expect("first");
        let update = materials.update_stock(id, 10.5, StockOperation::Add).expect("second");
        assert_eq!(update.quantity, 21.0);
        assert!(!update.low_stock);

        let reopened = manager_in(temp.path());
        assert_eq!(reopened.get(id).map(|m| m.stock_quantity), Some(21.0));
    }

    #[test]
    fn removing_more_than_available_fails() {
        let temp = TempDir::new().expect("temp dir");
        let mut materials = manager_in(temp.path());
        let id = materials
            .add_material(Material::new("ABS Black", "ABS", 28.0))
            .expect("add")
            .id;
        materials.update_stock(id, 2.0, StockOperation::Set).expect("set");
        let err = materials
            .update_stock(id, 3.0, StockOperation::Remove)
            .expect_err("insufficient");
        assert!(err.to_string().contains("insufficient stock"));
        let update = materials.update_stock(id, 1.5, StockOperation::Remove).expect("remove");
        assert_eq!(update.quantity, 0.5);
        assert!(update.low_stock);
        assert!(materials.update_stock(id, -1.0, StockOperation::Add).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut materials = manager_in(temp.path());
        materials.add_material(Material::new("PETG Clear", "PETG", 30.0)).expect("add");
        assert!(materials
            .add_material(Material::new("petg clear", "PETG", 31.0))
            .is_err());
        assert_eq!(materials.get_by_name("PETG CLEAR").map(|m| m.price_per_kg), Some(30.0));
    }

    #[test]
    fn statistics_types_and_cost() {
        let temp = TempDir::new().expect("temp dir");
        let mut materials = manager_in(temp.path());
        let pla = materials.add_material(Material::new("PLA White", "PLA", 20.0)).expect("add").id;
        materials.add_material(Material::new("TPU Red", "TPU", 40.0)).expect("add");
        materials.add_material(Material::new("PLA Black", "PLA", 22.0)).expect("add");
        materials.update_stock(pla, 5.0, StockOperation::Set).expect("set");

        assert_eq!(materials.material_types(), vec!["PLA", "TPU"]);
        assert_eq!(materials.list(Some("pla"), None).len(), 2);
        let stats = materials.statistics();
        assert_eq!(stats.total_materials, 3);
        assert_eq!(stats.by_type.get("PLA"), Some(&2));
        assert_eq!(stats.total_inventory_value, 100.0);
        assert_eq!(stats.low_stock.len(), 2);
        assert_eq!(materials.calculate_material_cost(pla, 250.0).expect("cost"), 5.0);
        assert!(materials.calculate_material_cost(Uuid::new_v4(), 1.0).is_err());
    }

    #[test]
    fn csv_import_skips_existing_names() {
        let temp = TempDir::new().expect("temp dir");
        let mut source = manager_in(temp.path());
        source.add_material(Material::new("Wood Fill", "Wood", 35.0)).expect("add");
        source.add_material(Material::new("Carbon", "Carbon Fiber", 60.0)).expect("add");
        let csv_path = temp.path().join("materials.csv");
        assert_eq!(source.export_csv(&csv_path).expect("export"), 2);

        let other = TempDir::new().expect("temp dir");
        let mut target = manager_in(other.path());
        target.add_material(Material::new("Wood Fill", "Wood", 1.0)).expect("add");
        assert_eq!(target.import_csv(&csv_path).expect("import"), 1);
        assert_eq!(target.get_by_name("Carbon").map(|m| m.price_per_kg), Some(60.0));
        assert_eq!(target.get_by_name("Wood Fill").map(|m| m.price_per_kg), Some(1.0));
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let temp = TempDir::new().expect("temp dir");
        let mut materials = manager_in(temp.path());
        let pla = materials
            .add_material(Material::new("PLA White", "PLA", 22.0))
            .expect("add")
            .id;
        materials.add_material(Material::new("TPU Red", "TPU", 40.0)).expect("add");
        materials.update_stock(pla, 3.0, StockOperation::Set).expect("stock");
        assert_eq!(materials.statistics(), materials.statistics());
    }
}
