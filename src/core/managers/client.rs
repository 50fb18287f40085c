use std::{path::Path, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::csv_io;
use crate::core::{
    errors::{QuoteError, Result},
    repository::Repository,
};
use crate::domain::{Client, ClientPatch, ClientStatus};
use crate::storage::StorageBackend;

const CSV_HEADERS: &[&str] = &[
    "name",
    "email",
    "phone",
    "company",
    "address",
    "status",
    "total_spent",
    "quote_count",
    "discount_rate",
    "preferred_filament",
    "notes",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientStatistics {
    pub total_spent: f64,
    pub quote_count: u32,
    pub average_order_value: f64,
    pub last_contact: Option<DateTime<Utc>>,
    pub days_since_contact: Option<i64>,
    pub discount_rate: f64,
}

pub struct ClientManager {
    repo: Repository<Client>,
}

impl ClientManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            repo: Repository::open(storage),
        }
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    pub fn create_client(&mut self, client: Client) -> Result<&Client> {
        if client.name.trim().is_empty() {
            return Err(QuoteError::InvalidInput("client name is required".into()));
        }
        self.repo.insert(client)
    }

    pub fn get(&self, id: Uuid) -> Option<&Client> {
        self.repo.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Client> {
        self.repo.find_by_key(name)
    }

    pub fn list(&self, status: Option<ClientStatus>) -> Vec<&Client> {
        self.repo
            .filter(|client| status.map_or(true, |wanted| client.status == wanted))
    }

    pub fn update(&mut self, id: Uuid, patch: ClientPatch) -> Result<&Client> {
        self.repo.update(id, patch)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<Client> {
        self.repo.delete(id)
    }

    pub fn search(&self, query: &str) -> Vec<&Client> {
        self.repo.search(query)
    }

    pub fn client_statistics(&self, id: Uuid, now: DateTime<Utc>) -> Result<ClientStatistics> {
        let client = self
            .repo
            .get(id)
            .ok_or_else(|| QuoteError::not_found("Client", id))?;
        Ok(ClientStatistics {
            total_spent: client.total_spent,
            quote_count: client.quote_count,
            average_order_value: client.average_order_value(),
            last_contact: client.last_contact,
            days_since_contact: client.last_contact.map(|at| (now - at).num_days()),
            discount_rate: client.discount_rate,
        })
    }

    /// Books an order: grows the lifetime spend and the order count.
    pub fn record_spending(&mut self, id: Uuid, amount: f64) -> Result<&Client> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(QuoteError::InvalidInput(
                "spending must be a non-negative number".into(),
            ));
        }
        self.repo.modify(id, |client| {
            client.total_spent += amount;
            client.quote_count += 1;
            Ok(())
        })?;
        self.repo.get(id).ok_or_else(|| QuoteError::not_found("Client", id))
    }

    /// Highest lifetime spend first.
    pub fn top_clients(&self, limit: usize) -> Vec<&Client> {
        let mut clients: Vec<&Client> = self.repo.all().iter().collect();
        clients.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
        clients.truncate(limit);
        clients
    }

    /// Clients whose lifetime spend lies in `min..=max`.
    pub fn by_spending_range(&self, min: f64, max: Option<f64>) -> Vec<&Client> {
        self.repo.filter(|client| {
            client.total_spent >= min && max.map_or(true, |max| client.total_spent <= max)
        })
    }

    pub fn add_note(&mut self, id: Uuid, note: &str) -> Result<()> {
        if note.trim().is_empty() {
            return Err(QuoteError::InvalidInput("note is empty".into()));
        }
        let now = Utc::now();
        self.repo.modify(id, |client| {
            client.append_note(note, now);
            Ok(())
        })
    }

    pub fn update_last_contact(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.repo.modify(id, |client| {
            client.last_contact = Some(at);
            Ok(())
        })
    }

    /// Active clients never contacted, or last contacted more than `days` ago.
    /// A window reaching past the earliest representable date leaves only the
    /// never-contacted clients.
    pub fn inactive_clients(&self, days: i64, now: DateTime<Utc>) -> Vec<&Client> {
        let cutoff = Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.repo.filter(|client| {
            client.status == ClientStatus::Active
                && client.last_contact.map_or(true, |at| at < cutoff)
        })
    }

    /// Price after the client's discount rate.
    pub fn apply_discount(&self, id: Uuid, amount: f64) -> Result<f64> {
        self.repo
            .get(id)
            .map(|client| client.discounted(amount))
            .ok_or_else(|| QuoteError::not_found("Client", id))
    }

    pub fn count(&self) -> usize {
        self.repo.len()
    }

    pub fn active_count(&self) -> usize {
        self.list(Some(ClientStatus::Active)).len()
    }

    pub fn total_revenue(&self) -> f64 {
        self.repo.all().iter().map(|client| client.total_spent).sum()
    }

    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let rows: Vec<Vec<String>> = self
            .repo
            .all()
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.email.clone(),
                    c.phone.clone(),
                    c.company.clone(),
                    c.address.clone(),
                    c.status.to_string(),
                    c.total_spent.to_string(),
                    c.quote_count.to_string(),
                    c.discount_rate.to_string(),
                    c.preferred_filament.clone(),
                    c.notes.clone(),
                ]
            })
            .collect();
        csv_io::write_rows(path, CSV_HEADERS, &rows)?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::TempDir;

    fn manager() -> (ClientManager, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("storage");
        (ClientManager::new(Arc::new(storage)), temp)
    }

    #[test]
    fn search_finds_company_substring() {
        let (mut clients, _guard) = manager();
        let mut juan = Client::new("Juan");
        juan.company = "Empresa XYZ S.A.".into();
        clients.create_client(juan).expect("create");
        clients.create_client(Client::new("Ana")).expect("create");
        let found = clients.search("xyz");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Juan");
    }

    #[test]
    fn spending_updates_totals_and_ranking() {
        let (mut clients, _guard) = manager();
        let small = clients.create_client(Client::new("Small")).expect("create").id;
        let big = clients.create_client(Client::new("Big")).expect("create").id;
        clients.record_spending(small, 20.0).expect("spend");
        clients.record_spending(big, 150.0).expect("spend");
        let updated = clients.record_spending(big, 50.0).expect("spend");
        assert_eq!(updated.quote_count, 2);
        assert_eq!(updated.total_spent, 200.0);

        let top = clients.top_clients(1);
        assert_eq!(top[0].id, big);
        assert_eq!(clients.by_spending_range(10.0, Some(100.0)).len(), 1);
        let stats = clients.client_statistics(big, Utc::now()).expect("stats");
        assert_eq!(stats.average_order_value, 100.0);
        assert_eq!(clients.total_revenue(), 220.0);
    }

    #[test]
    fn inactivity_uses_last_contact() {
        let (mut clients, _guard) = manager();
        let now = Utc::now();
        let recent = clients.create_client(Client::new("Recent")).expect("create").id;
        let stale = clients.create_client(Client::new("Stale")).expect("create").id;
        clients.create_client(Client::new("Never")).expect("create");
        clients.update_last_contact(recent, now - Duration::days(3)).expect("contact");
        clients.update_last_contact(stale, now - Duration::days(90)).expect("contact");
        let names: Vec<&str> = clients
            .inactive_clients(30, now)
            .into_iter()
            .map(|client| client.name.as_str())
            .collect();
        assert_eq!(names, vec!["Stale", "Never"]);

        let names: Vec<&str> = clients
            .inactive_clients(1_000_000_000, now)
            .into_iter()
            .map(|client| client.name.as_str())
            .collect();
        assert_eq!(names, vec!["Never"]);
        assert_eq!(clients.inactive_clients(i64::MAX, now).len(), 1);
    }

    #[test]
    fn notes_and_discounts() {
        let (mut clients, _guard) = manager();
        let mut client = Client::new("Discounted");
        client.discount_rate = 10.0;
        let id = clients.create_client(client).expect("create").id;
        clients.add_note(id, "first call").expect("note");
        clients.add_note(id, "sent samples").expect("note");
        let notes = &clients.get(id).expect("client").notes;
        assert_eq!(notes.lines().count(), 2);
        assert!(notes.ends_with("sent samples"));
        assert_eq!(clients.apply_discount(id, 50.0).expect("discount"), 45.0);
        assert!(clients.add_note(Uuid::new_v4(), "ghost").is_err());
    }

    #[test]
    fn statistics_are_stable_without_changes() {
        let (mut clients, _guard) = manager();
        let now = Utc::now();
        let id = clients.create_client(Client::new("Repeat")).expect("create").id;
        clients.record_spending(id, 35.0).expect("spend");
        clients.record_spending(id, 15.0).expect("spend");
        assert_eq!(
            clients.client_statistics(id, now).expect("stats"),
            clients.client_statistics(id, now).expect("stats")
        );
        assert_eq!(clients.total_revenue(), clients.total_revenue());
    }
}
