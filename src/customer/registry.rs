/// Hot-reload customer registry using ArcSwap
///
/// The context middleware resolves a customer on every scoped request, so
/// lookups are served from an in-memory snapshot instead of the database.
/// Each change swaps the whole snapshot; in-flight requests keep the one they
/// loaded.

use crate::customer::{storage::CustomerStorage, types::Customer};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free customer registry
#[derive(Debug)]
pub struct CustomerRegistry {
    /// Atomic pointer to the customer map (customer_id -> Customer)
    customers: ArcSwap<HashMap<String, Customer>>,

    /// Persistent storage used for reloads
    storage: CustomerStorage,
}

impl CustomerRegistry {
    /// Create an empty registry backed by storage
    pub fn new(storage: CustomerStorage) -> Self {
        Self {
            customers: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
        }
    }

    /// Populate the registry with every stored customer
    pub async fn init_from_storage(&self) -> Result<()> {
        let customers = self.storage.load_all_customers().await?;
        self.customers.store(Arc::new(customers));

        tracing::info!("Initialized customer registry with {} customers", self.len());

        Ok(())
    }

    /// Re-read one customer from storage
    ///
    /// Drops the entry when the customer no longer exists.
    pub async fn reload_customer(&self, customer_id: &str) -> Result<()> {
        match self.storage.get_customer(customer_id).await? {
            Some(customer) => {
                let current = self.customers.load();
                let mut next = (**current).clone();
                next.insert(customer_id.to_string(), customer);
                self.customers.store(Arc::new(next));
                tracing::debug!("Reloaded customer into registry: {}", customer_id);
            }
            None => self.remove_customer(customer_id),
        }

        Ok(())
    }

    /// Remove a customer from the registry
    pub fn remove_customer(&self, customer_id: &str) {
        let current = self.customers.load();
        if !current.contains_key(customer_id) {
            return;
        }

        let mut next = (**current).clone();
        next.remove(customer_id);
        self.customers.store(Arc::new(next));
        tracing::debug!("Removed customer from registry: {}", customer_id);
    }

    /// Lock-free lookup by id
    pub fn get(&self, customer_id: &str) -> Option<Customer> {
        self.customers.load().get(customer_id).cloned()
    }

    /// All registered customer ids, sorted
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.customers.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.customers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::PlatformDatabase;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            projects: vec![],
            settings: serde_json::json!({}),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn tracks_storage_changes() {
        let db = PlatformDatabase::in_memory().await.unwrap();
        let storage = CustomerStorage::new(db.pool());
        storage.save_customer(&customer("cust-001", "Acme")).await.unwrap();

        let registry = CustomerRegistry::new(storage.clone());
        assert!(registry.is_empty());
        registry.init_from_storage().await.unwrap();
        assert_eq!(registry.list_ids(), vec!["cust-001".to_string()]);

        storage.save_customer(&customer("cust-002", "Globex")).await.unwrap();
        assert!(registry.get("cust-002").is_none());
        registry.reload_customer("cust-002").await.unwrap();
        assert_eq!(registry.get("cust-002").unwrap().name, "Globex");

        storage.delete_customer("cust-001").await.unwrap();
        registry.reload_customer("cust-001").await.unwrap();
        assert!(registry.get("cust-001").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn snapshots_survive_swaps() {
        let db = PlatformDatabase::in_memory().await.unwrap();
        let storage = CustomerStorage::new(db.pool());
        storage.save_customer(&customer("cust-001", "Acme")).await.unwrap();

        let registry = CustomerRegistry::new(storage);
        registry.init_from_storage().await.unwrap();

        let held = registry.get("cust-001").unwrap();
        registry.remove_customer("cust-001");
        registry.remove_customer("cust-001");
        assert_eq!(held.name, "Acme");
        assert!(registry.get("cust-001").is_none());
    }
}
