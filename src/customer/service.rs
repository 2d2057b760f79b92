/// Customer management operations
///
/// Validates requests, enforces exclusive project ownership, persists changes
/// and keeps the in-memory registry in step with storage.

use crate::customer::{
    registry::CustomerRegistry,
    storage::{unique_violation, CustomerStorage, UniqueViolation},
    types::{
        generate_customer_id, is_valid_id, CreateCustomerRequest, Customer, UpdateCustomerRequest,
        MAX_NAME_LEN,
    },
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Path segment used by GET /customers/current
const RESERVED_CUSTOMER_ID: &str = "current";

/// Failures of customer operations
#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("customer storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type CustomerResult<T> = std::result::Result<T, CustomerError>;

/// Customer service shared by the API handlers
#[derive(Debug, Clone)]
pub struct CustomerService {
    storage: CustomerStorage,
    registry: Arc<CustomerRegistry>,
}

impl CustomerService {
    pub fn new(storage: CustomerStorage, registry: Arc<CustomerRegistry>) -> Self {
        Self { storage, registry }
    }

    pub fn registry(&self) -> &Arc<CustomerRegistry> {
        &self.registry
    }

    pub async fn list(&self) -> CustomerResult<Vec<Customer>> {
        Ok(self.storage.list_customers().await?)
    }

    pub async fn get(&self, customer_id: &str) -> CustomerResult<Customer> {
        self.storage
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| customer_not_found(customer_id))
    }

    /// Customer currently owning a project
    pub async fn project_owner(&self, project_id: i64) -> CustomerResult<Option<String>> {
        Ok(self.storage.project_owner(project_id).await?)
    }

    /// Create a customer, optionally with an initial set of projects
    pub async fn create(&self, request: CreateCustomerRequest) -> CustomerResult<Customer> {
        let name = validate_name(&request.name)?;
        let id = match request.id {
            Some(id) => {
                let id = id.trim().to_string();
                if id == RESERVED_CUSTOMER_ID {
                    return Err(CustomerError::Invalid(format!(
                        "Customer id '{}' is reserved",
                        id
                    )));
                }
                if !is_valid_id(&id) {
                    return Err(CustomerError::Invalid(format!(
                        "Invalid customer id '{}': use lowercase letters, digits, '-' or '_'",
                        id
                    )));
                }
                id
            }
            None => generate_customer_id(),
        };

        if self.storage.get_customer(&id).await?.is_some() {
            return Err(CustomerError::Conflict(format!("Customer '{}' already exists", id)));
        }
        if self.storage.find_by_name(&name).await?.is_some() {
            return Err(CustomerError::Conflict(format!(
                "Customer name '{}' is already in use",
                name
            )));
        }

        let settings = validate_settings(request.settings)?;
        let projects = self
            .check_assignable(&id, request.projects.unwrap_or_default())
            .await?;

        let customer = Customer {
            id: id.clone(),
            name,
            description: request.description.unwrap_or_default().trim().to_string(),
            projects: Vec::new(),
            settings,
            created_at: String::new(),
            updated_at: String::new(),
        };
        if let Err(err) = self.storage.insert_customer(&customer, &projects).await {
            let err = write_error(err, &customer);
            return Err(self.settle(&id, err).await);
        }

        let created = self.refresh(&id).await?;
        tracing::info!(
            "🏢 Created customer: {} ({}) with {} projects",
            created.id,
            created.name,
            created.projects.len()
        );
        Ok(created)
    }

    /// Update name, description or settings of an existing customer
    pub async fn update(
        &self,
        customer_id: &str,
        request: UpdateCustomerRequest,
    ) -> CustomerResult<Customer> {
        let mut customer = self.get(customer_id).await?;

        if let Some(name) = request.name {
            let name = validate_name(&name)?;
            if let Some(owner) = self.storage.find_by_name(&name).await? {
                if owner != customer.id {
                    return Err(CustomerError::Conflict(format!(
                        "Customer name '{}' is already in use",
                        name
                    )));
                }
            }
            customer.name = name;
        }
        if let Some(description) = request.description {
            customer.description = description.trim().to_string();
        }
        if request.settings.is_some() {
            customer.settings = validate_settings(request.settings)?;
        }

        if let Err(err) = self.storage.save_customer(&customer).await {
            let err = write_error(err, &customer);
            return Err(self.settle(customer_id, err).await);
        }
        let updated = self.refresh(customer_id).await?;
        tracing::info!("🏢 Updated customer: {} ({})", updated.id, updated.name);
        Ok(updated)
    }

    /// Delete a customer together with everything it owns
    pub async fn delete(&self, customer_id: &str) -> CustomerResult<()> {
        if !self.storage.delete_customer(customer_id).await? {
            return Err(customer_not_found(customer_id));
        }
        self.registry.remove_customer(customer_id);
        tracing::info!("🗑️ Deleted customer: {}", customer_id);
        Ok(())
    }

    /// Give a customer ownership of a project
    ///
    /// Re-attaching a project the customer already owns is a no-op.
    pub async fn attach_project(&self, customer_id: &str, project_id: i64) -> CustomerResult<Customer> {
        let customer = self.get(customer_id).await?;
        if !self.storage.project_exists(project_id).await? {
            return Err(project_not_found(project_id));
        }

        match self.storage.project_owner(project_id).await? {
            Some(owner) if owner == customer.id => return Ok(customer),
            Some(owner) => {
                return Err(CustomerError::Conflict(format!(
                    "Project {} already belongs to customer '{}'",
                    project_id, owner
                )))
            }
            None => {}
        }

        if let Err(err) = self.storage.attach_project(customer_id, project_id).await {
            let err = write_error(err, &customer);
            return Err(self.settle(customer_id, err).await);
        }
        let updated = self.refresh(customer_id).await?;
        tracing::info!("🔗 Attached project {} to customer {}", project_id, customer_id);
        Ok(updated)
    }

    /// Remove a project from a customer
    pub async fn detach_project(&self, customer_id: &str, project_id: i64) -> CustomerResult<Customer> {
        self.get(customer_id).await?;
        if !self.storage.detach_project(customer_id, project_id).await? {
            return Err(CustomerError::NotFound(format!(
                "Project {} is not assigned to customer '{}'",
                project_id, customer_id
            )));
        }

        let updated = self.refresh(customer_id).await?;
        tracing::info!("✂️ Detached project {} from customer {}", project_id, customer_id);
        Ok(updated)
    }

    /// Replace the whole project set of a customer
    pub async fn replace_projects(
        &self,
        customer_id: &str,
        project_ids: Vec<i64>,
    ) -> CustomerResult<Customer> {
        let customer = self.get(customer_id).await?;
        let projects = self.check_assignable(customer_id, project_ids).await?;

        if let Err(err) = self.storage.replace_projects(customer_id, &projects).await {
            let err = write_error(err, &customer);
            return Err(self.settle(customer_id, err).await);
        }
        let updated = self.refresh(customer_id).await?;
        tracing::info!(
            "🔗 Customer {} now owns projects {:?}",
            customer_id,
            updated.projects
        );
        Ok(updated)
    }

    /// Deduplicate project ids and check each can be owned by the customer
    async fn check_assignable(&self, customer_id: &str, project_ids: Vec<i64>) -> CustomerResult<Vec<i64>> {
        let unique: BTreeSet<i64> = project_ids.into_iter().collect();
        for project_id in &unique {
            if !self.storage.project_exists(*project_id).await? {
                return Err(project_not_found(*project_id));
            }
            if let Some(owner) = self.storage.project_owner(*project_id).await? {
                if owner != customer_id {
                    return Err(CustomerError::Conflict(format!(
                        "Project {} already belongs to customer '{}'",
                        project_id, owner
                    )));
                }
            }
        }
        Ok(unique.into_iter().collect())
    }

    /// Bring the registry entry back in step with storage after a failed write
    async fn settle(&self, customer_id: &str, err: CustomerError) -> CustomerError {
        if let Err(reload_err) = self.registry.reload_customer(customer_id).await {
            tracing::warn!(
                "⚠️ Could not reload customer {} after failed write: {:#}",
                customer_id,
                reload_err
            );
        }
        err
    }

    /// Reload a customer into the registry and return the stored state
    async fn refresh(&self, customer_id: &str) -> CustomerResult<Customer> {
        self.registry.reload_customer(customer_id).await?;
        self.get(customer_id).await
    }
}

fn validate_name(name: &str) -> CustomerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CustomerError::Invalid("Customer name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CustomerError::Invalid(format!(
            "Customer name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_settings(settings: Option<Value>) -> CustomerResult<Value> {
    match settings {
        None | Some(Value::Null) => Ok(Value::Object(Default::default())),
        Some(Value::Object(map)) => Ok(Value::Object(map)),
        Some(_) => Err(CustomerError::Invalid(
            "Customer settings must be a JSON object".to_string(),
        )),
    }
}

/// Turn a broken uniqueness rule into a conflict; anything else is a storage failure
fn write_error(err: anyhow::Error, customer: &Customer) -> CustomerError {
    match unique_violation(&err) {
        Some(UniqueViolation::CustomerId) => {
            CustomerError::Conflict(format!("Customer '{}' already exists", customer.id))
        }
        Some(UniqueViolation::CustomerName) => CustomerError::Conflict(format!(
            "Customer name '{}' is already in use",
            customer.name
        )),
        Some(UniqueViolation::ProjectOwner) => CustomerError::Conflict(
            "A requested project already belongs to another customer".to_string(),
        ),
        None => CustomerError::Storage(err),
    }
}

fn customer_not_found(customer_id: &str) -> CustomerError {
    CustomerError::NotFound(format!("Customer '{}' not found", customer_id))
}

fn project_not_found(project_id: i64) -> CustomerError {
    CustomerError::NotFound(format!("Project {} not found", project_id))
}
