use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CustomerRepository, OrderRepository};
use crate::domain::aggregates::{Customer, CustomerGroup, Order};
use crate::Result;

/// Process-local store, used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    customers: RwLock<Vec<Customer>>,
    groups: RwLock<Vec<CustomerGroup>>,
    orders: RwLock<Vec<Order>>,
}

impl InMemoryStore {
    pub async fn insert_customer(&self, customer: Customer) {
        let mut customers = self.customers.write().await;
        customers.retain(|c| c.id != customer.id);
        customers.push(customer);
    }

    pub async fn insert_group(&self, group: CustomerGroup) {
        let mut groups = self.groups.write().await;
        groups.retain(|g| g.id != group.id);
        groups.push(group);
    }

    pub async fn insert_order(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.retain(|o| o.id() != order.id());
        orders.push(order);
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn find_customer(&self, id: &str) -> Result<Option<Customer>> {
        Ok(self.customers.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.customers.read().await.clone())
    }

    async fn list_customer_groups(&self) -> Result<Vec<CustomerGroup>> {
        Ok(self.groups.read().await.clone())
    }

    async fn create_customer_group(&self, group: CustomerGroup) -> Result<bool> {
        let mut groups = self.groups.write().await;
        if groups.iter().any(|g| g.id == group.id || g.name == group.name) {
            return Ok(false);
        }
        groups.push(group);
        Ok(true)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.clone())
    }

    async fn list_orders_for_customers(&self, customer_ids: &[String]) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.iter()
            .filter(|o| o.customer_id().is_some_and(|id| customer_ids.iter().any(|c| c == id)))
            .cloned()
            .collect())
    }
}
