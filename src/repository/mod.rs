//! Customer and order storage behind traits so analytics can run against
//! Postgres in production and memory in tests.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::domain::aggregates::{Customer, CustomerGroup, Order};
use crate::Result;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_customer(&self, id: &str) -> Result<Option<Customer>>;
    async fn list_customers(&self) -> Result<Vec<Customer>>;
    /// Groups with their member ids populated.
    async fn list_customer_groups(&self) -> Result<Vec<CustomerGroup>>;
    /// Stores the group unless one with the same id or name exists. Returns
    /// whether it was created.
    async fn create_customer_group(&self, group: CustomerGroup) -> Result<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<Order>>;
    async fn list_orders_for_customers(&self, customer_ids: &[String]) -> Result<Vec<Order>>;
}
