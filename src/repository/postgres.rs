use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use super::{CustomerRepository, OrderRepository};
use crate::domain::aggregates::{Customer, CustomerGroup, GroupMetadata, Order, OrderStatus};
use crate::domain::value_objects::Money;
use crate::{CommerceError, Result};

#[derive(Clone, Debug)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow { id: String, email: String, first_name: Option<String>, last_name: Option<String>, has_account: bool, created_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct GroupRow { id: String, name: String, metadata: serde_json::Value }

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow { customer_group_id: String, customer_id: String }

#[derive(Debug, sqlx::FromRow)]
struct OrderRow { id: String, customer_id: Option<String>, status: String, currency_code: String, total: i64, created_at: DateTime<Utc> }

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer { id: r.id, email: r.email, first_name: r.first_name, last_name: r.last_name, has_account: r.has_account, created_at: r.created_at }
    }
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        let status = OrderStatus::parse(&r.status).unwrap_or_else(|| {
            warn!(order_id = %r.id, status = %r.status, "unknown order status, treating as pending");
            OrderStatus::Pending
        });
        Order::new(r.id, r.customer_id, Money::new(r.total, &r.currency_code), r.created_at).with_status(status)
    }
}

fn storage(e: sqlx::Error) -> CommerceError { CommerceError::Storage(e.to_string()) }

const ORDER_COLUMNS: &str = "id, customer_id, status, currency_code, total, created_at";

#[async_trait]
impl CustomerRepository for PgStore {
    async fn find_customer(&self, id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>("SELECT id, email, first_name, last_name, has_account, created_at FROM customers WHERE id = $1 AND deleted_at IS NULL")
            .bind(id).fetch_optional(&self.pool).await.map_err(storage)?;
        Ok(row.map(Customer::from))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>("SELECT id, email, first_name, last_name, has_account, created_at FROM customers WHERE deleted_at IS NULL ORDER BY created_at DESC")
            .fetch_all(&self.pool).await.map_err(storage)?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn list_customer_groups(&self) -> Result<Vec<CustomerGroup>> {
        let groups = sqlx::query_as::<_, GroupRow>("SELECT id, name, metadata FROM customer_groups WHERE deleted_at IS NULL ORDER BY created_at")
            .fetch_all(&self.pool).await.map_err(storage)?;
        let memberships = sqlx::query_as::<_, MembershipRow>("SELECT customer_group_id, customer_id FROM customer_group_customers")
            .fetch_all(&self.pool).await.map_err(storage)?;

        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        for m in memberships {
            members.entry(m.customer_group_id).or_default().push(m.customer_id);
        }

        Ok(groups.into_iter().map(|g| {
            let metadata = serde_json::from_value::<GroupMetadata>(g.metadata).unwrap_or_else(|e| {
                warn!(group_id = %g.id, error = %e, "unreadable group metadata, using defaults");
                GroupMetadata::default()
            });
            let customer_ids = members.remove(&g.id).unwrap_or_default();
            CustomerGroup { id: g.id, name: g.name, metadata, customer_ids }
        }).collect())
    }

    async fn create_customer_group(&self, group: CustomerGroup) -> Result<bool> {
        let metadata = serde_json::to_value(&group.metadata).map_err(|e| CommerceError::Storage(e.to_string()))?;
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let inserted = sqlx::query("INSERT INTO customer_groups (id, name, metadata) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(&group.id).bind(&group.name).bind(metadata)
            .execute(&mut *tx).await.map_err(storage)?
            .rows_affected() == 1;
        if inserted {
            for customer_id in &group.customer_ids {
                sqlx::query("INSERT INTO customer_group_customers (customer_group_id, customer_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                    .bind(&group.id).bind(customer_id)
                    .execute(&mut *tx).await.map_err(storage)?;
            }
        }
        tx.commit().await.map_err(storage)?;
        Ok(inserted)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await.map_err(storage)?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_orders_for_customers(&self, customer_ids: &[String]) -> Result<Vec<Order>> {
        if customer_ids.is_empty() { return Ok(vec![]); }
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ANY($1) ORDER BY created_at DESC"))
            .bind(customer_ids).fetch_all(&self.pool).await.map_err(storage)?;
        Ok(rows.into_iter().map(Order::from).collect())
    }
}
