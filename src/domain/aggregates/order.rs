//! Order Aggregate
//!
//! Read model of a placed order: only what revenue and retention metrics
//! need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: String,
    customer_id: Option<String>,
    status: OrderStatus,
    total: Money,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Completed, Draft, Archived, Canceled, RequiresAction }

impl OrderStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "draft" => Some(Self::Draft),
            "archived" => Some(Self::Archived),
            "canceled" | "cancelled" => Some(Self::Canceled),
            "requires_action" => Some(Self::RequiresAction),
            _ => None,
        }
    }
}

impl Order {
    pub fn new(id: impl Into<String>, customer_id: Option<String>, total: Money, created_at: DateTime<Utc>) -> Self {
        Self { id: id.into(), customer_id, status: OrderStatus::Pending, total, created_at }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self { self.status = status; self }

    pub fn id(&self) -> &str { &self.id }
    pub fn customer_id(&self) -> Option<&str> { self.customer_id.as_deref() }
    pub fn total(&self) -> &Money { &self.total }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Canceled orders and drafts never produced revenue.
    pub fn counts_toward_revenue(&self) -> bool {
        !matches!(self.status, OrderStatus::Canceled | OrderStatus::Draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_statuses() {
        let order = Order::new("order_1", Some("cus_1".into()), Money::usd(25_000), Utc::now());
        assert!(order.counts_toward_revenue());
        assert!(order.clone().with_status(OrderStatus::Completed).counts_toward_revenue());
        assert!(!order.clone().with_status(OrderStatus::Canceled).counts_toward_revenue());
        assert!(!order.with_status(OrderStatus::Draft).counts_toward_revenue());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatus::parse("cancelled"), Some(OrderStatus::Canceled));
        assert_eq!(OrderStatus::parse("requires_action"), Some(OrderStatus::RequiresAction));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
