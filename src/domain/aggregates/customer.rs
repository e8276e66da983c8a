//! Customer and Customer Group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GUEST_PURCHASERS: &str = "Guest Purchasers";
pub const NEW_CUSTOMER: &str = "New Customer";
pub const ACTIVE_CUSTOMER: &str = "Active Customer";
pub const VIP_CUSTOMER: &str = "VIP Customer";
pub const AT_RISK: &str = "At Risk";
pub const DORMANT: &str = "Dormant";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub has_account: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerGroup {
    pub id: String,
    pub name: String,
    pub metadata: GroupMetadata,
    pub customer_ids: Vec<String>,
}

impl CustomerGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), metadata: GroupMetadata::default(), customer_ids: vec![] }
    }

    pub fn with_members(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.customer_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn customer_count(&self) -> usize { self.customer_ids.len() }
    pub fn is_guest_group(&self) -> bool { self.name == GUEST_PURCHASERS }
}

/// Group metadata as stored in the JSON column; absent keys take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMetadata {
    pub description: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub auto_segment: bool,
    pub benefits: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guest_tracking: Vec<GuestRecord>,
    /// Keys this service does not interpret (discounts, rules, campaign
    /// settings), kept as stored.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self { description: String::new(), group_type: "manual".to_string(), auto_segment: false, benefits: vec![], guest_tracking: vec![], extra: serde_json::Map::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    #[serde(default)]
    pub email: Option<String>,
    pub conversion_status: ConversionStatus,
    /// Minor units.
    #[serde(default)]
    pub order_total: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Converted,
    Pending,
    #[serde(other)]
    Other,
}
