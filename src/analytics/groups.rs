//! The store's standard customer groups and the setup/summary views over them.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::aggregates::customer::{ACTIVE_CUSTOMER, AT_RISK, DORMANT, GUEST_PURCHASERS, NEW_CUSTOMER, VIP_CUSTOMER};
use crate::domain::aggregates::{CustomerGroup, GroupMetadata};

/// Metadata keys that carry a group's headline discount, in lookup order.
const DISCOUNT_KEYS: [&str; 7] = [
    "vip_discount",
    "loyalty_discount",
    "welcome_discount",
    "group_discount",
    "volume_discount",
    "seasonal_discount",
    "win_back_discount",
];

fn group(id: &str, name: &str, group_type: &str, description: &str, auto_segment: bool, benefits: &[&str], extra: Value) -> CustomerGroup {
    let mut extra = match extra {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    extra.insert("kct_segment".to_string(), Value::Bool(true));

    let mut group = CustomerGroup::new(id, name);
    group.metadata = GroupMetadata {
        description: description.to_string(),
        group_type: group_type.to_string(),
        auto_segment,
        benefits: benefits.iter().map(|b| b.to_string()).collect(),
        guest_tracking: vec![],
        extra,
    };
    group
}

/// Lifecycle, value, event and preference groups the analytics report on.
pub fn standard_groups() -> Vec<CustomerGroup> {
    vec![
        group("cg_guest_purchasers", GUEST_PURCHASERS, "guest_checkout", "Customers who completed guest checkout", true, &[], json!({
            "conversion_incentive": "10% off when you create an account",
            "conversion_target": NEW_CUSTOMER,
            "email_series": "guest_to_member",
            "tracking_enabled": true,
            "expected_conversion_rate": 0.45,
        })),
        group("cg_new_customer", NEW_CUSTOMER, "lifecycle", "First-time registered customers (0-30 days)", true,
            &["order_history", "saved_addresses", "wishlist", "size_profile"], json!({
            "duration_days": 30,
            "welcome_discount": 5,
            "email_series": "welcome_series",
            "next_segment": ACTIVE_CUSTOMER,
        })),
        group("cg_active_customer", ACTIVE_CUSTOMER, "lifecycle", "Regular customers with 2+ purchases", true,
            &["loyalty_points", "birthday_discount", "early_access"], json!({
            "min_purchases": 2,
            "loyalty_discount": 5,
            "next_segment": VIP_CUSTOMER,
        })),
        group("cg_vip_customer", VIP_CUSTOMER, "vip", "High-value customers ($2000+ annual or 5+ purchases)", true,
            &["10% base discount", "free_alterations", "priority_support", "exclusive_collections", "personal_stylist"], json!({
            "qualification_rules": { "annual_spend": 2000, "min_purchases": 5, "either_or": true },
            "vip_discount": 10,
            "free_shipping": true,
        })),
        group("cg_wedding_party", "Wedding Party", "event", "Wedding party group bookings", false,
            &["group_coordinator", "bulk_ordering", "synchronized_fittings", "event_timeline_tracking"], json!({
            "group_discount": 15,
            "min_party_size": 5,
            "coordinator_access": true,
        })),
        group("cg_prom_customer", "Prom Customer", "seasonal", "Prom and formal event shoppers", true,
            &["style_guide", "group_photos", "rush_alterations"], json!({
            "season": "prom",
            "trigger_categories": ["prom", "tuxedos", "formal"],
            "seasonal_discount": 10,
        })),
        group("cg_corporate", "Corporate Account", "b2b", "B2B and corporate clients", false,
            &["account_manager", "bulk_invoicing", "custom_catalog", "employee_accounts"], json!({
            "payment_terms": "net_30",
            "volume_discount": 20,
            "requires_approval": true,
        })),
        group("cg_at_risk", AT_RISK, "re_engagement", "Customers with no purchase in 90-180 days", true, &[], json!({
            "days_inactive_min": 90,
            "days_inactive_max": 180,
            "win_back_discount": 15,
            "email_series": "win_back_early",
            "risk_level": "medium",
        })),
        group("cg_dormant", DORMANT, "re_engagement", "Customers with no purchase in 180+ days", true, &[], json!({
            "days_inactive": 180,
            "win_back_discount": 20,
            "email_series": "win_back_aggressive",
            "risk_level": "high",
            "last_chance": true,
        })),
        group("cg_big_tall", "Big & Tall", "product_preference", "Customers shopping extended sizes", true,
            &["size_guarantee", "extended_catalog", "fit_consultation"], json!({
            "trigger_sizes": ["3XL", "4XL", "5XL", "48", "50", "52", "54"],
            "specialized_support": true,
        })),
        group("cg_measurement_saved", "Measurement Saved", "profile_complete", "Customers with complete measurement profiles", true,
            &["perfect_fit_guarantee", "virtual_fitting", "alteration_preview"], json!({
            "has_measurements": true,
            "conversion_boost": 0.4,
        })),
        group("cg_high_aov", "High AOV", "value_segment", "Customers with average order > $500", true,
            &["premium_support", "exclusive_offers", "concierge_service"], json!({
            "min_aov": 500,
            "expected_ltv": 2500,
        })),
    ]
}

/// Outcome of creating the standard groups, by group name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GroupSetupReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub failed: Vec<String>,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub customer_count: usize,
    #[serde(rename = "type")]
    pub group_type: String,
    pub auto_segment: bool,
    pub description: String,
    pub benefits: Vec<String>,
    /// Headline discount percent, 0 when the group has none.
    pub discount: i64,
}

impl From<&CustomerGroup> for GroupSummary {
    fn from(group: &CustomerGroup) -> Self {
        let m = &group.metadata;
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            customer_count: group.customer_count(),
            group_type: m.group_type.clone(),
            auto_segment: m.auto_segment,
            description: m.description.clone(),
            benefits: m.benefits.clone(),
            discount: DISCOUNT_KEYS.iter()
                .find_map(|key| m.extra.get(*key).and_then(Value::as_i64).filter(|d| *d != 0))
                .unwrap_or(0),
        }
    }
}

/// Whether the store-specific groups have been set up.
pub fn is_configured(summaries: &[GroupSummary]) -> bool {
    summaries.iter().any(|g| g.name.contains("VIP") || g.name.contains("Wedding"))
}
