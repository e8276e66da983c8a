//! Customer analytics and segmentation.
//!
//! Group-level revenue and conversion metrics, an overall overview with
//! recommendations, and per-customer lifetime value and churn risk. All
//! amounts are minor currency units.

pub mod groups;
pub mod recommendations;
pub mod segmentation;

pub use groups::{GroupSetupReport, GroupSummary};
pub use recommendations::{Priority, Recommendation, RecommendationKind};
pub use segmentation::{ChurnAssessment, ChurnRisk, CustomerMetrics, Segment, SegmentationThresholds};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::domain::aggregates::customer::{ACTIVE_CUSTOMER, AT_RISK, DORMANT, NEW_CUSTOMER, VIP_CUSTOMER};
use crate::domain::aggregates::{ConversionStatus, CustomerGroup, GroupMetadata, Order};
use crate::repository::{CustomerRepository, OrderRepository};
use crate::{CommerceError, Result};
use segmentation::rounded_average;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupMetrics {
    pub customer_count: usize,
    /// Percent, 0–100.
    pub conversion_rate: i64,
    pub avg_order_value: i64,
    pub total_revenue: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_orders: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_guests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_conversions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_guest_revenue: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupAnalytics {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub auto_segment: bool,
    pub benefits: Vec<String>,
    pub metrics: GroupMetrics,
    pub metadata: GroupMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SegmentDistribution {
    pub new_customers: usize,
    pub active_customers: usize,
    pub vip_customers: usize,
    pub at_risk: usize,
    pub dormant: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionFunnel {
    pub guests: usize,
    pub registered: usize,
    pub active: usize,
    pub vip: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OverallMetrics {
    pub total_customers: usize,
    pub total_orders: usize,
    pub total_revenue: i64,
    pub avg_order_value: i64,
    pub guest_conversion_rate: i64,
    pub total_groups: usize,
    pub automated_groups: usize,
    pub segment_distribution: SegmentDistribution,
    pub conversion_funnel: ConversionFunnel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsOverview {
    pub overview: OverallMetrics,
    pub groups: Vec<GroupAnalytics>,
    pub recommendations: Vec<Recommendation>,
}

pub struct CustomerAnalytics {
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    thresholds: SegmentationThresholds,
}

impl CustomerAnalytics {
    pub fn new(customers: Arc<dyn CustomerRepository>, orders: Arc<dyn OrderRepository>, thresholds: SegmentationThresholds) -> Self {
        Self { customers, orders, thresholds }
    }

    pub async fn customer_metrics(&self, customer_id: &str, now: DateTime<Utc>) -> Result<CustomerMetrics> {
        let customer = self.customers.find_customer(customer_id).await?
            .ok_or_else(|| CommerceError::CustomerNotFound(customer_id.to_string()))?;
        let orders = self.orders.list_orders_for_customers(&[customer.id.clone()]).await?;
        Ok(segmentation::customer_metrics(&customer.id, &orders, now, &self.thresholds))
    }

    pub async fn overview(&self, now: DateTime<Utc>) -> Result<AnalyticsOverview> {
        let groups = self.customers.list_customer_groups().await?;
        let mut group_analytics = Vec::with_capacity(groups.len());
        for group in groups {
            let orders = if group.is_guest_group() || group.customer_ids.is_empty() {
                vec![]
            } else {
                self.orders.list_orders_for_customers(&group.customer_ids).await?
            };
            group_analytics.push(analyze_group(group, &orders));
        }

        let total_customers = self.customers.list_customers().await?.len();
        let orders = self.orders.list_orders().await?;
        let overview = overall_metrics(total_customers, &orders, &group_analytics);
        let recommendations = recommendations::recommend(&overview, &group_analytics, now);
        debug!(groups = group_analytics.len(), recommendations = recommendations.len(), "customer analytics computed");

        Ok(AnalyticsOverview { overview, groups: group_analytics, recommendations })
    }

    /// Creates whichever standard groups are missing. A group that fails is
    /// logged and reported while the rest still run.
    pub async fn setup_customer_groups(&self) -> GroupSetupReport {
        let standard = groups::standard_groups();
        let mut report = GroupSetupReport { total: standard.len(), ..Default::default() };
        for group in standard {
            let name = group.name.clone();
            match self.customers.create_customer_group(group).await {
                Ok(true) => report.created.push(name),
                Ok(false) => report.existing.push(name),
                Err(e) => {
                    error!(group = %name, error = %e, "failed to create customer group");
                    report.failed.push(name);
                }
            }
        }
        info!(created = report.created.len(), existing = report.existing.len(), failed = report.failed.len(), "customer groups set up");
        report
    }

    pub async fn group_summaries(&self) -> Result<Vec<GroupSummary>> {
        Ok(self.customers.list_customer_groups().await?.iter().map(GroupSummary::from).collect())
    }
}

/// Guest groups report conversion from their tracking metadata; other groups
/// report revenue from their members' orders.
pub fn analyze_group(group: CustomerGroup, member_orders: &[Order]) -> GroupAnalytics {
    let mut metrics = GroupMetrics { customer_count: group.customer_count(), ..Default::default() };

    if group.is_guest_group() {
        let tracking = &group.metadata.guest_tracking;
        let converted = tracking.iter().filter(|g| g.conversion_status == ConversionStatus::Converted).count();
        metrics.total_guests = Some(tracking.len());
        metrics.converted_count = Some(converted);
        metrics.conversion_rate = percent(converted, tracking.len());
        metrics.pending_conversions = Some(tracking.iter().filter(|g| g.conversion_status == ConversionStatus::Pending).count());
        metrics.total_guest_revenue = Some(tracking.iter().map(|g| g.order_total).sum());
    } else if metrics.customer_count > 0 {
        let counted: Vec<&Order> = member_orders.iter().filter(|o| o.counts_toward_revenue()).collect();
        metrics.total_revenue = counted.iter().map(|o| o.total().amount()).sum();
        metrics.avg_order_value = rounded_average(metrics.total_revenue, counted.len());
        metrics.total_orders = Some(counted.len());
    }

    let metadata = group.metadata;
    GroupAnalytics {
        id: group.id,
        name: group.name,
        description: metadata.description.clone(),
        group_type: metadata.group_type.clone(),
        auto_segment: metadata.auto_segment,
        benefits: metadata.benefits.clone(),
        metrics,
        metadata,
    }
}

/// `total_orders` counts every order; revenue and average order value only
/// cover orders that produced revenue.
pub fn overall_metrics(total_customers: usize, orders: &[Order], groups: &[GroupAnalytics]) -> OverallMetrics {
    let counted: Vec<&Order> = orders.iter().filter(|o| o.counts_toward_revenue()).collect();
    let total_revenue: i64 = counted.iter().map(|o| o.total().amount()).sum();
    let members = |name: &str| groups.iter().find(|g| g.name == name).map_or(0, |g| g.metrics.customer_count);
    let guests = groups.iter().find(|g| g.metrics.total_guests.is_some());

    OverallMetrics {
        total_customers,
        total_orders: orders.len(),
        total_revenue,
        avg_order_value: rounded_average(total_revenue, counted.len()),
        guest_conversion_rate: guests.map_or(0, |g| g.metrics.conversion_rate),
        total_groups: groups.len(),
        automated_groups: groups.iter().filter(|g| g.auto_segment).count(),
        segment_distribution: SegmentDistribution {
            new_customers: members(NEW_CUSTOMER),
            active_customers: members(ACTIVE_CUSTOMER),
            vip_customers: members(VIP_CUSTOMER),
            at_risk: members(AT_RISK),
            dormant: members(DORMANT),
        },
        conversion_funnel: ConversionFunnel {
            guests: guests.and_then(|g| g.metrics.total_guests).unwrap_or(0),
            registered: total_customers,
            active: members(ACTIVE_CUSTOMER),
            vip: members(VIP_CUSTOMER),
        },
    }
}

fn percent(part: usize, whole: usize) -> i64 {
    if whole == 0 { return 0; }
    (part as f64 / whole as f64 * 100.0).round() as i64
}
