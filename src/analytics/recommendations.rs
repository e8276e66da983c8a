//! Actionable recommendations derived from group analytics.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::{GroupAnalytics, OverallMetrics};
use crate::domain::aggregates::customer::{ACTIVE_CUSTOMER, AT_RISK, DORMANT, GUEST_PURCHASERS, VIP_CUSTOMER};

const LOW_GUEST_CONVERSION_PCT: i64 = 30;
const PENDING_GUESTS_ALERT: usize = 10;
const AT_RISK_ALERT: usize = 20;
const DORMANT_ALERT: usize = 50;
const VIP_TARGET_RATIO: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority { High, Medium }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind { Conversion, Retention, Growth, Seasonal }

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub action: String,
    pub potential_impact: String,
}

impl Recommendation {
    fn new(priority: Priority, kind: RecommendationKind, title: &str, description: String, action: &str, potential_impact: String) -> Self {
        Self { priority, kind, title: title.to_string(), description, action: action.to_string(), potential_impact }
    }
}

pub fn recommend(overall: &OverallMetrics, groups: &[GroupAnalytics], now: DateTime<Utc>) -> Vec<Recommendation> {
    let find = |name: &str| groups.iter().find(|g| g.name == name);
    let mut out = Vec::new();

    if let Some(guests) = find(GUEST_PURCHASERS) {
        let rate = guests.metrics.conversion_rate;
        if rate < LOW_GUEST_CONVERSION_PCT {
            out.push(Recommendation::new(
                Priority::High, RecommendationKind::Conversion, "Improve Guest Conversion",
                format!("Your guest conversion rate is {rate}%. Industry average is 40-50%."),
                "Consider increasing the welcome discount or simplifying account creation",
                format!("Could add {} in revenue", dollars(guests.metrics.total_guest_revenue.unwrap_or(0), 0.2)),
            ));
        }
        let pending = guests.metrics.pending_conversions.unwrap_or(0);
        if pending > PENDING_GUESTS_ALERT {
            out.push(Recommendation::new(
                Priority::Medium, RecommendationKind::Conversion, "Pending Guest Conversions",
                format!("You have {pending} guests who haven't converted yet"),
                "Send targeted email campaign with personalized offers",
                format!("{} potential new members", (pending as f64 * 0.4).round() as i64),
            ));
        }
    }

    if let Some(at_risk) = find(AT_RISK).filter(|g| g.metrics.customer_count > AT_RISK_ALERT) {
        out.push(Recommendation::new(
            Priority::High, RecommendationKind::Retention, "At-Risk Customers Need Attention",
            format!("{} customers haven't purchased in 90-180 days", at_risk.metrics.customer_count),
            "Launch win-back campaign with 15% discount",
            format!("Prevent {} in lost revenue", dollars(at_risk.metrics.total_revenue, 0.3)),
        ));
    }

    if let Some(dormant) = find(DORMANT).filter(|g| g.metrics.customer_count > DORMANT_ALERT) {
        let count = dormant.metrics.customer_count;
        out.push(Recommendation::new(
            Priority::Medium, RecommendationKind::Retention, "Reactivate Dormant Customers",
            format!("{count} customers are dormant (180+ days)"),
            "Send 'We miss you' campaign with 20% discount",
            format!("Could recover {} customers", (count as f64 * 0.1).round() as i64),
        ));
    }

    if let (Some(_), Some(vip)) = (find(ACTIVE_CUSTOMER), find(VIP_CUSTOMER)) {
        let ratio = vip.metrics.customer_count as f64 / overall.total_customers.max(1) as f64;
        if ratio < VIP_TARGET_RATIO {
            out.push(Recommendation::new(
                Priority::Medium, RecommendationKind::Growth, "Grow VIP Segment",
                format!("Only {}% of customers are VIP. Target is 5-10%.", (ratio * 100.0).round() as i64),
                "Create VIP upgrade campaign for active customers",
                "Increase customer LTV by 40%".to_string(),
            ));
        }
    }

    let month = now.month0();
    if (2..=5).contains(&month) {
        out.push(Recommendation::new(
            Priority::High, RecommendationKind::Seasonal, "Prom Season Opportunity",
            "Prom season is active (March-June)".to_string(),
            "Promote group bookings and early bird discounts",
            "Prom typically drives 25% of annual formal wear revenue".to_string(),
        ));
    }
    if (8..=11).contains(&month) {
        out.push(Recommendation::new(
            Priority::High, RecommendationKind::Seasonal, "Wedding Season Marketing",
            "Peak wedding season approaching".to_string(),
            "Target wedding party groups with bulk discounts",
            "Wedding parties average $3,000-5,000 per event".to_string(),
        ));
    }

    out
}

/// Share of a minor-unit amount, formatted as whole dollars.
fn dollars(minor: i64, share: f64) -> String {
    format!("${}", (minor as f64 * share / 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::GroupMetrics;
    use crate::domain::aggregates::GroupMetadata;
    use chrono::TimeZone;

    fn group(name: &str, metrics: GroupMetrics) -> GroupAnalytics {
        GroupAnalytics {
            id: format!("cusgroup_{name}"), name: name.to_string(), description: String::new(), group_type: "manual".into(),
            auto_segment: true, benefits: vec![], metrics, metadata: GroupMetadata::default(),
        }
    }

    fn members(count: usize) -> GroupMetrics { GroupMetrics { customer_count: count, ..Default::default() } }

    fn at(month: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, month, 15, 0, 0, 0).unwrap() }

    #[test]
    fn test_guest_conversion_recommendations() {
        let guests = group(GUEST_PURCHASERS, GroupMetrics {
            conversion_rate: 20, pending_conversions: Some(12), total_guest_revenue: Some(1_000_000), ..Default::default()
        });
        let recs = recommend(&OverallMetrics::default(), &[guests], at(1));
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title, "Improve Guest Conversion");
        assert_eq!(recs[0].description, "Your guest conversion rate is 20%. Industry average is 40-50%.");
        assert_eq!(recs[0].potential_impact, "Could add $2000 in revenue");
        assert_eq!(recs[1].potential_impact, "5 potential new members");
    }

    #[test]
    fn test_retention_thresholds() {
        let recs = recommend(&OverallMetrics::default(), &[group(AT_RISK, members(20)), group(DORMANT, members(51))], at(1));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Reactivate Dormant Customers");
        assert_eq!(recs[0].potential_impact, "Could recover 5 customers");
    }

    #[test]
    fn test_vip_growth_needs_both_groups() {
        let overall = OverallMetrics { total_customers: 100, ..Default::default() };
        assert!(recommend(&overall, &[group(VIP_CUSTOMER, members(1))], at(1)).is_empty());
        let recs = recommend(&overall, &[group(ACTIVE_CUSTOMER, members(30)), group(VIP_CUSTOMER, members(4))], at(1));
        assert_eq!(recs[0].description, "Only 4% of customers are VIP. Target is 5-10%.");
    }

    #[test]
    fn test_seasonal() {
        let title = |month| recommend(&OverallMetrics::default(), &[], at(month)).into_iter().map(|r| r.title).collect::<Vec<_>>();
        assert_eq!(title(4), vec!["Prom Season Opportunity"]);
        assert_eq!(title(10), vec!["Wedding Season Marketing"]);
        assert!(title(8).is_empty());
    }
}
