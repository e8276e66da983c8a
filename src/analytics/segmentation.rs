//! Per-customer lifetime value, purchase frequency, churn risk and segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Order;

const DAYS_PER_MONTH: f64 = 30.0;

/// Business thresholds for segmentation. Money values in minor units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationThresholds {
    /// CLV strictly above this makes a customer VIP.
    pub vip_min_clv: i64,
    pub active_max_days: i64,
    pub at_risk_max_days: i64,
    /// First order within this many days counts as a new customer.
    pub new_customer_days: i64,
    pub high_risk_score: u8,
    pub medium_risk_score: u8,
}

impl Default for SegmentationThresholds {
    fn default() -> Self {
        Self {
            vip_min_clv: 500_000,
            active_max_days: 90,
            at_risk_max_days: 180,
            new_customer_days: 30,
            high_risk_score: 70,
            medium_risk_score: 40,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment { Prospect, New, Active, Vip, AtRisk, Dormant }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnRisk { Low, Medium, High }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChurnAssessment {
    pub score: u8,
    pub level: ChurnRisk,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    pub lifetime_value: i64,
    pub order_count: usize,
    pub avg_order_value: i64,
    /// Orders per 30-day month since the first order.
    pub order_frequency: f64,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub days_since_last_order: Option<i64>,
    pub churn: Option<ChurnAssessment>,
    pub segment: Segment,
}

pub fn customer_metrics(customer_id: &str, orders: &[Order], now: DateTime<Utc>, t: &SegmentationThresholds) -> CustomerMetrics {
    let counted: Vec<&Order> = orders.iter().filter(|o| o.counts_toward_revenue()).collect();
    let lifetime_value: i64 = counted.iter().map(|o| o.total().amount()).sum();
    let order_count = counted.len();
    let first_order_at = counted.iter().map(|o| o.created_at()).min();
    let last_order_at = counted.iter().map(|o| o.created_at()).max();
    let days_since_last_order = last_order_at.map(|at| (now - at).num_days().max(0));

    let order_frequency = match first_order_at {
        Some(first) => {
            let months = ((now - first).num_days().max(0) as f64 / DAYS_PER_MONTH).max(1.0);
            round2(order_count as f64 / months)
        }
        None => 0.0,
    };

    let churn = days_since_last_order.map(|days| assess_churn(days, order_frequency, t));
    let segment = segment_for(lifetime_value, first_order_at, days_since_last_order, now, t);

    CustomerMetrics {
        customer_id: customer_id.to_string(),
        lifetime_value,
        order_count,
        avg_order_value: rounded_average(lifetime_value, order_count),
        order_frequency,
        first_order_at,
        last_order_at,
        days_since_last_order,
        churn,
        segment,
    }
}

/// Recency drives the score: 0–40 while active, 40–80 while at risk, up to
/// 100 once dormant. Customers buying at least monthly get 10 points off.
pub fn assess_churn(days_since_last_order: i64, order_frequency: f64, t: &SegmentationThresholds) -> ChurnAssessment {
    let days = days_since_last_order.max(0) as f64;
    let active = t.active_max_days.max(1) as f64;
    let at_risk = t.at_risk_max_days.max(t.active_max_days + 1) as f64;

    let mut score = if days <= active {
        days / active * 40.0
    } else if days <= at_risk {
        40.0 + (days - active) / (at_risk - active) * 40.0
    } else {
        (80.0 + (days - at_risk) / 9.0).min(100.0)
    };
    if order_frequency >= 1.0 {
        score = (score - 10.0).max(0.0);
    }
    let score = score.round() as u8;

    let level = if score >= t.high_risk_score {
        ChurnRisk::High
    } else if score >= t.medium_risk_score {
        ChurnRisk::Medium
    } else {
        ChurnRisk::Low
    };
    ChurnAssessment { score, level }
}

fn segment_for(
    lifetime_value: i64,
    first_order_at: Option<DateTime<Utc>>,
    days_since_last_order: Option<i64>,
    now: DateTime<Utc>,
    t: &SegmentationThresholds,
) -> Segment {
    let (Some(first), Some(recency)) = (first_order_at, days_since_last_order) else {
        return Segment::Prospect;
    };
    if lifetime_value > t.vip_min_clv {
        Segment::Vip
    } else if recency <= t.active_max_days && (now - first).num_days() <= t.new_customer_days {
        Segment::New
    } else if recency <= t.active_max_days {
        Segment::Active
    } else if recency <= t.at_risk_max_days {
        Segment::AtRisk
    } else {
        Segment::Dormant
    }
}

pub(crate) fn rounded_average(total: i64, count: usize) -> i64 {
    if count == 0 { return 0; }
    (total as f64 / count as f64).round() as i64
}

fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;
    use crate::domain::value_objects::Money;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap() }

    fn order(id: &str, total: i64, days_ago: i64) -> Order {
        Order::new(id, Some("cus_1".into()), Money::usd(total), now() - Duration::days(days_ago))
    }

    #[test]
    fn test_no_orders_is_prospect() {
        let m = customer_metrics("cus_1", &[], now(), &SegmentationThresholds::default());
        assert_eq!(m.segment, Segment::Prospect);
        assert_eq!(m.lifetime_value, 0);
        assert_eq!(m.avg_order_value, 0);
        assert_eq!(m.order_frequency, 0.0);
        assert!(m.churn.is_none());
    }

    #[test]
    fn test_clv_excludes_canceled_orders() {
        let orders = vec![
            order("o1", 40_000, 200),
            order("o2", 25_000, 100),
            order("o3", 90_000, 10).with_status(OrderStatus::Canceled),
        ];
        let m = customer_metrics("cus_1", &orders, now(), &SegmentationThresholds::default());
        assert_eq!(m.lifetime_value, 65_000);
        assert_eq!(m.order_count, 2);
        assert_eq!(m.avg_order_value, 32_500);
        assert_eq!(m.days_since_last_order, Some(100));
        assert_eq!(m.segment, Segment::AtRisk);
    }

    #[test]
    fn test_frequency_is_orders_per_month() {
        let orders = vec![order("o1", 10_000, 90), order("o2", 10_000, 60), order("o3", 10_000, 30)];
        let m = customer_metrics("cus_1", &orders, now(), &SegmentationThresholds::default());
        assert_eq!(m.order_frequency, 1.0);
        let single = customer_metrics("cus_1", &[order("o1", 10_000, 3)], now(), &SegmentationThresholds::default());
        assert_eq!(single.order_frequency, 1.0); // span below a month counts as one
    }

    #[test]
    fn test_segments() {
        let t = SegmentationThresholds::default();
        let seg = |orders: &[Order]| customer_metrics("cus_1", orders, now(), &t).segment;
        assert_eq!(seg(&[order("o1", 600_000, 400)]), Segment::Vip);
        assert_eq!(seg(&[order("o1", 500_000, 5)]), Segment::New);
        assert_eq!(seg(&[order("o1", 10_000, 120), order("o2", 10_000, 20)]), Segment::Active);
        assert_eq!(seg(&[order("o1", 10_000, 150)]), Segment::AtRisk);
        assert_eq!(seg(&[order("o1", 10_000, 365)]), Segment::Dormant);
    }

    #[test]
    fn test_churn_scores() {
        let t = SegmentationThresholds::default();
        assert_eq!(assess_churn(0, 0.5, &t), ChurnAssessment { score: 0, level: ChurnRisk::Low });
        assert_eq!(assess_churn(45, 0.5, &t).score, 20);
        assert_eq!(assess_churn(135, 0.5, &t), ChurnAssessment { score: 60, level: ChurnRisk::Medium });
        assert_eq!(assess_churn(180, 0.5, &t), ChurnAssessment { score: 80, level: ChurnRisk::High });
        assert_eq!(assess_churn(1000, 0.5, &t).score, 100);
        assert_eq!(assess_churn(180, 2.0, &t).score, 70);
    }

    #[test]
    fn test_configurable_vip_threshold() {
        let t = SegmentationThresholds { vip_min_clv: 50_000, ..Default::default() };
        let m = customer_metrics("cus_1", &[order("o1", 60_000, 200)], now(), &t);
        assert_eq!(m.segment, Segment::Vip);
    }
}
