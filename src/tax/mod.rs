//! Checkout tax line resolution
//!
//! Tax lines are produced for every cart line item and shipping line. The
//! [`TaxLineResolver`] prefers Stripe Tax, degrades to a static per-country
//! rate table when the calculation fails, and answers with explicit
//! zero-rate lines when tax is disabled or the cart has no address.

pub mod fallback;
pub mod resolver;
pub mod stripe;

pub use fallback::{FlatRate, FlatRateTable};
pub use resolver::{TaxLineResolver, TaxOptions, TaxResolution, TaxSource};
pub use stripe::{CalculationRequest, StripeTaxClient};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider identifier stamped on every tax line.
pub const PROVIDER_ID: &str = "stripe-tax";
pub const NO_TAX_NAME: &str = "No Tax";
pub const NO_TAX_CODE: &str = "NONE";
pub const DEFAULT_COUNTRY: &str = "US";

/// Cart line item as seen by the tax provider. Amounts are minor units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLineItem {
    pub id: String,
    pub unit_amount: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxShippingLine {
    pub id: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxAddress {
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub province_code: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
}

impl TaxAddress {
    /// Upper-cased destination country, `US` when unset.
    pub fn country(&self) -> String {
        normalize_country(self.country_code.as_deref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxContext {
    pub address: Option<TaxAddress>,
    pub currency: Option<String>,
}

/// The cart line a tax result belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxLineTarget {
    #[serde(rename = "line_item_id")]
    LineItem(String),
    #[serde(rename = "shipping_line_id")]
    ShippingLine(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLineResult {
    #[serde(flatten)]
    pub target: TaxLineTarget,
    pub rate: Decimal,
    pub name: String,
    pub code: String,
    pub provider_id: String,
}

impl TaxLineResult {
    pub fn new(target: TaxLineTarget, rate: Decimal, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { target, rate, name: name.into(), code: code.into(), provider_id: PROVIDER_ID.to_string() }
    }

    pub fn zero(target: TaxLineTarget) -> Self {
        Self::new(target, Decimal::ZERO, NO_TAX_NAME, NO_TAX_CODE)
    }
}

#[derive(Error, Debug)]
pub enum TaxError {
    #[error("network error: {0}")]
    Network(String),

    #[error("tax API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid amount on line {0}")]
    InvalidAmount(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

/// Inbound contract used by checkout: one result per line, never an error.
#[async_trait]
pub trait TaxProvider: Send + Sync {
    fn identifier(&self) -> &'static str;

    /// Tax lines together with how they were produced.
    async fn resolve(&self, items: &[TaxLineItem], shipping: &[TaxShippingLine], context: &TaxContext) -> TaxResolution;

    async fn get_tax_lines(
        &self,
        items: &[TaxLineItem],
        shipping: &[TaxShippingLine],
        context: &TaxContext,
    ) -> Vec<TaxLineResult> {
        self.resolve(items, shipping, context).await.lines
    }
}

/// Outbound seam to the external tax calculation service.
#[async_trait]
pub trait TaxCalculationApi: Send + Sync {
    async fn calculate(&self, request: &CalculationRequest) -> Result<stripe::Calculation, TaxError>;
}

/// Every line the caller asked about, items first, in input order.
pub fn line_targets(items: &[TaxLineItem], shipping: &[TaxShippingLine]) -> Vec<TaxLineTarget> {
    items.iter().map(|i| TaxLineTarget::LineItem(i.id.clone()))
        .chain(shipping.iter().map(|s| TaxLineTarget::ShippingLine(s.id.clone())))
        .collect()
}

pub fn zero_tax_lines(items: &[TaxLineItem], shipping: &[TaxShippingLine]) -> Vec<TaxLineResult> {
    line_targets(items, shipping).into_iter().map(TaxLineResult::zero).collect()
}

pub fn normalize_country(code: Option<&str>) -> String {
    match code.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => DEFAULT_COUNTRY.to_string(),
    }
}

/// Rounds half away from zero to whole minor units.
pub fn round_minor(value: Decimal) -> Option<i64> {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_target_as_id_field() {
        let line = TaxLineResult::zero(TaxLineTarget::ShippingLine("sm_1".into()));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["shipping_line_id"], "sm_1");
        assert_eq!(json["name"], "No Tax");
        assert_eq!(json["code"], "NONE");
        assert_eq!(json["provider_id"], "stripe-tax");
        assert!(json.get("line_item_id").is_none());
    }

    #[test]
    fn test_line_targets_keep_input_order() {
        let items = vec![
            TaxLineItem { id: "b".into(), unit_amount: Decimal::ONE, quantity: 1 },
            TaxLineItem { id: "a".into(), unit_amount: Decimal::ONE, quantity: 1 },
        ];
        let shipping = vec![TaxShippingLine { id: "s".into(), amount: Decimal::TEN }];
        assert_eq!(line_targets(&items, &shipping), vec![
            TaxLineTarget::LineItem("b".into()),
            TaxLineTarget::LineItem("a".into()),
            TaxLineTarget::ShippingLine("s".into()),
        ]);
    }

    #[test]
    fn test_normalize_country() {
        assert_eq!(normalize_country(Some("ca")), "CA");
        assert_eq!(normalize_country(Some("  ")), "US");
        assert_eq!(normalize_country(None), "US");
    }

    #[test]
    fn test_round_minor_half_away_from_zero() {
        assert_eq!(round_minor(Decimal::new(25, 1)), Some(3));
        assert_eq!(round_minor(Decimal::new(24, 1)), Some(2));
        assert_eq!(round_minor(Decimal::new(-25, 1)), Some(-3));
    }
}
