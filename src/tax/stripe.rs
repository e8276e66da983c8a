//! Stripe Tax calculation client and the mapping between cart lines and
//! Stripe's calculation request/response shapes.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    round_minor, TaxAddress, TaxCalculationApi, TaxError, TaxLineItem, TaxLineResult, TaxLineTarget,
    TaxShippingLine,
};
use crate::config::StripeTaxConfig;

/// General tangible goods.
pub const GENERAL_GOODS_TAX_CODE: &str = "txcd_99999999";
/// Shipping and handling.
pub const SHIPPING_TAX_CODE: &str = "txcd_92010001";
pub const TAX_BEHAVIOR_EXCLUSIVE: &str = "exclusive";

const CALCULATIONS_PATH: &str = "/v1/tax/calculations";
const GENERIC_TAX_NAME: &str = "Sales Tax";
const GENERIC_TAX_CODE: &str = "TAX";

// =============================================================================
// Request
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalculationRequest {
    pub currency: String,
    pub line_items: Vec<CalculationLineItem>,
    pub address: CustomerAddress,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalculationLineItem {
    pub amount: i64,
    pub quantity: u32,
    pub reference: String,
    pub tax_behavior: &'static str,
    pub tax_code: &'static str,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CustomerAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&TaxAddress> for CustomerAddress {
    fn from(a: &TaxAddress) -> Self {
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            line1: field(&a.address_1),
            line2: field(&a.address_2),
            city: field(&a.city),
            state: field(&a.province_code),
            postal_code: field(&a.postal_code),
            country: a.country(),
        }
    }
}

impl CalculationRequest {
    pub fn build(
        items: &[TaxLineItem],
        shipping: &[TaxShippingLine],
        address: &TaxAddress,
        currency: &str,
    ) -> Result<Self, TaxError> {
        let mut line_items = Vec::with_capacity(items.len() + shipping.len());
        for item in items {
            let amount = round_minor(item.unit_amount * Decimal::from(item.quantity))
                .ok_or_else(|| TaxError::InvalidAmount(item.id.clone()))?;
            line_items.push(CalculationLineItem {
                amount,
                quantity: item.quantity,
                reference: item.id.clone(),
                tax_behavior: TAX_BEHAVIOR_EXCLUSIVE,
                tax_code: GENERAL_GOODS_TAX_CODE,
            });
        }
        for line in shipping {
            let amount = round_minor(line.amount).ok_or_else(|| TaxError::InvalidAmount(line.id.clone()))?;
            line_items.push(CalculationLineItem {
                amount,
                quantity: 1,
                reference: line.id.clone(),
                tax_behavior: TAX_BEHAVIOR_EXCLUSIVE,
                tax_code: SHIPPING_TAX_CODE,
            });
        }
        Ok(Self { currency: currency.to_lowercase(), line_items, address: address.into() })
    }

    /// Form-encoded body as Stripe expects it.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("currency".to_string(), self.currency.clone())];
        for (i, line) in self.line_items.iter().enumerate() {
            let key = |field: &str| format!("line_items[{i}][{field}]");
            form.push((key("amount"), line.amount.to_string()));
            form.push((key("quantity"), line.quantity.to_string()));
            form.push((key("reference"), line.reference.clone()));
            form.push((key("tax_behavior"), line.tax_behavior.to_string()));
            form.push((key("tax_code"), line.tax_code.to_string()));
        }
        let a = &self.address;
        for (field, value) in [
            ("line1", &a.line1),
            ("line2", &a.line2),
            ("city", &a.city),
            ("state", &a.state),
            ("postal_code", &a.postal_code),
            ("country", &a.country),
        ] {
            form.push((format!("customer_details[address][{field}]"), value.clone()));
        }
        form.push(("customer_details[address_source]".to_string(), "shipping".to_string()));
        form.push(("expand[]".to_string(), "line_items".to_string()));
        form
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct Calculation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tax_amount_exclusive: i64,
    pub line_items: CalculatedLineList,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CalculatedLineList {
    #[serde(default)]
    pub data: Vec<CalculatedLine>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CalculatedLine {
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: i64,
    pub amount_tax: i64,
    #[serde(default)]
    pub tax_breakdown: Vec<TaxBreakdown>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaxBreakdown {
    #[serde(default)]
    pub jurisdiction: Option<Jurisdiction>,
    #[serde(default)]
    pub tax_rate_details: Option<TaxRateDetails>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Jurisdiction {
    pub country: Option<String>,
    pub display_name: Option<String>,
    pub level: Option<String>,
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaxRateDetails {
    pub display_name: Option<String>,
    pub percentage_decimal: Option<String>,
    pub tax_type: Option<String>,
}

impl Calculation {
    pub fn lines(&self) -> &[CalculatedLine] { &self.line_items.data }
}

impl CalculatedLine {
    /// Effective rate; zero-amount lines carry no rate.
    pub fn effective_rate(&self) -> Decimal {
        if self.amount == 0 { return Decimal::ZERO; }
        Decimal::from(self.amount_tax) / Decimal::from(self.amount)
    }

    pub fn name_and_code(&self) -> (String, String) {
        let Some(breakdown) = self.tax_breakdown.first() else {
            return (GENERIC_TAX_NAME.to_string(), GENERIC_TAX_CODE.to_string());
        };
        let jurisdiction = breakdown.jurisdiction.as_ref();
        let name = breakdown.tax_rate_details.as_ref().and_then(|d| d.display_name.clone())
            .or_else(|| jurisdiction.and_then(|j| j.display_name.clone()))
            .unwrap_or_else(|| GENERIC_TAX_NAME.to_string());
        let code = jurisdiction.and_then(|j| j.state.clone().or_else(|| j.country.clone()))
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| GENERIC_TAX_CODE.to_string());
        (name, code)
    }
}

/// Maps calculated lines back to the caller's lines by reference. Lines that
/// match neither an item nor a shipping line are dropped.
pub fn map_calculation(
    calculation: &Calculation,
    items: &[TaxLineItem],
    shipping: &[TaxShippingLine],
) -> Vec<TaxLineResult> {
    calculation.lines().iter().filter_map(|line| {
        let reference = line.reference.as_deref()?;
        let target = if items.iter().any(|i| i.id == reference) {
            TaxLineTarget::LineItem(reference.to_string())
        } else if shipping.iter().any(|s| s.id == reference) {
            TaxLineTarget::ShippingLine(reference.to_string())
        } else {
            tracing::debug!(reference, "dropping calculated line with unknown reference");
            return None;
        };
        let (name, code) = line.name_and_code();
        Some(TaxLineResult::new(target, line.effective_rate(), name, code))
    }).collect()
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the Stripe Tax calculations endpoint.
#[derive(Clone)]
pub struct StripeTaxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for StripeTaxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeTaxClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl StripeTaxClient {
    pub fn new(config: &StripeTaxConfig) -> Result<Self, TaxError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TaxError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TaxCalculationApi for StripeTaxClient {
    async fn calculate(&self, request: &CalculationRequest) -> Result<Calculation, TaxError> {
        let response = self.http
            .post(format!("{}{}", self.base_url, CALCULATIONS_PATH))
            .bearer_auth(&self.api_key)
            .form(&request.to_form())
            .send()
            .await
            .map_err(|e| TaxError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TaxError::Api { status: status.as_u16(), body });
        }

        response.json::<Calculation>().await.map_err(|e| TaxError::Parse(e.to_string()))
    }
}
