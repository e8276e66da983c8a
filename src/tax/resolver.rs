//! Tax line resolver: disabled → zero tax, otherwise Stripe with a
//! flat-rate fallback. Every input line always gets exactly one result.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use super::stripe::{map_calculation, CalculationRequest};
use super::{
    line_targets, zero_tax_lines, FlatRateTable, TaxAddress, TaxCalculationApi, TaxContext, TaxError,
    TaxLineItem, TaxLineResult, TaxLineTarget, TaxProvider, TaxShippingLine, PROVIDER_ID,
};

#[derive(Clone, Debug)]
pub struct TaxOptions {
    /// When false no external call is attempted and every line is zero-rated.
    pub automatic_tax: bool,
    /// Used when the cart does not carry a currency.
    pub default_currency: String,
}

impl Default for TaxOptions {
    fn default() -> Self {
        Self { automatic_tax: true, default_currency: "usd".to_string() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxSource {
    Disabled,
    Calculated,
    FlatRate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaxResolution {
    pub source: TaxSource,
    pub lines: Vec<TaxLineResult>,
}

pub struct TaxLineResolver {
    api: Arc<dyn TaxCalculationApi>,
    options: TaxOptions,
    fallback: FlatRateTable,
}

impl TaxLineResolver {
    pub fn new(api: Arc<dyn TaxCalculationApi>, options: TaxOptions) -> Self {
        Self { api, options, fallback: FlatRateTable::standard() }
    }

    async fn calculate(
        &self,
        items: &[TaxLineItem],
        shipping: &[TaxShippingLine],
        address: &TaxAddress,
        context: &TaxContext,
    ) -> Result<Vec<TaxLineResult>, TaxError> {
        let currency = context.currency.as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.options.default_currency);
        let request = CalculationRequest::build(items, shipping, address, currency)?;
        let calculation = self.api.calculate(&request).await?;

        info!(
            calculation_id = calculation.id.as_deref().unwrap_or_default(),
            tax_amount = calculation.tax_amount_exclusive,
            country = %request.address.country,
            "tax calculated"
        );

        Ok(backfill(map_calculation(&calculation, items, shipping), items, shipping))
    }
}

#[async_trait]
impl TaxProvider for TaxLineResolver {
    fn identifier(&self) -> &'static str { PROVIDER_ID }

    async fn resolve(&self, items: &[TaxLineItem], shipping: &[TaxShippingLine], context: &TaxContext) -> TaxResolution {
        let address = match (&context.address, self.options.automatic_tax) {
            (Some(address), true) => address,
            _ => {
                debug!(automatic_tax = self.options.automatic_tax, "tax calculation skipped, applying zero tax");
                return TaxResolution { source: TaxSource::Disabled, lines: zero_tax_lines(items, shipping) };
            }
        };

        match self.calculate(items, shipping, address, context).await {
            Ok(lines) => TaxResolution { source: TaxSource::Calculated, lines },
            Err(err) => {
                error!(error = %err, country = %address.country(), "tax calculation failed, using flat-rate fallback");
                let lines = self.fallback.apply(items, shipping, address.country_code.as_deref());
                TaxResolution { source: TaxSource::FlatRate, lines }
            }
        }
    }
}

/// One result per input line in input order; the first mapped result wins,
/// lines without one are zero-rated.
fn backfill(mapped: Vec<TaxLineResult>, items: &[TaxLineItem], shipping: &[TaxShippingLine]) -> Vec<TaxLineResult> {
    let mut by_target: HashMap<TaxLineTarget, TaxLineResult> = HashMap::with_capacity(mapped.len());
    for line in mapped {
        by_target.entry(line.target.clone()).or_insert(line);
    }
    line_targets(items, shipping).into_iter()
        .map(|target| by_target.remove(&target).unwrap_or_else(|| TaxLineResult::zero(target)))
        .collect()
}
