//! Static per-country tax rates used when live calculation is unavailable.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::{normalize_country, TaxLineItem, TaxLineResult, TaxLineTarget, TaxShippingLine};

/// (country, rate in basis points, display name)
const STANDARD_RATES: &[(&str, i64, &str)] = &[
    ("US", 700, "Sales Tax"),
    ("CA", 1300, "HST"),
    ("GB", 2000, "VAT"),
    ("IE", 2300, "VAT"),
    ("DE", 1900, "VAT"),
    ("FR", 2000, "TVA"),
    ("IT", 2200, "IVA"),
    ("ES", 2100, "IVA"),
    ("NL", 2100, "BTW"),
    ("AU", 1000, "GST"),
    ("NZ", 1500, "GST"),
    ("MX", 1600, "IVA"),
    ("JP", 1000, "Consumption Tax"),
];

const UNKNOWN_NAME: &str = "Tax";
const SHIPPING_CODE_PREFIX: &str = "SHIP_";

#[derive(Clone, Debug, PartialEq)]
pub struct FlatRate {
    pub rate: Decimal,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct FlatRateTable {
    rates: HashMap<String, FlatRate>,
}

impl FlatRateTable {
    pub fn standard() -> Self {
        Self::from_rates(STANDARD_RATES.iter().map(|(country, bps, name)| {
            (country.to_string(), FlatRate { rate: Decimal::new(*bps, 4), name: name.to_string() })
        }))
    }

    pub fn from_rates(rates: impl IntoIterator<Item = (String, FlatRate)>) -> Self {
        Self { rates: rates.into_iter().map(|(c, r)| (c.to_uppercase(), r)).collect() }
    }

    /// Unknown countries resolve to a zero rate named "Tax".
    pub fn lookup(&self, country: &str) -> FlatRate {
        self.rates.get(&country.to_uppercase()).cloned().unwrap_or_else(|| FlatRate {
            rate: Decimal::ZERO,
            name: UNKNOWN_NAME.to_string(),
        })
    }

    pub fn apply(&self, items: &[TaxLineItem], shipping: &[TaxShippingLine], country: Option<&str>) -> Vec<TaxLineResult> {
        let country = normalize_country(country);
        let FlatRate { rate, name } = self.lookup(&country);
        let shipping_name = format!("Shipping {name}");
        let shipping_code = format!("{SHIPPING_CODE_PREFIX}{country}");

        items.iter()
            .map(|i| TaxLineResult::new(TaxLineTarget::LineItem(i.id.clone()), rate, name.as_str(), country.as_str()))
            .chain(shipping.iter().map(|s| {
                TaxLineResult::new(TaxLineTarget::ShippingLine(s.id.clone()), rate, shipping_name.as_str(), shipping_code.as_str())
            }))
            .collect()
    }
}

impl Default for FlatRateTable {
    fn default() -> Self { Self::standard() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> (Vec<TaxLineItem>, Vec<TaxShippingLine>) {
        (
            vec![
                TaxLineItem { id: "item_1".into(), unit_amount: Decimal::new(19_900, 0), quantity: 1 },
                TaxLineItem { id: "item_2".into(), unit_amount: Decimal::new(4_500, 0), quantity: 2 },
            ],
            vec![TaxShippingLine { id: "ship_1".into(), amount: Decimal::new(1_500, 0) }],
        )
    }

    #[test]
    fn test_us_rate_applies_to_items_and_shipping() {
        let (items, shipping) = lines();
        let result = FlatRateTable::standard().apply(&items, &shipping, Some("us"));
        assert_eq!(result.len(), 3);
        for line in &result[..2] {
            assert_eq!(line.rate, Decimal::new(7, 2));
            assert_eq!(line.name, "Sales Tax");
            assert_eq!(line.code, "US");
        }
        assert_eq!(result[2].target, TaxLineTarget::ShippingLine("ship_1".into()));
        assert_eq!(result[2].rate, Decimal::new(7, 2));
        assert_eq!(result[2].name, "Shipping Sales Tax");
        assert_eq!(result[2].code, "SHIP_US");
    }

    #[test]
    fn test_unknown_country_is_zero_named_tax() {
        let (items, shipping) = lines();
        let result = FlatRateTable::standard().apply(&items, &shipping, Some("XX"));
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|l| l.rate.is_zero()));
        assert_eq!(result[0].name, "Tax");
        assert_eq!(result[2].name, "Shipping Tax");
        assert_eq!(result[2].code, "SHIP_XX");
    }

    #[test]
    fn test_missing_country_defaults_to_us() {
        let rate = FlatRateTable::standard();
        let (items, _) = lines();
        let result = rate.apply(&items, &[], None);
        assert_eq!(result[0].code, "US");
        assert_eq!(rate.lookup("gb").name, "VAT");
    }
}
