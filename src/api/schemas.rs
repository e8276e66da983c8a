//! Request and response bodies, validated at the boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use validator::{Validate, ValidationError};

use crate::domain::aggregates::{Address, Cart, CartItem, ShippingMethod};
use crate::domain::value_objects::{CountryCode, Money};
use crate::tax::{TaxLineResult, TaxSource};
use crate::{CommerceError, Result};

fn default_currency() -> String { "usd".to_string() }

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "unique_line_ids", skip_on_field_errors = false))]
pub struct CartTaxRequest {
    #[validate(length(min = 1))]
    pub cart_id: Option<String>,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
    #[serde(default)]
    #[validate]
    pub items: Vec<CartItemInput>,
    #[serde(default)]
    #[validate]
    pub shipping_methods: Vec<ShippingMethodInput>,
    #[validate]
    pub shipping_address: Option<AddressInput>,
}

/// Every item and shipping method id names exactly one line; ids double as
/// tax calculation references.
fn unique_line_ids(request: &CartTaxRequest) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let ids = request.items.iter().map(|i| i.id.as_str()).chain(request.shipping_methods.iter().map(|m| m.id.as_str()));
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::new("duplicate_line_id"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemInput {
    #[validate(length(min = 1))]
    pub id: String,
    pub variant_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    /// Minor units.
    #[validate(range(min = 0))]
    pub unit_price: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingMethodInput {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[validate(range(min = 0))]
    pub amount: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddressInput {
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    #[validate(length(equal = 2))]
    pub country_code: Option<String>,
}

impl AddressInput {
    fn into_address(self) -> Result<Address> {
        let country_code = self.country_code
            .map(CountryCode::new)
            .transpose()
            .map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        Ok(Address {
            address_1: self.address_1,
            address_2: self.address_2,
            city: self.city,
            province: self.province,
            postal_code: self.postal_code,
            country_code,
        })
    }
}

impl CartTaxRequest {
    /// Builds the cart aggregate. Call `validate()` first.
    pub fn into_cart(self) -> Result<Cart> {
        let currency = self.currency.to_lowercase();
        let mut cart = match self.cart_id {
            Some(id) => Cart::with_id(id, &currency),
            None => Cart::new(&currency),
        };
        for item in self.items {
            cart.add_item(CartItem {
                id: item.id, variant_id: item.variant_id, title: item.title, quantity: item.quantity,
                unit_price: Money::new(item.unit_price, &currency),
            }).map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        }
        for method in self.shipping_methods {
            cart.add_shipping_method(ShippingMethod { id: method.id, name: method.name, amount: Money::new(method.amount, &currency) })
                .map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        }
        cart.set_shipping_address(self.shipping_address.map(AddressInput::into_address).transpose()?);
        Ok(cart)
    }
}

#[derive(Debug, Serialize)]
pub struct CartTaxResponse {
    pub cart_id: String,
    pub currency: String,
    pub source: TaxSource,
    pub tax_lines: Vec<TaxLineResult>,
    pub subtotal: i64,
    pub shipping_total: i64,
    pub tax_total: i64,
    pub total: i64,
}

impl CartTaxResponse {
    pub fn from_cart(cart: &Cart, source: TaxSource) -> Self {
        Self {
            cart_id: cart.id().to_string(),
            currency: cart.currency().to_string(),
            source,
            tax_lines: cart.tax_lines().to_vec(),
            subtotal: cart.subtotal().amount(),
            shipping_total: cart.shipping_total().amount(),
            tax_total: cart.tax_total().amount(),
            total: cart.total().amount(),
        }
    }
}
