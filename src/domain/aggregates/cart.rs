//! Cart Aggregate

use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{CountryCode, Money};
use crate::tax::{round_minor, TaxAddress, TaxContext, TaxLineItem, TaxLineResult, TaxLineTarget, TaxShippingLine};

#[derive(Clone, Debug)]
pub struct Cart {
    id: String,
    items: Vec<CartItem>,
    shipping_methods: Vec<ShippingMethod>,
    shipping_address: Option<Address>,
    currency: String,
    subtotal: Money,
    shipping_total: Money,
    tax_total: Money,
    tax_lines: Vec<TaxLineResult>,
    events: Vec<DomainEvent>,
}

/// Amounts in minor units.
#[derive(Clone, Debug)]
pub struct CartItem {
    pub id: String,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Debug)]
pub struct ShippingMethod { pub id: String, pub name: String, pub amount: Money }

#[derive(Clone, Debug, Default)]
pub struct Address {
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<CountryCode>,
}

impl From<&Address> for TaxAddress {
    fn from(a: &Address) -> Self {
        TaxAddress {
            address_1: a.address_1.clone(),
            address_2: a.address_2.clone(),
            city: a.city.clone(),
            province_code: a.province.clone(),
            postal_code: a.postal_code.clone(),
            country_code: a.country_code.as_ref().map(|c| c.as_str().to_string()),
        }
    }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), currency)
    }

    pub fn with_id(id: impl Into<String>, currency: &str) -> Self {
        let id = id.into();
        let currency = currency.to_lowercase();
        let mut cart = Self {
            id: id.clone(), items: vec![], shipping_methods: vec![], shipping_address: None,
            subtotal: Money::zero(&currency), shipping_total: Money::zero(&currency), tax_total: Money::zero(&currency),
            tax_lines: vec![], currency: currency.clone(), events: vec![],
        };
        cart.raise_event(DomainEvent::Cart(CartEvent::Created { cart_id: id, currency }));
        cart
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn shipping_total(&self) -> &Money { &self.shipping_total }
    pub fn tax_total(&self) -> &Money { &self.tax_total }
    pub fn tax_lines(&self) -> &[TaxLineResult] { &self.tax_lines }

    pub fn total(&self) -> Money {
        Money::new(self.subtotal.amount() + self.shipping_total.amount() + self.tax_total.amount(), &self.currency)
    }

    /// Every item stays its own line, even when it repeats a variant, so each
    /// line keeps its own tax line.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if item.unit_price.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        if self.items.iter().any(|i| i.id == item.id) { return Err(CartError::DuplicateLine(item.id)); }
        self.items.push(item);
        self.recalculate();
        Ok(())
    }

    pub fn add_shipping_method(&mut self, method: ShippingMethod) -> Result<(), CartError> {
        if method.amount.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        if self.shipping_methods.iter().any(|s| s.id == method.id) { return Err(CartError::DuplicateLine(method.id)); }
        self.shipping_methods.push(method);
        self.recalculate();
        Ok(())
    }

    pub fn set_shipping_address(&mut self, address: Option<Address>) {
        self.shipping_address = address;
        self.invalidate_taxes();
    }

    /// Lines and context handed to the tax provider.
    pub fn tax_inputs(&self) -> (Vec<TaxLineItem>, Vec<TaxShippingLine>, TaxContext) {
        let items = self.items.iter().map(|i| TaxLineItem {
            id: i.id.clone(), unit_amount: Decimal::from(i.unit_price.amount()), quantity: i.quantity,
        }).collect();
        let shipping = self.shipping_methods.iter().map(|s| TaxShippingLine {
            id: s.id.clone(), amount: Decimal::from(s.amount.amount()),
        }).collect();
        let context = TaxContext { address: self.shipping_address.as_ref().map(TaxAddress::from), currency: Some(self.currency.clone()) };
        (items, shipping, context)
    }

    /// Stores the tax lines and recomputes the tax total. Lines for unknown
    /// cart lines are ignored.
    pub fn apply_tax_lines(&mut self, lines: Vec<TaxLineResult>) {
        let tax: i64 = lines.iter().filter_map(|line| {
            let base = match &line.target {
                TaxLineTarget::LineItem(id) => self.items.iter().find(|i| &i.id == id)?.line_total().amount(),
                TaxLineTarget::ShippingLine(id) => self.shipping_methods.iter().find(|s| &s.id == id)?.amount.amount(),
            };
            round_minor(Decimal::from(base) * line.rate)
        }).sum();
        self.tax_total = Money::new(tax, &self.currency);
        self.tax_lines = lines;
        self.raise_event(DomainEvent::Cart(CartEvent::TaxesApplied {
            cart_id: self.id.clone(), tax_total: tax, currency: self.currency.clone(), line_count: self.tax_lines.len(),
        }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        self.shipping_total = self.shipping_methods.iter().fold(Money::zero(&self.currency), |acc, s| acc.add(&s.amount).unwrap_or(acc));
        self.invalidate_taxes();
    }

    fn invalidate_taxes(&mut self) {
        self.tax_lines.clear();
        self.tax_total = Money::zero(&self.currency);
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { InvalidQuantity, CurrencyMismatch, DuplicateLine(String) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Invalid quantity"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
            Self::DuplicateLine(id) => write!(f, "Duplicate cart line: {id}"),
        }
    }
}
