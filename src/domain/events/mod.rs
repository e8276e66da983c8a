//! Domain events
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Cart(CartEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    Created { cart_id: String, currency: String },
    TaxesApplied { cart_id: String, tax_total: i64, currency: String, line_count: usize },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Cart(CartEvent::Created { .. }) => "commerce.cart.created",
            DomainEvent::Cart(CartEvent::TaxesApplied { .. }) => "commerce.cart.taxes_applied",
        }
    }
}
