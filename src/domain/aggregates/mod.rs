//! Aggregates module
pub mod cart;
pub mod customer;
pub mod order;

pub use cart::{Address, Cart, CartError, CartItem, ShippingMethod};
pub use customer::{ConversionStatus, Customer, CustomerGroup, GroupMetadata, GuestRecord};
pub use order::{Order, OrderStatus};
