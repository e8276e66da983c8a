//! KCT Commerce
//!
//! Checkout and admin extensions for the KCT menswear store.
//!
//! ## Features
//! - Per-line checkout tax via Stripe Tax, with a flat-rate fallback
//! - Customer analytics: lifetime value, churn risk, segments
//! - Customer group conversion metrics and recommendations
//! - Domain events published to NATS

pub mod analytics;
pub mod api;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod repository;
pub mod tax;

pub use analytics::{CustomerAnalytics, SegmentationThresholds};
pub use config::AppConfig;
pub use tax::{TaxLineResolver, TaxProvider};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CommerceError>;
