//! Service configuration loaded from the environment.
//!
//! `main` calls `dotenvy::dotenv()` first, so a local `.env` file works the
//! same as exported variables.

use thiserror::Error;

use crate::analytics::SegmentationThresholds;
use crate::tax::TaxOptions;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_STRIPE_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when automatic tax is enabled")]
    MissingApiKey(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Stripe Tax options. `Debug` redacts the API key.
#[derive(Clone)]
pub struct StripeTaxConfig {
    pub api_key: String,
    pub automatic_tax: bool,
    pub api_base: String,
    pub timeout_secs: u64,
    pub default_currency: String,
}

impl std::fmt::Debug for StripeTaxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeTaxConfig")
            .field("api_key", &"[REDACTED]")
            .field("automatic_tax", &self.automatic_tax)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

impl Default for StripeTaxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            automatic_tax: true,
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            timeout_secs: DEFAULT_STRIPE_TIMEOUT_SECS,
            default_currency: "usd".to_string(),
        }
    }
}

impl StripeTaxConfig {
    pub fn tax_options(&self) -> TaxOptions {
        TaxOptions { automatic_tax: self.automatic_tax, default_currency: self.default_currency.clone() }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub stripe: StripeTaxConfig,
    pub segmentation: SegmentationThresholds,
}

impl AppConfig {
    /// Variables:
    /// - `PORT` (default 9000)
    /// - `DATABASE_URL`, `NATS_URL` (optional)
    /// - `STRIPE_API_KEY` (required while `STRIPE_AUTOMATIC_TAX` is true)
    /// - `STRIPE_AUTOMATIC_TAX` (default true), `STRIPE_API_BASE`, `STRIPE_TIMEOUT_SECS`
    /// - `TAX_DEFAULT_CURRENCY` (default `usd`)
    /// - `ANALYTICS_VIP_MIN_CLV`, `ANALYTICS_ACTIVE_MAX_DAYS`, `ANALYTICS_AT_RISK_MAX_DAYS`,
    ///   `ANALYTICS_NEW_CUSTOMER_DAYS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let stripe_defaults = StripeTaxConfig::default();
        let stripe = StripeTaxConfig {
            api_key: var("STRIPE_API_KEY").unwrap_or_default(),
            automatic_tax: parse_bool("STRIPE_AUTOMATIC_TAX", var("STRIPE_AUTOMATIC_TAX"), stripe_defaults.automatic_tax)?,
            api_base: var("STRIPE_API_BASE").unwrap_or(stripe_defaults.api_base),
            timeout_secs: parse("STRIPE_TIMEOUT_SECS", var("STRIPE_TIMEOUT_SECS"), stripe_defaults.timeout_secs)?,
            default_currency: var("TAX_DEFAULT_CURRENCY").map(|c| c.to_lowercase()).unwrap_or(stripe_defaults.default_currency),
        };
        if stripe.automatic_tax && stripe.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey("STRIPE_API_KEY"));
        }

        let d = SegmentationThresholds::default();
        let segmentation = SegmentationThresholds {
            vip_min_clv: parse("ANALYTICS_VIP_MIN_CLV", var("ANALYTICS_VIP_MIN_CLV"), d.vip_min_clv)?,
            active_max_days: parse("ANALYTICS_ACTIVE_MAX_DAYS", var("ANALYTICS_ACTIVE_MAX_DAYS"), d.active_max_days)?,
            at_risk_max_days: parse("ANALYTICS_AT_RISK_MAX_DAYS", var("ANALYTICS_AT_RISK_MAX_DAYS"), d.at_risk_max_days)?,
            new_customer_days: parse("ANALYTICS_NEW_CUSTOMER_DAYS", var("ANALYTICS_NEW_CUSTOMER_DAYS"), d.new_customer_days)?,
            ..d
        };

        Ok(Self {
            port: parse("PORT", var("PORT"), DEFAULT_PORT)?,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            stripe,
            segmentation,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { var: name, value: v }),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid { var: name, value: value.unwrap_or_default() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STRIPE_API_KEY", "sk_test_123")]).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.database_url.is_none());
        assert!(config.stripe.automatic_tax);
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.stripe.default_currency, "usd");
        assert_eq!(config.segmentation.vip_min_clv, 500_000);
    }

    #[test]
    fn test_api_key_required_only_with_automatic_tax() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingApiKey("STRIPE_API_KEY"));
        let config = load(&[("STRIPE_AUTOMATIC_TAX", "false")]).unwrap();
        assert!(!config.stripe.tax_options().automatic_tax);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = load(&[("STRIPE_API_KEY", "sk"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "PORT", value: "eighty".into() });
        assert!(load(&[("STRIPE_AUTOMATIC_TAX", "maybe")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STRIPE_API_KEY", "sk"),
            ("TAX_DEFAULT_CURRENCY", "CAD"),
            ("ANALYTICS_VIP_MIN_CLV", "250000"),
            ("ANALYTICS_AT_RISK_MAX_DAYS", "120"),
        ]).unwrap();
        assert_eq!(config.stripe.default_currency, "cad");
        assert_eq!(config.segmentation.vip_min_clv, 250_000);
        assert_eq!(config.segmentation.at_risk_max_days, 120);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = load(&[("STRIPE_API_KEY", "sk_live_secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("sk_live_secret"));
    }
}
