//! Value Objects for checkout and analytics

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 3166-1 alpha-2 country code, always upper-case
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CountryCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CountryCodeError::Empty); }
        if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::Malformed(value));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for CountryCode {
    type Error = CountryCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self { code.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CountryCodeError { Empty, Malformed(String) }
impl std::error::Error for CountryCodeError {}
impl fmt::Display for CountryCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "country code empty"),
            Self::Malformed(v) => write!(f, "country code malformed: {v}"),
        }
    }
}

/// Money value object, amounts in minor currency units
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: i64, currency: String }

impl Money {
    pub fn new(amount: i64, currency: &str) -> Self { Self { amount, currency: currency.to_lowercase() } }
    pub fn usd(amount: i64) -> Self { Self::new(amount, "usd") }
    pub fn zero(currency: &str) -> Self { Self::new(0, currency) }
    pub fn amount(&self) -> i64 { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount.saturating_add(other.amount), &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount.saturating_mul(i64::from(qty)), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("usd") } }

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}
