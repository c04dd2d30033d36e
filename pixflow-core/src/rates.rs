//! Settlement → display currency conversion.
//!
//! The rate is configuration, never a literal in code.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("exchange rate must be positive, got {0}")]
    NonPositive(Decimal),
}

/// How many settlement units (BRL) buy one display unit (USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    settlement_per_display: Decimal,
}

impl ExchangeRate {
    pub fn new(settlement_per_display: Decimal) -> Result<Self, RateError> {
        if settlement_per_display <= Decimal::ZERO {
            return Err(RateError::NonPositive(settlement_per_display));
        }
        Ok(Self {
            settlement_per_display,
        })
    }

    /// Convert a settlement amount to the display currency, rounded to cents.
    pub fn to_display(&self, amount: Decimal) -> Decimal {
        (amount / self.settlement_per_display)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}
