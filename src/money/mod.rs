//! Money model: currency codes, fee arithmetic, and the per-booking financial snapshot.
//!
//! Every amount is an integer count of minor currency units (cents). Floating point
//! only appears transiently inside the rate multiplications and is rounded
//! half-away-from-zero straight back to cents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{BookingError, Result};

/// Integer amount in minor currency units.
pub type Cents = i64;

pub const PLATFORM_FEE_RATE: f64 = 0.01;
pub const PROCESSOR_FEE_RATE: f64 = 0.029;
pub const PROCESSOR_FEE_FLAT_CENTS: Cents = 30;

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rounds half away from zero and converts to cents.
pub fn round_cents(value: f64) -> Cents {
    value.round() as Cents
}

/// Platform commission: 1% of the amount.
pub fn platform_fee(amount: Cents) -> Cents {
    round_cents(amount as f64 * PLATFORM_FEE_RATE)
}

/// Card-processing estimate: 2.9% plus a flat 30 cents, charged on every
/// realized amount including zero. Not a live quote.
pub fn processor_fee_estimate(amount: Cents) -> Cents {
    round_cents(amount as f64 * PROCESSOR_FEE_RATE) + PROCESSOR_FEE_FLAT_CENTS
}

pub fn net_payout(realized: Cents, platform_fee: Cents, processor_fee: Cents) -> Cents {
    (realized - platform_fee - processor_fee).max(0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    /// Percentage of the list price.
    Percent,
    /// Fixed amount in major units.
    Flat,
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeeType::Percent => "percent",
            FeeType::Flat => "flat",
        };
        f.write_str(label)
    }
}

/// A no-show or cancellation fee rule as configured by the business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeePolicy {
    pub fee_type: FeeType,
    pub value: f64,
}

impl FeePolicy {
    pub fn percent(value: f64) -> Self {
        Self {
            fee_type: FeeType::Percent,
            value,
        }
    }

    pub fn flat(value: f64) -> Self {
        Self {
            fee_type: FeeType::Flat,
            value,
        }
    }

    pub fn none() -> Self {
        Self::flat(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(BookingError::InvalidPolicy(format!(
                "{} fee value must be a finite number",
                self.fee_type
            )));
        }
        if self.value < 0.0 {
            return Err(BookingError::InvalidPolicy(format!(
                "{} fee value {} is negative",
                self.fee_type, self.value
            )));
        }
        if self.fee_type == FeeType::Percent && self.value > 100.0 {
            return Err(BookingError::InvalidPolicy(format!(
                "percent fee value {} exceeds 100",
                self.value
            )));
        }
        Ok(())
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Computes the fee a policy charges against a list price.
pub fn policy_fee(list_price: Cents, policy: &FeePolicy) -> Result<Cents> {
    policy.validate()?;
    let fee = match policy.fee_type {
        FeeType::Percent => round_cents(list_price as f64 * policy.value / 100.0),
        FeeType::Flat => round_cents(policy.value * 100.0),
    };
    Ok(fee.max(0))
}

/// Monetary snapshot embedded in every booking. Always rebuilt, never patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Financials {
    pub list_price_cents: Cents,
    pub gift_card_applied_cents: Cents,
    pub platform_fee_cents: Cents,
    pub processor_fee_cents: Cents,
    pub net_payout_cents: Cents,
    #[serde(default)]
    pub currency: CurrencyCode,
}

impl Financials {
    /// Builds the snapshot for a realized (captured) amount.
    pub fn for_realized(
        list_price_cents: Cents,
        gift_card_applied_cents: Cents,
        realized_cents: Cents,
        currency: CurrencyCode,
    ) -> Self {
        let platform = platform_fee(realized_cents);
        let processor = processor_fee_estimate(realized_cents);
        Self {
            list_price_cents,
            gift_card_applied_cents,
            platform_fee_cents: platform,
            processor_fee_cents: processor,
            net_payout_cents: net_payout(realized_cents, platform, processor),
            currency,
        }
    }

    /// Snapshot for a booking that has only been authorized: nothing realized, no fees yet.
    pub fn unrealized(
        list_price_cents: Cents,
        gift_card_applied_cents: Cents,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            list_price_cents,
            gift_card_applied_cents,
            platform_fee_cents: 0,
            processor_fee_cents: 0,
            net_payout_cents: 0,
            currency,
        }
    }

    /// Same prices, every fee field cleared.
    pub fn zeroed(&self) -> Self {
        Self {
            platform_fee_cents: 0,
            processor_fee_cents: 0,
            net_payout_cents: 0,
            ..self.clone()
        }
    }

    /// Amount the customer is charged once the gift card is taken off.
    pub fn chargeable_cents(&self) -> Cents {
        (self.list_price_cents - self.gift_card_applied_cents).max(0)
    }
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        _ => format!("{code} "),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" => 0,
        "KWD" | "BHD" => 3,
        _ => 2,
    }
}

/// Renders cents as a display amount, e.g. `$1,234.50`.
pub fn format_cents(amount: Cents, code: &CurrencyCode) -> String {
    let precision = minor_units_for(code.as_str()) as u32;
    let divisor = 10_i64.pow(precision);
    let abs = amount.unsigned_abs() as i64;
    let whole = group_digits(&(abs / divisor).to_string(), ',');
    let body = if precision == 0 {
        whole
    } else {
        format!(
            "{}.{:0width$}",
            whole,
            abs % divisor,
            width = precision as usize
        )
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{}{}", sign, symbol_for(code.as_str()), body)
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fees_for_one_hundred_dollars() {
        assert_eq!(platform_fee(10_000), 100);
        assert_eq!(processor_fee_estimate(10_000), 320);
        assert_eq!(net_payout(10_000, 100, 320), 9_580);
    }

    #[test]
    fn fees_round_half_away_from_zero() {
        // 50 * 0.01 = 0.5
        assert_eq!(platform_fee(50), 1);
        assert_eq!(platform_fee(149), 1);
        assert_eq!(platform_fee(150), 2);
    }

    #[test]
    fn zero_amount_still_carries_flat_processor_fee() {
        assert_eq!(platform_fee(0), 0);
        assert_eq!(processor_fee_estimate(0), 30);
        let financials = Financials::for_realized(10_000, 10_000, 0, CurrencyCode::default());
        assert_eq!(financials.processor_fee_cents, 30);
        assert_eq!(financials.net_payout_cents, 0);
    }

    #[test]
    fn unrealized_snapshot_has_no_fees() {
        let financials = Financials::unrealized(10_000, 2_500, CurrencyCode::default());
        assert_eq!(financials.processor_fee_cents, 0);
        assert_eq!(financials.chargeable_cents(), 7_500);
    }

    #[test]
    fn net_payout_never_negative() {
        assert_eq!(net_payout(10, 1, 30), 0);
        let financials = Financials::for_realized(100, 90, 10, CurrencyCode::default());
        assert_eq!(financials.net_payout_cents, 0);
    }

    #[test]
    fn percent_and_flat_policy_fees() {
        assert_eq!(policy_fee(10_000, &FeePolicy::percent(50.0)).unwrap(), 5_000);
        assert_eq!(policy_fee(10_000, &FeePolicy::flat(25.0)).unwrap(), 2_500);
        assert_eq!(policy_fee(10_000, &FeePolicy::flat(0.0)).unwrap(), 0);
        assert_eq!(policy_fee(999, &FeePolicy::percent(50.0)).unwrap(), 500);
    }

    #[test]
    fn malformed_policies_are_rejected() {
        let negative = policy_fee(10_000, &FeePolicy::flat(-1.0)).unwrap_err();
        assert!(matches!(negative, BookingError::InvalidPolicy(_)));
        assert!(policy_fee(10_000, &FeePolicy::percent(150.0)).is_err());
        assert!(policy_fee(10_000, &FeePolicy::percent(f64::NAN)).is_err());
    }

    #[test]
    fn formats_cents_with_grouping() {
        let usd = CurrencyCode::new("usd");
        assert_eq!(format_cents(123_450, &usd), "$1,234.50");
        assert_eq!(format_cents(-5, &usd), "-$0.05");
        assert_eq!(format_cents(1_000, &CurrencyCode::new("JPY")), "¥1,000");
    }
}
