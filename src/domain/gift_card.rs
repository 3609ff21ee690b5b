use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;
use crate::money::Cents;

/// One balance-affecting event for a gift card code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftCardLedgerEntry {
    pub id: Uuid,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_code: Option<String>,
    pub delta_cents: Cents,
    pub balance_after_cents: Cents,
    pub recorded_at: DateTime<Utc>,
    pub reason: GiftCardReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Identifiable for GiftCardLedgerEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for GiftCardLedgerEntry {
    fn display_label(&self) -> String {
        format!(
            "{} {:+} -> {} ({})",
            self.code, self.delta_cents, self.balance_after_cents, self.reason
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GiftCardReason {
    Issued,
    Redeemed,
    Refunded,
    Adjusted,
}

impl fmt::Display for GiftCardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GiftCardReason::Issued => "issued",
            GiftCardReason::Redeemed => "redeemed",
            GiftCardReason::Refunded => "refunded",
            GiftCardReason::Adjusted => "adjusted",
        };
        f.write_str(label)
    }
}

/// Whether codes carry a stored value or a percentage discount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GiftCardKind {
    #[default]
    Amount,
    /// Percent discounts keep no stored balance; every entry records a zero balance.
    Percent,
}

/// Gift card program settings supplied by the business configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftCardProgram {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub kind: GiftCardKind,
    #[serde(default = "GiftCardProgram::default_restore_on_refund")]
    pub restore_on_refund: bool,
    #[serde(default)]
    pub codes: Vec<String>,
}

impl Default for GiftCardProgram {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: GiftCardKind::Amount,
            restore_on_refund: Self::default_restore_on_refund(),
            codes: Vec::new(),
        }
    }
}

impl GiftCardProgram {
    pub fn default_restore_on_refund() -> bool {
        true
    }

    pub fn knows(&self, code: &str) -> bool {
        let code = normalize_code(code);
        self.codes.iter().any(|known| normalize_code(known) == code)
    }
}

/// Gift card codes compare case-insensitively and ignore surrounding whitespace.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}
