//! Append-only gift card balance log with an independent running balance per code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::gift_card::normalize_code;
use crate::domain::{GiftCardKind, GiftCardLedgerEntry, GiftCardReason};
use crate::errors::{BookingError, Result};
use crate::money::Cents;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiftCardLedger {
    #[serde(default)]
    entries: Vec<GiftCardLedgerEntry>,
}

/// A balance change waiting to be recorded against a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftCardMovement {
    pub code: String,
    pub booking_code: Option<String>,
    pub delta_cents: Cents,
    pub reason: GiftCardReason,
    pub note: Option<String>,
}

impl GiftCardMovement {
    pub fn new(code: &str, delta_cents: Cents, reason: GiftCardReason) -> Self {
        Self {
            code: normalize_code(code),
            booking_code: None,
            delta_cents,
            reason,
            note: None,
        }
    }

    pub fn for_booking(mut self, booking_code: impl Into<String>) -> Self {
        self.booking_code = Some(booking_code.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl GiftCardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<GiftCardLedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[GiftCardLedgerEntry] {
        &self.entries
    }

    /// Entries for one code in the order they were recorded.
    pub fn history<'a>(&'a self, code: &str) -> impl Iterator<Item = &'a GiftCardLedgerEntry> {
        let code = normalize_code(code);
        self.entries.iter().filter(move |entry| entry.code == code)
    }

    pub fn latest(&self, code: &str) -> Option<&GiftCardLedgerEntry> {
        self.history(code).last()
    }

    /// Running balance for a code: the balance recorded by its latest entry.
    pub fn balance(&self, code: &str) -> Cents {
        self.latest(code)
            .map(|entry| entry.balance_after_cents)
            .unwrap_or(0)
    }

    /// Builds the entry a movement would produce without recording it.
    ///
    /// Amount programs reject movements that would take the balance below zero.
    /// Percent programs always record a zero balance.
    pub fn prepare(
        &self,
        movement: GiftCardMovement,
        kind: GiftCardKind,
        at: DateTime<Utc>,
    ) -> Result<GiftCardLedgerEntry> {
        let balance_after_cents = match kind {
            GiftCardKind::Percent => 0,
            GiftCardKind::Amount => {
                let next = self.balance(&movement.code) + movement.delta_cents;
                if next < 0 {
                    return Err(BookingError::InvalidInput(format!(
                        "gift card {} balance {} cannot absorb {}",
                        movement.code,
                        self.balance(&movement.code),
                        movement.delta_cents
                    )));
                }
                next
            }
        };
        Ok(GiftCardLedgerEntry {
            id: Uuid::new_v4(),
            code: movement.code,
            booking_code: movement.booking_code,
            delta_cents: movement.delta_cents,
            balance_after_cents,
            recorded_at: at,
            reason: movement.reason,
            note: movement.note,
        })
    }

    /// Appends a prepared entry. Entries are never edited or removed afterwards.
    pub fn append(&mut self, entry: GiftCardLedgerEntry) {
        self.entries.push(entry);
    }

    /// Prepares and appends in one step.
    pub fn record(
        &mut self,
        movement: GiftCardMovement,
        kind: GiftCardKind,
        at: DateTime<Utc>,
    ) -> Result<GiftCardLedgerEntry> {
        let entry = self.prepare(movement, kind, at)?;
        self.append(entry.clone());
        Ok(entry)
    }

    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !codes.contains(&entry.code) {
                codes.push(entry.code.clone());
            }
        }
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_are_tracked_per_code() {
        let mut ledger = GiftCardLedger::new();
        let now = Utc::now();
        ledger
            .record(
                GiftCardMovement::new("spring", 5_000, GiftCardReason::Issued),
                GiftCardKind::Amount,
                now,
            )
            .unwrap();
        ledger
            .record(
                GiftCardMovement::new("SUMMER", 2_000, GiftCardReason::Issued),
                GiftCardKind::Amount,
                now,
            )
            .unwrap();
        ledger
            .record(
                GiftCardMovement::new("Spring", -1_500, GiftCardReason::Redeemed)
                    .for_booking("ACM-2026-0001"),
                GiftCardKind::Amount,
                now,
            )
            .unwrap();

        assert_eq!(ledger.balance("SPRING"), 3_500);
        assert_eq!(ledger.balance("summer"), 2_000);
        assert_eq!(ledger.history("spring").count(), 2);
        assert_eq!(ledger.codes(), vec!["SPRING".to_string(), "SUMMER".to_string()]);
    }

    #[test]
    fn amount_balance_cannot_go_negative() {
        let mut ledger = GiftCardLedger::new();
        let now = Utc::now();
        ledger
            .record(
                GiftCardMovement::new("GC1", 1_000, GiftCardReason::Issued),
                GiftCardKind::Amount,
                now,
            )
            .unwrap();
        let err = ledger
            .record(
                GiftCardMovement::new("GC1", -1_001, GiftCardReason::Redeemed),
                GiftCardKind::Amount,
                now,
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidInput(_)));
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn percent_programs_record_zero_balances() {
        let mut ledger = GiftCardLedger::new();
        let entry = ledger
            .record(
                GiftCardMovement::new("TENOFF", -1_000, GiftCardReason::Redeemed),
                GiftCardKind::Percent,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(entry.balance_after_cents, 0);
        assert_eq!(ledger.balance("TENOFF"), 0);
    }

    #[test]
    fn balance_follows_latest_entry_not_first() {
        let mut ledger = GiftCardLedger::new();
        let now = Utc::now();
        for movement in [
            GiftCardMovement::new("GC", 10_000, GiftCardReason::Issued),
            GiftCardMovement::new("GC", -4_000, GiftCardReason::Redeemed),
            GiftCardMovement::new("GC", -1_000, GiftCardReason::Redeemed),
            GiftCardMovement::new("GC", 4_000, GiftCardReason::Refunded),
        ] {
            ledger.record(movement, GiftCardKind::Amount, now).unwrap();
        }
        assert_eq!(ledger.balance("GC"), 9_000);
    }
}
