//! Booking engine: the entry point the public and admin collaborators call.
//!
//! Owns the [`BookingStore`] and the injected collaborators, and runs every
//! write inside the critical section of the booking (and gift card code) it
//! touches.

use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::services::{
    ActionOutcome, AnalyticsService, AnalyticsSnapshot, BookingAction, BookingSeed,
    CustomerService, IntakeContext, IntakeService, LifecycleContext, LifecycleService,
    ProcessorOutcome, ResponseStatus,
};
use crate::core::store::{lock, BookingStore, StoreSnapshot};
use crate::core::time::Clock;
use crate::domain::{
    gift_card::normalize_code, Booking, Catalog, Customer, GiftCardLedgerEntry, GiftCardReason,
    ServiceCatalog, StaffDirectory,
};
use crate::errors::{BookingError, Result};
use crate::ledger::GiftCardMovement;
use crate::money::Cents;

/// What an admin action reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub booking: Arc<Booking>,
    pub status: ResponseStatus,
    pub message: String,
    pub pay_link_url: Option<String>,
    /// `false` when the snapshot above was reported but not stored.
    pub committed: bool,
}

pub struct BookingEngine {
    config: EngineConfig,
    services: Arc<dyn ServiceCatalog>,
    staff: Arc<dyn StaffDirectory>,
    clock: Arc<dyn Clock>,
    store: BookingStore,
}

impl BookingEngine {
    pub fn new(
        config: EngineConfig,
        services: Arc<dyn ServiceCatalog>,
        staff: Arc<dyn StaffDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            services,
            staff,
            clock,
            store: BookingStore::new(),
        })
    }

    /// Uses one in-memory catalog for both service and staff lookups.
    pub fn with_catalog(config: EngineConfig, catalog: Catalog, clock: Arc<dyn Clock>) -> Result<Self> {
        let catalog = Arc::new(catalog);
        Self::new(config, catalog.clone(), catalog, clock)
    }

    /// Replaces the store with previously saved state.
    pub fn restore(mut self, snapshot: StoreSnapshot) -> Self {
        info!(
            bookings = snapshot.bookings.len(),
            gift_card_entries = snapshot.gift_card_entries.len(),
            "restoring booking store"
        );
        self.store = BookingStore::from_snapshot(snapshot);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &BookingStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub fn create_booking(&self, seed: BookingSeed) -> Result<Booking> {
        let _intake = self.store.intake_guard();
        let gift_slot = seed
            .gift_card
            .as_ref()
            .map(|request| self.store.gift_card_slot(&request.code));
        let _gift_guard = gift_slot.as_deref().map(lock);

        let now = self.clock.now();
        let customers = CustomerService::derive_customers(&self.store.bookings());
        let booking_code = self
            .store
            .codes()
            .next_code(&self.config.business_slug, now.year());
        let ctx = IntakeContext {
            services: self.services.as_ref(),
            staff: self.staff.as_ref(),
            program: &self.config.gift_cards,
            currency: &self.config.currency,
            booking_code,
            now,
        };
        let outcome = self
            .store
            .with_gift_cards(|ledger| IntakeService::create(seed, ctx, &customers, ledger))?;
        let entries: Vec<_> = outcome.gift_card_entry.into_iter().collect();
        let booking = self.store.insert(outcome.booking, entries)?;
        info!(
            booking = %booking.code,
            status = %booking.status,
            authorized_cents = booking.financials.chargeable_cents(),
            "booking created"
        );
        Ok(Booking::clone(&booking))
    }

    pub fn apply_action(&self, booking_id: Uuid, action: BookingAction) -> Result<ActionResponse> {
        self.run_locked(booking_id, action == BookingAction::Refund, |booking, store| {
            let ctx = self.lifecycle_context();
            store.with_gift_cards(|ledger| LifecycleService::apply(booking, action, &ctx, ledger))
        })
        .map(|response| {
            info!(
                booking = %response.booking.code,
                action = ?action,
                status = %response.booking.status,
                committed = response.committed,
                "{}",
                response.message
            );
            response
        })
    }

    /// Same as [`apply_action`](Self::apply_action), addressed by booking code.
    pub fn apply_action_by_code(&self, code: &str, action: BookingAction) -> Result<ActionResponse> {
        let booking = self.booking_by_code(code)?;
        self.apply_action(booking.id, action)
    }

    pub fn record_processor_outcome(
        &self,
        booking_id: Uuid,
        outcome: ProcessorOutcome,
    ) -> Result<ActionResponse> {
        let now = self.clock.now();
        let response = self.run_locked(booking_id, false, |booking, _| {
            LifecycleService::record_processor_outcome(booking, outcome, now)
        })?;
        info!(booking = %response.booking.code, outcome = ?outcome, "processor outcome recorded");
        Ok(response)
    }

    pub fn clear_action_gate(&self, booking_id: Uuid) -> Result<ActionResponse> {
        let now = self.clock.now();
        let response = self.run_locked(booking_id, false, |booking, _| {
            LifecycleService::clear_action_gate(booking, now)
        })?;
        info!(booking = %response.booking.code, "customer action gate cleared");
        Ok(response)
    }

    pub fn issue_gift_card(
        &self,
        code: &str,
        amount_cents: Cents,
        note: Option<&str>,
    ) -> Result<GiftCardLedgerEntry> {
        if amount_cents <= 0 {
            return Err(BookingError::InvalidInput(
                "gift card value must be positive".into(),
            ));
        }
        self.record_gift_card(code, amount_cents, GiftCardReason::Issued, note)
    }

    pub fn adjust_gift_card(
        &self,
        code: &str,
        delta_cents: Cents,
        note: Option<&str>,
    ) -> Result<GiftCardLedgerEntry> {
        if delta_cents == 0 {
            return Err(BookingError::InvalidInput(
                "gift card adjustment must be nonzero".into(),
            ));
        }
        self.record_gift_card(code, delta_cents, GiftCardReason::Adjusted, note)
    }

    pub fn gift_card_balance(&self, code: &str) -> Cents {
        self.store.with_gift_cards(|ledger| ledger.balance(code))
    }

    pub fn gift_card_history(&self, code: &str) -> Vec<GiftCardLedgerEntry> {
        self.store
            .with_gift_cards(|ledger| ledger.history(code).cloned().collect())
    }

    pub fn booking(&self, booking_id: Uuid) -> Result<Arc<Booking>> {
        self.store
            .booking(booking_id)
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))
    }

    pub fn booking_by_code(&self, code: &str) -> Result<Arc<Booking>> {
        self.store
            .booking_by_code(code)
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", code.trim())))
    }

    pub fn bookings(&self) -> Vec<Arc<Booking>> {
        self.store.bookings()
    }

    /// Recomputes analytics over the committed bookings.
    pub fn analytics(&self) -> AnalyticsSnapshot {
        AnalyticsService::recompute(&self.store.bookings())
    }

    pub fn customers(&self) -> Vec<Customer> {
        CustomerService::derive_customers(&self.store.bookings())
    }

    fn lifecycle_context(&self) -> LifecycleContext<'_> {
        LifecycleContext {
            policies: &self.config.policies,
            program: &self.config.gift_cards,
            pay_link_base_url: &self.config.pay_link_base_url,
            now: self.clock.now(),
        }
    }

    /// Holds the booking's slot (and its gift card code's slot when asked) while
    /// `run` computes the next snapshot and the store commits it.
    fn run_locked<F>(&self, booking_id: Uuid, gift_cards: bool, run: F) -> Result<ActionResponse>
    where
        F: FnOnce(&Booking, &BookingStore) -> Result<ActionOutcome>,
    {
        let slot = self.store.booking_slot(booking_id);
        let _guard = lock(&slot);
        let current = self.booking(booking_id)?;

        let gift_slot = current
            .gift_card_code
            .as_deref()
            .filter(|_| gift_cards)
            .map(|code| self.store.gift_card_slot(code));
        let _gift_guard = gift_slot.as_deref().map(lock);

        let outcome = run(&current, &self.store)?;
        let ActionOutcome {
            booking,
            response,
            message,
            pay_link_url,
            should_persist,
            gift_card_entries,
        } = outcome;
        let booking = if should_persist {
            self.store.commit(booking, gift_card_entries)?
        } else {
            debug!(booking = %booking.code, "outcome reported without commit");
            Arc::new(booking)
        };
        Ok(ActionResponse {
            booking,
            status: response,
            message,
            pay_link_url,
            committed: should_persist,
        })
    }

    fn record_gift_card(
        &self,
        code: &str,
        delta_cents: Cents,
        reason: GiftCardReason,
        note: Option<&str>,
    ) -> Result<GiftCardLedgerEntry> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(BookingError::InvalidInput("gift card code is required".into()));
        }
        let slot = self.store.gift_card_slot(&code);
        let _guard = lock(&slot);

        let mut movement = GiftCardMovement::new(&code, delta_cents, reason);
        if let Some(note) = note {
            movement = movement.with_note(note);
        }
        let now = self.clock.now();
        let kind = self.config.gift_cards.kind;
        let entry = self
            .store
            .with_gift_cards(|ledger| ledger.prepare(movement, kind, now))?;
        self.store.append_gift_card_entries(vec![entry.clone()]);
        info!(
            code = %entry.code,
            reason = ?entry.reason,
            delta_cents = entry.delta_cents,
            balance_cents = entry.balance_after_cents,
            "gift card ledger updated"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::domain::{
        BookingStatus, CustomerContact, GiftCardProgram, PolicyConsent, Service, StaffMember,
    };
    use chrono::{TimeZone, Utc};

    fn engine(config: EngineConfig) -> BookingEngine {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        ));
        let catalog = Catalog::new(
            vec![Service::new("cut", "Haircut", "Hair", 60, 10_000)],
            vec![StaffMember::new("sam", "Sam", "#336699")],
        );
        BookingEngine::with_catalog(config, catalog, clock).unwrap()
    }

    fn seed(email: &str) -> BookingSeed {
        BookingSeed::new(
            "cut",
            Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap(),
            CustomerContact::new("Ada").with_email(email),
            PolicyConsent::new("sha256:policy", Utc::now()),
        )
    }

    #[test]
    fn codes_follow_the_store_sequence() {
        let engine = engine(EngineConfig::new("glow studio"));
        let first = engine.create_booking(seed("a@example.com")).unwrap();
        let second = engine.create_booking(seed("b@example.com")).unwrap();
        assert_eq!(first.code, "GLO-2026-0001");
        assert_eq!(second.code, "GLO-2026-0002");
    }

    #[test]
    fn returning_customer_keeps_their_id() {
        let engine = engine(EngineConfig::new("glow"));
        let first = engine.create_booking(seed("ada@example.com")).unwrap();
        let second = engine.create_booking(seed("ADA@example.com ")).unwrap();
        assert_eq!(first.customer.id, second.customer.id);
        assert_eq!(engine.customers().len(), 1);
    }

    #[test]
    fn gated_complete_is_reported_not_committed() {
        let mut config = EngineConfig::new("glow");
        config.pay_link_base_url = "https://pay.example.com/b/".into();
        let engine = engine(config);
        let booking = engine
            .create_booking(seed("a@example.com").requiring_action())
            .unwrap();

        let response = engine
            .apply_action(booking.id, BookingAction::Complete)
            .unwrap();
        assert_eq!(response.status, ResponseStatus::RequiresAction);
        assert!(!response.committed);
        assert_eq!(
            response.pay_link_url.as_deref(),
            Some("https://pay.example.com/b/GLO-2026-0001")
        );
        assert_eq!(engine.booking(booking.id).unwrap().payments.len(), 1);

        engine.clear_action_gate(booking.id).unwrap();
        let response = engine
            .apply_action(booking.id, BookingAction::Complete)
            .unwrap();
        assert!(response.committed);
        assert_eq!(response.booking.status, BookingStatus::Captured);
    }

    #[test]
    fn refund_restores_gift_card_against_latest_balance() {
        let mut config = EngineConfig::new("glow");
        config.gift_cards = GiftCardProgram {
            enabled: true,
            ..GiftCardProgram::default()
        };
        let engine = engine(config);
        engine.issue_gift_card("gc-7", 5_000, None).unwrap();

        let booking = engine
            .create_booking(seed("a@example.com").with_gift_card("GC-7", 2_000))
            .unwrap();
        assert_eq!(engine.gift_card_balance("GC-7"), 3_000);

        engine.adjust_gift_card("GC-7", -1_000, Some("goodwill")).unwrap();
        engine
            .apply_action(booking.id, BookingAction::Complete)
            .unwrap();
        engine
            .apply_action(booking.id, BookingAction::Refund)
            .unwrap();

        assert_eq!(engine.gift_card_balance("GC-7"), 4_000);
        let reasons: Vec<_> = engine
            .gift_card_history("gc-7")
            .iter()
            .map(|entry| entry.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                GiftCardReason::Issued,
                GiftCardReason::Redeemed,
                GiftCardReason::Adjusted,
                GiftCardReason::Refunded
            ]
        );
    }

    #[test]
    fn unknown_booking_is_not_found() {
        let engine = engine(EngineConfig::new("glow"));
        let err = engine
            .apply_action(Uuid::new_v4(), BookingAction::Cancel)
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    #[test]
    fn invalid_policies_are_rejected_up_front() {
        let mut config = EngineConfig::new("glow");
        config.policies.no_show = crate::money::FeePolicy::percent(150.0);
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let result = BookingEngine::with_catalog(config, Catalog::default(), clock);
        assert!(matches!(result, Err(BookingError::InvalidPolicy(_))));
    }
}
