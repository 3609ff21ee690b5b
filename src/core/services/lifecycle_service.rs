//! Booking lifecycle state machine.
//!
//! Every action reads a committed booking snapshot and returns a new snapshot plus
//! any gift card entries to append. Nothing here touches shared state; the caller
//! commits the outcome under the booking's lock when `should_persist` is set.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Booking, BookingStatus, GiftCardLedgerEntry, GiftCardProgram, GiftCardReason, Payment,
    PaymentKind, PaymentStatus, Policies,
};
use crate::errors::{BookingError, Result};
use crate::ledger::{payments, GiftCardLedger, GiftCardMovement};
use crate::money::{policy_fee, Cents, FeePolicy, Financials};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Complete,
    NoShow,
    Cancel,
    Refund,
}

impl BookingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingAction::Complete => "complete",
            BookingAction::NoShow => "no_show",
            BookingAction::Cancel => "cancel",
            BookingAction::Refund => "refund",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingAction {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "complete" | "attended" => Ok(BookingAction::Complete),
            "no_show" | "noshow" => Ok(BookingAction::NoShow),
            "cancel" => Ok(BookingAction::Cancel),
            "refund" => Ok(BookingAction::Refund),
            other => Err(BookingError::InvalidInput(format!(
                "unknown booking action `{other}`"
            ))),
        }
    }
}

/// Terminal outcomes reported by the external payment processor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorOutcome {
    /// The authorization lapsed before anything was captured.
    Expired,
    /// The customer disputed a captured charge.
    Disputed,
}

impl ProcessorOutcome {
    fn status(self) -> BookingStatus {
        match self {
            ProcessorOutcome::Expired => BookingStatus::Expired,
            ProcessorOutcome::Disputed => BookingStatus::Disputed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    RequiresAction,
}

/// Result of running one lifecycle action against a booking snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub booking: Booking,
    pub response: ResponseStatus,
    pub message: String,
    pub pay_link_url: Option<String>,
    /// `false` for no-ops and for the action gate, whose snapshot is reported only.
    pub should_persist: bool,
    pub gift_card_entries: Vec<GiftCardLedgerEntry>,
}

impl ActionOutcome {
    fn committed(booking: Booking, message: impl Into<String>) -> Self {
        Self {
            booking,
            response: ResponseStatus::Success,
            message: message.into(),
            pay_link_url: None,
            should_persist: true,
            gift_card_entries: Vec::new(),
        }
    }

    fn noop(booking: &Booking, message: impl Into<String>) -> Self {
        Self {
            booking: booking.clone(),
            response: ResponseStatus::Success,
            message: message.into(),
            pay_link_url: None,
            should_persist: false,
            gift_card_entries: Vec::new(),
        }
    }
}

/// Configuration and time the lifecycle needs from its host.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub policies: &'a Policies,
    pub program: &'a GiftCardProgram,
    pub pay_link_base_url: &'a str,
    pub now: DateTime<Utc>,
}

pub struct LifecycleService;

impl LifecycleService {
    pub fn apply(
        booking: &Booking,
        action: BookingAction,
        ctx: &LifecycleContext<'_>,
        gift_cards: &GiftCardLedger,
    ) -> Result<ActionOutcome> {
        match action {
            BookingAction::Complete => Self::complete(booking, ctx),
            BookingAction::NoShow => Self::no_show(booking, ctx),
            BookingAction::Cancel => Self::cancel(booking, ctx),
            BookingAction::Refund => Self::refund(booking, ctx, gift_cards),
        }
    }

    /// Marks the appointment attended and captures the chargeable amount.
    pub fn complete(booking: &Booking, ctx: &LifecycleContext<'_>) -> Result<ActionOutcome> {
        if booking.status == BookingStatus::Captured {
            return Ok(ActionOutcome::noop(booking, "Booking already captured."));
        }
        let has_capture = booking.has_payment_of(PaymentKind::Capture);
        if booking.status.is_terminal() && !has_capture {
            return Err(invalid_transition(booking, BookingAction::Complete));
        }
        if booking.requires_action {
            let mut gated = booking.clone();
            gated.status = BookingStatus::RequiresAction;
            let pay_link = pay_link_url(ctx.pay_link_base_url, booking);
            tracing::debug!(booking = %booking.code, "capture gated on customer action");
            return Ok(ActionOutcome {
                booking: gated,
                response: ResponseStatus::RequiresAction,
                message: "Customer must complete authentication before capture.".into(),
                pay_link_url: Some(pay_link),
                should_persist: false,
                gift_card_entries: Vec::new(),
            });
        }
        if has_capture {
            return Ok(ActionOutcome::noop(booking, "Capture already recorded."));
        }

        let mut next = booking.clone();
        let amount = booking.financials.chargeable_cents();
        payments::append(
            &mut next,
            Payment::new(
                booking.id,
                PaymentKind::Capture,
                amount,
                PaymentStatus::Captured,
                ctx.now,
            ),
        );
        next.financials = recompute(&next, payments::realized_capture(&next));
        next.status = BookingStatus::Captured;
        next.requires_action = false;
        next.touch(ctx.now);
        Ok(ActionOutcome::committed(
            next,
            format!("Captured {amount} cents."),
        ))
    }

    pub fn no_show(booking: &Booking, ctx: &LifecycleContext<'_>) -> Result<ActionOutcome> {
        Self::apply_policy_fee(
            booking,
            ctx,
            &ctx.policies.no_show,
            PolicyCharge {
                action: BookingAction::NoShow,
                kind: PaymentKind::NoShowFee,
                status: BookingStatus::NoShow,
                label: "No-show",
            },
        )
    }

    pub fn cancel(booking: &Booking, ctx: &LifecycleContext<'_>) -> Result<ActionOutcome> {
        Self::apply_policy_fee(
            booking,
            ctx,
            &ctx.policies.cancellation,
            PolicyCharge {
                action: BookingAction::Cancel,
                kind: PaymentKind::CancelFee,
                status: BookingStatus::Canceled,
                label: "Cancellation",
            },
        )
    }

    fn apply_policy_fee(
        booking: &Booking,
        ctx: &LifecycleContext<'_>,
        policy: &FeePolicy,
        charge: PolicyCharge,
    ) -> Result<ActionOutcome> {
        if booking.status == charge.status {
            return Ok(ActionOutcome::noop(
                booking,
                format!("Booking already marked {}.", charge.status),
            ));
        }
        if booking.status.is_terminal() {
            return Err(invalid_transition(booking, charge.action));
        }

        let fee = policy_fee(booking.financials.list_price_cents, policy)?;
        let mut next = booking.clone();
        next.status = charge.status;
        next.requires_action = false;
        next.touch(ctx.now);

        if fee <= 0 {
            next.financials = booking.financials.zeroed();
            return Ok(ActionOutcome::committed(
                next,
                format!("{} recorded without a fee.", charge.label),
            ));
        }

        payments::append(
            &mut next,
            Payment::new(
                booking.id,
                charge.kind,
                fee,
                PaymentStatus::Captured,
                ctx.now,
            )
            .with_note(format!(
                "{} policy: {} {}",
                charge.label, policy.fee_type, policy.value
            )),
        );
        next.financials = recompute(&next, fee);
        Ok(ActionOutcome::committed(
            next,
            format!("{} fee of {fee} cents captured.", charge.label),
        ))
    }

    /// Returns every captured charge to the customer and restores gift card value.
    pub fn refund(
        booking: &Booking,
        ctx: &LifecycleContext<'_>,
        gift_cards: &GiftCardLedger,
    ) -> Result<ActionOutcome> {
        let refundable = payments::refundable(booking);
        if booking.status == BookingStatus::Refunded || refundable <= 0 {
            return Ok(ActionOutcome::noop(booking, "Nothing to refund."));
        }
        if matches!(
            booking.status,
            BookingStatus::Expired | BookingStatus::Disputed
        ) {
            return Err(invalid_transition(booking, BookingAction::Refund));
        }

        let mut next = booking.clone();
        payments::append(
            &mut next,
            Payment::new(
                booking.id,
                PaymentKind::Refund,
                refundable,
                PaymentStatus::Refunded,
                ctx.now,
            ),
        );
        next.status = BookingStatus::Refunded;
        next.financials = booking.financials.zeroed();
        next.requires_action = false;
        next.touch(ctx.now);

        let mut outcome =
            ActionOutcome::committed(next, format!("Refunded {refundable} cents."));
        if let Some(entry) = restore_gift_card(booking, ctx, gift_cards)? {
            outcome.gift_card_entries.push(entry);
        }
        Ok(outcome)
    }

    /// Records an expiry or dispute reported by the payment processor.
    pub fn record_processor_outcome(
        booking: &Booking,
        outcome: ProcessorOutcome,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome> {
        let target = outcome.status();
        if booking.status == target {
            return Ok(ActionOutcome::noop(
                booking,
                format!("Booking already {target}."),
            ));
        }
        let allowed = match outcome {
            ProcessorOutcome::Expired => !booking.status.is_terminal(),
            ProcessorOutcome::Disputed => payments::refundable(booking) > 0,
        };
        if !allowed {
            return Err(BookingError::InvalidTransition {
                booking: booking.code.clone(),
                from: booking.status,
                action: format!("mark {target}"),
            });
        }
        let mut next = booking.clone();
        next.status = target;
        next.requires_action = false;
        next.touch(now);
        Ok(ActionOutcome::committed(
            next,
            format!("Processor reported booking {target}."),
        ))
    }

    /// Clears the customer-action gate once the external authentication step succeeds.
    pub fn clear_action_gate(booking: &Booking, now: DateTime<Utc>) -> Result<ActionOutcome> {
        if !booking.requires_action && booking.status != BookingStatus::RequiresAction {
            return Ok(ActionOutcome::noop(booking, "No customer action pending."));
        }
        if booking.status.is_terminal() {
            return Err(BookingError::InvalidTransition {
                booking: booking.code.clone(),
                from: booking.status,
                action: "clear the action gate on".into(),
            });
        }
        let mut next = booking.clone();
        next.requires_action = false;
        next.status = BookingStatus::Authorized;
        next.touch(now);
        Ok(ActionOutcome::committed(next, "Customer action completed."))
    }
}

struct PolicyCharge {
    action: BookingAction,
    kind: PaymentKind,
    status: BookingStatus,
    label: &'static str,
}

fn recompute(booking: &Booking, realized: Cents) -> Financials {
    Financials::for_realized(
        booking.financials.list_price_cents,
        booking.financials.gift_card_applied_cents,
        realized,
        booking.financials.currency.clone(),
    )
}

/// Gift card restoration credits the applied amount on top of the code's latest balance.
fn restore_gift_card(
    booking: &Booking,
    ctx: &LifecycleContext<'_>,
    gift_cards: &GiftCardLedger,
) -> Result<Option<GiftCardLedgerEntry>> {
    let applied = booking.financials.gift_card_applied_cents;
    let program = ctx.program;
    let code = match booking.gift_card_code.as_deref() {
        Some(code) if program.enabled && program.restore_on_refund && applied > 0 => code,
        _ => return Ok(None),
    };
    let movement = GiftCardMovement::new(code, applied, GiftCardReason::Refunded)
        .for_booking(booking.code.clone());
    gift_cards
        .prepare(movement, program.kind, ctx.now)
        .map(Some)
}

pub fn pay_link_url(base: &str, booking: &Booking) -> String {
    format!("{}/{}", base.trim_end_matches('/'), booking.code)
}

fn invalid_transition(booking: &Booking, action: BookingAction) -> BookingError {
    BookingError::InvalidTransition {
        booking: booking.code.clone(),
        from: booking.status,
        action: action.to_string(),
    }
}
